//! Randomized Insert/Extract Workload
//!
//! Driver benchmark: record acak (length, payload, crc32) dimasukkan dan
//! diambil dari `CircularBuffer<u8>`. Hanya panggilan insert/extract yang
//! diukur waktunya; pembuatan data acak dan validasi checksum tidak.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::core::CircularBuffer;
use crate::protocol::{
    crc32, RecordError, RecordReader, RecordWriter, LENGTH_PREFIX_SIZE, RECORD_OVERHEAD,
};

/// Konfigurasi workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Kapasitas buffer dalam bytes
    pub capacity: usize,
    /// Ukuran payload acak berada di `1..=max_record * 2`
    pub max_record: usize,
    /// Jumlah iterasi (single-thread) atau jumlah record (SPSC)
    pub iterations: usize,
    /// Seed RNG; `None` = entropy dari OS
    pub seed: Option<u64>,
    /// Berapa kali workload diulang untuk rata-rata
    pub runs: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            capacity: 500_000,
            max_record: 75_000,
            iterations: 50_000,
            seed: None,
            runs: 3,
        }
    }
}

impl WorkloadConfig {
    /// Batas atas ukuran payload
    #[inline(always)]
    fn payload_span(&self) -> usize {
        self.max_record.max(1).saturating_mul(2)
    }

    /// Payload terbesar yang frame-nya masih muat di buffer kosong
    #[inline(always)]
    fn max_fitting_payload(&self) -> usize {
        self.payload_span()
            .min(self.capacity.saturating_sub(RECORD_OVERHEAD))
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Hasil satu run workload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkloadReport {
    pub records_written: u64,
    pub records_read: u64,
    /// Insert yang ditolak karena buffer penuh
    pub rejected_writes: u64,
    pub bytes_written: u64,
    pub insert_time: Duration,
    pub extract_time: Duration,
}

impl WorkloadReport {
    /// Total waktu insert + extract
    pub fn total(&self) -> Duration {
        self.insert_time + self.extract_time
    }

    pub fn total_millis(&self) -> f64 {
        self.total().as_secs_f64() * 1000.0
    }
}

/// Workload single-thread pada buffer baru sesuai `config.capacity`.
pub fn run(config: &WorkloadConfig) -> Result<WorkloadReport, RecordError> {
    let rb = CircularBuffer::new(config.capacity);
    run_on(&rb, config)
}

/// Workload single-thread pada buffer yang sudah ada.
///
/// Setiap iterasi: dengan peluang ~1/4 tulis satu record acak, lalu coba baca
/// satu record. Record dibaca harus sama persis (dan berurutan) dengan yang ditulis.
pub fn run_on(
    rb: &CircularBuffer<u8>,
    config: &WorkloadConfig,
) -> Result<WorkloadReport, RecordError> {
    let span = config.payload_span();
    // Scratch hanya sebesar frame yang bisa muat, bukan sebesar `span`
    let fit = config.max_fitting_payload();
    let mut rng = config.rng();

    let mut writer = RecordWriter::new(fit);
    let mut reader = RecordReader::new(fit);
    let mut payload = vec![0u8; fit];
    // Checksum record yang sudah ditulis tapi belum dibaca, urutan FIFO
    let mut in_flight: VecDeque<u32> = VecDeque::new();

    let mut report = WorkloadReport::default();

    for _ in 0..config.iterations {
        if rng.gen_range(1..=span) < config.max_record / 2 {
            let amount = rng.gen_range(1..=span);

            if amount > fit {
                // Frame lebih besar dari kapasitas: insert pasti ditolak
                report.rejected_writes += 1;
            } else {
                let chunk = &mut payload[..amount];
                rng.fill(&mut *chunk);
                let checksum = crc32(chunk);
                let frame = writer.encode(chunk)?;

                let start = Instant::now();
                let inserted = rb.insert(frame);
                report.insert_time += start.elapsed();

                if inserted {
                    report.records_written += 1;
                    report.bytes_written += amount as u64;
                    in_flight.push_back(checksum);
                } else {
                    report.rejected_writes += 1;
                }
            }
        }

        if rb.used_space() >= LENGTH_PREFIX_SIZE {
            let start = Instant::now();
            let frame = reader.pull(rb)?;
            report.extract_time += start.elapsed();

            if let Some(frame) = frame {
                let actual = crc32(frame.verify()?);
                // Record yang keluar harus record tertua yang masuk
                let expected = in_flight.pop_front().unwrap_or(!actual);
                if expected != actual {
                    return Err(RecordError::ChecksumMismatch { expected, actual });
                }
                report.records_read += 1;
            }
        }
    }

    debug!(
        written = report.records_written,
        read = report.records_read,
        rejected = report.rejected_writes,
        millis = report.total_millis(),
        "workload finished"
    );

    Ok(report)
}

/// Workload dua thread: satu producer dan satu consumer berbagi satu buffer.
///
/// Producer menulis `config.iterations` record (spin dengan `yield_now` jika
/// penuh), consumer membaca semuanya. Kedua thread memakai seed yang sama,
/// jadi consumer bisa membangkitkan ulang payload yang diharapkan.
pub fn run_spsc(config: &WorkloadConfig) -> Result<WorkloadReport, RecordError> {
    // Frame terbesar harus muat di buffer kosong
    let max_payload = config.max_fitting_payload();
    if max_payload == 0 {
        return Err(RecordError::WouldNotFit {
            needed: RECORD_OVERHEAD + 1,
            free: config.capacity,
        });
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    let records = config.iterations;
    let rb = Arc::new(CircularBuffer::new(config.capacity));
    let stop = Arc::new(AtomicBool::new(false));

    let producer = {
        let rb = Arc::clone(&rb);
        let stop = Arc::clone(&stop);
        thread::spawn(move || -> Result<WorkloadReport, RecordError> {
            // Lepas consumer yang menunggu record berikutnya, juga saat panic
            let _done = StopOnDrop(Arc::clone(&stop));
            produce(&rb, seed, records, max_payload, &stop)
        })
    };

    let consumer = {
        let rb = Arc::clone(&rb);
        let stop = Arc::clone(&stop);
        thread::spawn(move || -> Result<WorkloadReport, RecordError> {
            // Lepas producer yang menunggu buffer kosong, juga saat panic
            let _done = StopOnDrop(Arc::clone(&stop));
            consume(&rb, seed, records, max_payload, &stop)
        })
    };

    let consumed = match consumer.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    };
    let produced = match producer.join() {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    };

    let consumed = consumed?;
    let produced = produced?;

    let report = WorkloadReport {
        records_written: produced.records_written,
        records_read: consumed.records_read,
        rejected_writes: produced.rejected_writes,
        bytes_written: produced.bytes_written,
        insert_time: produced.insert_time,
        extract_time: consumed.extract_time,
    };

    debug!(
        seed,
        written = report.records_written,
        read = report.records_read,
        rejected = report.rejected_writes,
        millis = report.total_millis(),
        "spsc workload finished"
    );

    Ok(report)
}

/// Set flag saat di-drop, termasuk saat thread unwind karena panic
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Sisi producer `run_spsc`. Berhenti lebih awal jika `stop` di-set
/// (consumer sudah selesai) saat buffer penuh.
fn produce(
    rb: &CircularBuffer<u8>,
    seed: u64,
    records: usize,
    max_payload: usize,
    stop: &AtomicBool,
) -> Result<WorkloadReport, RecordError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = RecordWriter::new(max_payload);
    let mut payload = vec![0u8; max_payload];
    let mut report = WorkloadReport::default();

    for _ in 0..records {
        let amount = rng.gen_range(1..=max_payload);
        rng.fill(&mut payload[..amount]);
        let frame = writer.encode(&payload[..amount])?;

        loop {
            let start = Instant::now();
            let inserted = rb.insert(frame);
            report.insert_time += start.elapsed();

            if inserted {
                break;
            }
            if stop.load(Ordering::Acquire) {
                return Ok(report);
            }
            report.rejected_writes += 1;
            thread::yield_now();
        }

        report.records_written += 1;
        report.bytes_written += amount as u64;
    }

    Ok(report)
}

/// Sisi consumer `run_spsc`. Jika `stop` di-set (producer sudah keluar) dan
/// buffer sudah terkuras, return dengan record yang sempat dibaca.
fn consume(
    rb: &CircularBuffer<u8>,
    seed: u64,
    records: usize,
    max_payload: usize,
    stop: &AtomicBool,
) -> Result<WorkloadReport, RecordError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reader = RecordReader::new(max_payload);
    let mut regenerated = vec![0u8; max_payload];
    let mut report = WorkloadReport::default();

    while report.records_read < records as u64 {
        // Dibaca sebelum pull: frame terakhir producer sudah terlihat di pull ini
        let producer_gone = stop.load(Ordering::Acquire);

        let start = Instant::now();
        let frame = reader.pull(rb)?;
        report.extract_time += start.elapsed();

        let Some(frame) = frame else {
            if producer_gone {
                debug!(
                    read = report.records_read,
                    expected = records,
                    "producer stopped early"
                );
                break;
            }
            thread::yield_now();
            continue;
        };
        let payload = frame.verify()?;

        let amount = rng.gen_range(1..=max_payload);
        let expected = &mut regenerated[..amount];
        rng.fill(&mut *expected);
        if payload != &*expected {
            return Err(RecordError::ChecksumMismatch {
                expected: crc32(expected),
                actual: crc32(payload),
            });
        }

        report.records_read += 1;
    }

    Ok(report)
}
