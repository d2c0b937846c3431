//! SPSC Stress Test - Producer/Consumer pada thread terpisah
//!
//! Memastikan bulk insert/extract di bawah contention tetap menjaga urutan
//! FIFO, tidak ada data hilang, dan occupancy selalu dalam batas.
//!
//! Usage:
//!   cargo test --release --test spsc_stress_test -- --nocapture

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use circbuf::protocol::{RecordReader, RecordWriter};
use circbuf::CircularBuffer;

/// Statistics collector
struct StressStats {
    inserted_units: AtomicU64,
    extracted_units: AtomicU64,
    rejected_inserts: AtomicU64,
    rejected_extracts: AtomicU64,
    // Di-set saat consumer keluar (termasuk panic) supaya producer tidak spin selamanya
    consumer_done: AtomicBool,
}

/// Set flag saat di-drop, juga saat thread unwind karena panic
struct SetOnDrop<'a>(&'a AtomicBool);

impl Drop for SetOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

impl StressStats {
    fn new() -> Self {
        Self {
            inserted_units: AtomicU64::new(0),
            extracted_units: AtomicU64::new(0),
            rejected_inserts: AtomicU64::new(0),
            rejected_extracts: AtomicU64::new(0),
            consumer_done: AtomicBool::new(false),
        }
    }

    fn print_report(&self, duration: Duration) {
        let inserted = self.inserted_units.load(Ordering::Relaxed);
        let extracted = self.extracted_units.load(Ordering::Relaxed);
        let rate = extracted as f64 / duration.as_secs_f64();

        println!("\n📊 STRESS TEST RESULTS");
        println!("======================");
        println!("  Duration:          {:.2}ms", duration.as_secs_f64() * 1000.0);
        println!("  Units inserted:    {}", inserted);
        println!("  Units extracted:   {}", extracted);
        println!(
            "  Rejected inserts:  {}",
            self.rejected_inserts.load(Ordering::Relaxed)
        );
        println!(
            "  Rejected extracts: {}",
            self.rejected_extracts.load(Ordering::Relaxed)
        );
        println!("  Rate:              {:.2} M units/sec", rate / 1_000_000.0);
    }
}

/// Producer: kirim `0..total` dalam chunk dengan ukuran bervariasi.
/// Berhenti lebih awal jika consumer sudah keluar.
fn sequence_producer(rb: &CircularBuffer<u64>, total: u64, stats: &StressStats) {
    let mut next = 0u64;
    let mut chunk = Vec::with_capacity(97);
    let mut size = 1usize;

    while next < total {
        // Ukuran chunk 1..=97, tidak membagi kapasitas
        size = size % 97 + 1;
        let end = (next + size as u64).min(total);
        chunk.clear();
        chunk.extend(next..end);

        while !rb.insert(&chunk) {
            if stats.consumer_done.load(Ordering::Acquire) {
                return;
            }
            stats.rejected_inserts.fetch_add(1, Ordering::Relaxed);
            thread::yield_now();
        }

        stats
            .inserted_units
            .fetch_add(chunk.len() as u64, Ordering::Relaxed);
        next = end;
    }
}

/// Consumer: harus menerima `0..total` persis berurutan
fn sequence_consumer(rb: &CircularBuffer<u64>, total: u64, stats: &StressStats) {
    let _exit = SetOnDrop(&stats.consumer_done);
    let mut expected = 0u64;
    let mut out = vec![0u64; 61];
    let mut size = 1usize;

    while expected < total {
        size = size % 61 + 1;
        let want = size.min((total - expected) as usize);
        let out = &mut out[..want];

        if !rb.extract(out) {
            stats.rejected_extracts.fetch_add(1, Ordering::Relaxed);
            thread::yield_now();
            continue;
        }

        for &v in out.iter() {
            assert_eq!(v, expected, "FIFO order violated");
            expected += 1;
        }
        stats
            .extracted_units
            .fetch_add(want as u64, Ordering::Relaxed);
    }
}

#[test]
fn test_spsc_sequence_integrity() {
    println!("\n🧪 SPSC SEQUENCE TEST - 1M units, capacity 1000");
    println!("================================================\n");

    const TOTAL: u64 = 1_000_000;
    let rb = Arc::new(CircularBuffer::<u64>::new(1000));
    let stats = Arc::new(StressStats::new());

    let start = Instant::now();

    let producer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || sequence_producer(&rb, TOTAL, &stats))
    };
    let consumer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || sequence_consumer(&rb, TOTAL, &stats))
    };

    consumer.join().unwrap();
    producer.join().unwrap();

    stats.print_report(start.elapsed());

    assert_eq!(stats.inserted_units.load(Ordering::Relaxed), TOTAL);
    assert_eq!(stats.extracted_units.load(Ordering::Relaxed), TOTAL);
    assert!(rb.is_empty());
}

#[test]
fn test_occupancy_stays_bounded_under_contention() {
    const CAPACITY: usize = 257;
    const TOTAL: u64 = 200_000;

    let rb = Arc::new(CircularBuffer::<u64>::new(CAPACITY));
    let stats = Arc::new(StressStats::new());
    let done = Arc::new(AtomicBool::new(false));

    // Observer: setiap snapshot harus konsisten
    let observer = {
        let rb = Arc::clone(&rb);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut observations = 0u64;
            while !done.load(Ordering::Acquire) {
                let used = rb.used_space();
                assert!(used <= CAPACITY);
                observations += 1;
            }
            observations
        })
    };

    let producer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || sequence_producer(&rb, TOTAL, &stats))
    };
    let consumer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || sequence_consumer(&rb, TOTAL, &stats))
    };

    consumer.join().unwrap();
    producer.join().unwrap();
    done.store(true, Ordering::Release);
    let observations = observer.join().unwrap();

    println!("  Observations: {}", observations);
    assert_eq!(rb.used_space(), 0);
    assert_eq!(rb.free_space(), CAPACITY);
}

#[test]
fn test_spsc_records_with_checksums() {
    println!("\n🧪 SPSC RECORD TEST - 20k records through 4KB buffer");
    println!("====================================================\n");

    const RECORDS: u32 = 20_000;
    let rb = Arc::new(CircularBuffer::<u8>::new(4096));
    let consumer_done = Arc::new(AtomicBool::new(false));

    let start = Instant::now();

    let producer = {
        let rb = Arc::clone(&rb);
        let consumer_done = Arc::clone(&consumer_done);
        thread::spawn(move || {
            let mut writer = RecordWriter::new(512);
            let mut payload = Vec::with_capacity(512);
            for seq in 0..RECORDS {
                // Payload: sequence number diulang, panjang bervariasi
                let len = 4 + (seq as usize * 13) % 500;
                payload.clear();
                payload.extend(seq.to_le_bytes().iter().cycle().take(len));

                while writer.write(&rb, &payload).is_err() {
                    if consumer_done.load(Ordering::Acquire) {
                        return;
                    }
                    thread::yield_now();
                }
            }
        })
    };

    let consumer = {
        let rb = Arc::clone(&rb);
        let consumer_done = Arc::clone(&consumer_done);
        thread::spawn(move || {
            let _exit = SetOnDrop(&consumer_done);
            let mut reader = RecordReader::new(512);
            let mut out = Vec::new();
            let mut seq = 0u32;
            while seq < RECORDS {
                match reader.read(&rb, &mut out).expect("corrupted record") {
                    Some(len) => {
                        assert_eq!(len, 4 + (seq as usize * 13) % 500);
                        assert_eq!(&out[..4], &seq.to_le_bytes());
                        seq += 1;
                    }
                    None => thread::yield_now(),
                }
            }
        })
    };

    consumer.join().unwrap();
    producer.join().unwrap();

    let duration = start.elapsed();
    println!(
        "  {} records in {:.2}ms ({:.0} records/sec)",
        RECORDS,
        duration.as_secs_f64() * 1000.0,
        RECORDS as f64 / duration.as_secs_f64()
    );
    assert!(rb.is_empty());
}

#[test]
fn test_mutually_exclusive_producers() {
    // Dua producer bergantian; lock menjamin setiap chunk utuh (tidak interleave)
    const PER_PRODUCER: u64 = 50_000;
    const CHUNK: usize = 8;

    let rb = Arc::new(CircularBuffer::<u64>::new(CHUNK * 16));
    let consumer_done = Arc::new(AtomicBool::new(false));

    let producers: Vec<_> = (0..2u64)
        .map(|id| {
            let rb = Arc::clone(&rb);
            let consumer_done = Arc::clone(&consumer_done);
            thread::spawn(move || {
                for n in 0..PER_PRODUCER / CHUNK as u64 {
                    let value = (id << 32) | n;
                    let chunk = [value; CHUNK];
                    while !rb.insert(&chunk) {
                        if consumer_done.load(Ordering::Acquire) {
                            return;
                        }
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let consumer = {
        let rb = Arc::clone(&rb);
        let consumer_done = Arc::clone(&consumer_done);
        thread::spawn(move || {
            let _exit = SetOnDrop(&consumer_done);
            let mut next = [0u64; 2];
            let mut out = [0u64; CHUNK];
            let mut received = 0u64;
            while received < 2 * PER_PRODUCER / CHUNK as u64 {
                if !rb.extract(&mut out) {
                    thread::yield_now();
                    continue;
                }
                assert!(out.iter().all(|&v| v == out[0]), "chunk torn: {out:?}");
                let id = (out[0] >> 32) as usize;
                assert_eq!(out[0] & 0xFFFF_FFFF, next[id], "producer {id} out of order");
                next[id] += 1;
                received += 1;
            }
        })
    };

    consumer.join().unwrap();
    for handle in producers {
        handle.join().unwrap();
    }
    assert!(rb.is_empty());
}

#[test]
fn test_producer_exits_when_consumer_fails() {
    // Buffer kecil: producer pasti tertahan di buffer penuh setelah consumer mati
    const TOTAL: u64 = 1_000_000;
    let rb = Arc::new(CircularBuffer::<u64>::new(64));
    let stats = Arc::new(StressStats::new());

    let producer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || sequence_producer(&rb, TOTAL, &stats))
    };
    let consumer = {
        let rb = Arc::clone(&rb);
        let stats = Arc::clone(&stats);
        thread::spawn(move || {
            let _exit = SetOnDrop(&stats.consumer_done);
            let mut out = [0u64; 8];
            while !rb.extract(&mut out) {
                thread::yield_now();
            }
            panic!("consumer failed after first chunk");
        })
    };

    assert!(consumer.join().is_err());
    producer.join().unwrap();

    assert!(stats.consumer_done.load(Ordering::Acquire));
    assert!(stats.inserted_units.load(Ordering::Relaxed) < TOTAL);
}
