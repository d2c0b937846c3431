//! Fixed-Capacity Circular Buffer dengan Data-Mapping Copy
//!
//! Setiap insert/extract dipetakan ke satu atau dua region kontigu di storage,
//! lalu di-copy secara bulk (`copy_from_slice` = memcpy), bukan loop per-unit.
//! Satu Mutex per instance, di-hold selama satu operasi penuh.

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::error::TransferError;

/// State yang dilindungi lock: storage + cursor
struct State<U> {
    // Storage dialokasikan sekali saat konstruksi, tidak pernah resize
    storage: Box<[U]>,
    // Slot berikutnya yang akan ditulis
    head: usize,
    // Slot berikutnya yang akan dibaca
    tail: usize,
    // Satu-satunya sumber kebenaran untuk "seberapa penuh"
    used: usize,
}

impl<U: Copy> State<U> {
    fn new(storage: Box<[U]>) -> Self {
        Self {
            storage,
            head: 0,
            tail: 0,
            used: 0,
        }
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Cursor yang mencapai akhir storage langsung wrap ke 0
    #[inline(always)]
    fn wrap(&self, pos: usize) -> usize {
        if pos == self.capacity() {
            0
        } else {
            pos
        }
    }

    #[inline(always)]
    fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.used = 0;
    }

    /// Tulis `data` mulai dari head. Caller sudah memastikan muat.
    #[inline(always)]
    fn write(&mut self, data: &[U]) {
        let count = data.len();

        if self.head < self.tail {
            // Region kosong kontigu: head sampai tail
            debug_assert!(self.tail - self.head >= count, "free region collided with tail");
            self.storage[self.head..self.head + count].copy_from_slice(data);
            self.used += count;
            self.head += count;
            return;
        }

        // Region kosong dari head sampai akhir storage, sisanya dari 0 sampai tail
        let left_in_buffer = self.capacity() - self.head;
        if left_in_buffer >= count {
            self.storage[self.head..self.head + count].copy_from_slice(data);
            self.used += count;
            self.head = self.wrap(self.head + count);
        } else {
            let (first, rest) = data.split_at(left_in_buffer);
            self.storage[self.head..].copy_from_slice(first);
            self.used += left_in_buffer;

            self.head = 0;
            self.storage[..rest.len()].copy_from_slice(rest);
            self.used += rest.len();
            self.head = rest.len();
        }
    }

    /// Copy `out.len()` unit tertua ke `out` tanpa mengubah state.
    ///
    /// Returns posisi tail setelah data tersebut dikonsumsi.
    /// Caller sudah memastikan `used >= out.len()`.
    #[inline(always)]
    fn copy_out(&self, out: &mut [U]) -> usize {
        let count = out.len();
        let full = self.used == self.capacity();

        if self.head < self.tail || (self.head == self.tail && full) {
            // Data mungkin wrap: segmen pertama dari tail sampai akhir storage
            let data_count = self.capacity() - self.tail;
            if data_count < count {
                let (first, rest) = out.split_at_mut(data_count);
                first.copy_from_slice(&self.storage[self.tail..]);
                rest.copy_from_slice(&self.storage[..rest.len()]);
                rest.len()
            } else {
                out.copy_from_slice(&self.storage[self.tail..self.tail + count]);
                self.wrap(self.tail + count)
            }
        } else {
            // Data kontigu: tail sampai head
            debug_assert!(
                self.head - self.tail >= count,
                "occupied region shorter than used count"
            );
            out.copy_from_slice(&self.storage[self.tail..self.tail + count]);
            self.tail + count
        }
    }
}

/// Circular buffer dengan kapasitas tetap, generic atas tipe unit.
///
/// Kapasitas 0 valid: buffer "disabled" yang menolak semua insert/extract.
/// Aman di-share antar thread (misal `Arc<CircularBuffer<u8>>` antara satu
/// producer dan satu consumer).
pub struct CircularBuffer<U> {
    // Immutable setelah konstruksi, boleh dibaca tanpa lock
    capacity: usize,
    state: Mutex<State<U>>,
}

impl<U: Copy + Default> CircularBuffer<U> {
    /// Membuat buffer dengan `capacity` slot unit.
    ///
    /// Alokasi hanya terjadi sekali di sini, tidak ada alokasi untuk kapasitas 0.
    pub fn new(capacity: usize) -> Self {
        let storage = if capacity == 0 {
            Vec::new().into_boxed_slice()
        } else {
            vec![U::default(); capacity].into_boxed_slice()
        };

        debug!(capacity, "circular buffer created");

        Self {
            capacity,
            state: Mutex::new(State::new(storage)),
        }
    }
}

impl<U: Copy> CircularBuffer<U> {
    /// Kembalikan ke state kosong. Storage tidak di-erase maupun di-realokasi.
    pub fn reset(&self) {
        self.state.lock().clear();
        debug!(capacity = self.capacity, "circular buffer reset");
    }

    /// Insert semua unit dari `data`.
    ///
    /// Returns `false` jika tidak muat (atau kapasitas 0); tidak ada partial write,
    /// state tidak berubah.
    #[inline(always)]
    pub fn insert(&self, data: &[U]) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let mut state = self.state.lock();

        let free = self.capacity - state.used;
        if free < data.len() {
            trace!(requested = data.len(), free, "insert rejected");
            return false;
        }

        state.write(data);
        true
    }

    /// Extract tepat `out.len()` unit ke `out`.
    ///
    /// Returns `false` jika data kurang (atau kapasitas 0); state tidak berubah.
    #[inline(always)]
    pub fn extract(&self, out: &mut [U]) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let mut state = self.state.lock();

        if state.used < out.len() {
            trace!(requested = out.len(), used = state.used, "extract rejected");
            return false;
        }

        let tail = state.copy_out(out);
        state.tail = tail;
        state.used -= out.len();
        true
    }

    /// Seperti `extract`, tapi data tetap di buffer.
    #[inline(always)]
    pub fn peek(&self, out: &mut [U]) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let state = self.state.lock();

        if state.used < out.len() {
            return false;
        }

        state.copy_out(out);
        true
    }

    /// Jumlah unit yang sedang tersimpan (snapshot)
    #[inline(always)]
    pub fn used_space(&self) -> usize {
        self.state.lock().used
    }

    /// Jumlah slot kosong (snapshot)
    #[inline(always)]
    pub fn free_space(&self) -> usize {
        self.capacity - self.state.lock().used
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.state.lock().used == 0
    }

    /// Selalu `false` untuk buffer kapasitas 0
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.state.lock().used == self.capacity
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy isi `source` ke buffer ini (copy-assignment).
    ///
    /// Data lama di buffer ini dibuang. Data source di-compact ke offset 0:
    /// `tail = 0`, `head = used = source.used`. Source tidak berubah.
    ///
    /// Lock source di-hold selama copy, jadi producer/consumer lain pada source
    /// tidak bisa merobek snapshot. Buffer ini `&mut`, jadi tidak ada akses lain.
    ///
    /// # Errors
    /// `TransferError::InsufficientCapacity` jika kapasitas buffer ini lebih kecil
    /// dari jumlah unit di source. Buffer ini tidak diubah dalam kasus itu.
    pub fn transfer_from(&mut self, source: &Self) -> Result<(), TransferError> {
        let src = source.state.lock();

        if src.used > self.capacity {
            return Err(TransferError::InsufficientCapacity {
                required: src.used,
                capacity: self.capacity,
            });
        }

        let state = self.state.get_mut();
        state.clear();

        let used = src.used;
        if used == 0 {
            return Ok(());
        }

        // Satu copy jika source linear, dua copy jika wrap
        src.copy_out(&mut state.storage[..used]);
        state.used = used;
        state.head = state.wrap(used);

        debug!(
            units = used,
            capacity = self.capacity,
            "circular buffer contents transferred"
        );
        Ok(())
    }

    /// Copy-assignment: isi `source` di-copy ke storage buffer ini, kapasitas
    /// buffer ini tidak berubah.
    ///
    /// # Panics
    /// Panic jika kapasitas buffer ini lebih kecil dari isi source (pelanggaran
    /// kontrak). Pakai `transfer_from` untuk versi yang mengembalikan error.
    pub fn assign_from(&mut self, source: &Self) {
        if let Err(err) = self.transfer_from(source) {
            panic!("circular buffer copy-assignment: {err}");
        }
    }
}

impl<U: Copy + Default> Clone for CircularBuffer<U> {
    /// Copy-construction: kapasitas sama, isi di-compact ke offset 0.
    fn clone(&self) -> Self {
        let src = self.state.lock();

        let mut state = State::new(if self.capacity == 0 {
            Vec::new().into_boxed_slice()
        } else {
            vec![U::default(); self.capacity].into_boxed_slice()
        });

        let used = src.used;
        if used > 0 {
            src.copy_out(&mut state.storage[..used]);
            state.used = used;
            state.head = state.wrap(used);
        }

        Self {
            capacity: self.capacity,
            state: Mutex::new(state),
        }
    }

    /// Sama dengan `*self = source.clone()`; storage dipakai ulang hanya jika
    /// kapasitasnya sama.
    fn clone_from(&mut self, source: &Self) {
        if self.capacity == source.capacity && self.transfer_from(source).is_ok() {
            return;
        }
        *self = source.clone();
    }
}

/// Buffer kapasitas 0 (disabled). Memungkinkan `std::mem::take` sebagai move
/// yang meninggalkan source dalam state valid.
impl<U: Copy + Default> Default for CircularBuffer<U> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<U> fmt::Debug for CircularBuffer<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CircularBuffer")
            .field("capacity", &self.capacity)
            .field("used", &state.used)
            .field("head", &state.head)
            .field("tail", &state.tail)
            .finish()
    }
}
