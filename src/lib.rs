//! circbuf - Fixed-Capacity Circular Buffer
//!
//! Arsitektur:
//! - Bounded: Kapasitas tetap, satu alokasi saat konstruksi
//! - Data-Mapping: Bulk copy dalam satu atau dua segmen, bukan loop per-unit
//! - Mutex-Guarded: Aman untuk SPSC atau akses multi-thread yang saling eksklusif
//! - Record Framing: Length-prefixed + CRC-32 untuk validasi integritas

pub mod core;
pub mod protocol;
pub mod workload;

pub use crate::core::{CircularBuffer, TransferError};
