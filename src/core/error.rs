//! Error untuk operasi copy antar buffer
//!
//! Insert/extract sengaja tidak punya error type: hasilnya biner (`bool`).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Isi source tidak muat di buffer tujuan
    #[error("destination capacity {capacity} cannot hold {required} source units")]
    InsufficientCapacity { required: usize, capacity: usize },
}
