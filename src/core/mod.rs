//! Core module: Fixed-Capacity Circular Buffer
//!
//! Prinsip desain:
//! - Single Allocation: Storage dialokasikan sekali saat konstruksi
//! - Bulk Copy: Insert/extract dipetakan ke maksimal dua region kontigu
//! - Scoped Lock: Satu Mutex per instance, dilepas otomatis di setiap exit path

mod error;
mod ring_buffer;

pub use error::TransferError;
pub use ring_buffer::CircularBuffer;
