//! Protocol Layer: Record Framing di atas Circular Buffer
//!
//! Prinsip desain:
//! - Length-prefixed: Consumer tahu ukuran record sebelum extract
//! - Checksummed: Setiap payload divalidasi dengan CRC-32
//! - Atomic frame: Satu insert per record, satu extract per record

mod checksum;
mod record;

pub use checksum::crc32;
pub use record::{
    Frame, RecordError, RecordReader, RecordWriter, CHECKSUM_SIZE, LENGTH_PREFIX_SIZE,
    RECORD_OVERHEAD,
};
