//! Length-Prefixed Record Framing di atas `CircularBuffer<u8>`
//!
//! Layout frame:
//! ┌──────────────┬──────────────────────┬──────────────────┐
//! │ len (u32 LE) │ payload (len bytes)  │ crc32 (u32 LE)   │
//! └──────────────┴──────────────────────┴──────────────────┘
//!
//! Writer menyusun frame di scratch buffer lalu insert sekali, jadi consumer
//! tidak pernah melihat frame setengah jadi. Reader peek length prefix dulu
//! dan hanya extract jika frame sudah lengkap.

use thiserror::Error;

use super::checksum::crc32;
use crate::core::CircularBuffer;

pub const LENGTH_PREFIX_SIZE: usize = 4;
pub const CHECKSUM_SIZE: usize = 4;
/// Overhead per record (length prefix + checksum)
pub const RECORD_OVERHEAD: usize = LENGTH_PREFIX_SIZE + CHECKSUM_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("record of {needed} bytes does not fit in {free} free bytes")]
    WouldNotFit { needed: usize, free: usize },
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

/// Encoder record dengan scratch buffer yang di-reuse
pub struct RecordWriter {
    scratch: Vec<u8>,
    max_payload: usize,
}

impl RecordWriter {
    /// `max_payload` di-clamp ke `u32::MAX` (batas length prefix)
    pub fn new(max_payload: usize) -> Self {
        let max_payload = max_payload.min(u32::MAX as usize);
        Self {
            scratch: Vec::with_capacity(max_payload.saturating_add(RECORD_OVERHEAD)),
            max_payload,
        }
    }

    /// Susun frame lengkap untuk `payload`, tanpa menyentuh ring buffer.
    pub fn encode(&mut self, payload: &[u8]) -> Result<&[u8], RecordError> {
        if payload.len() > self.max_payload {
            return Err(RecordError::PayloadTooLarge {
                len: payload.len(),
                max: self.max_payload,
            });
        }

        self.scratch.clear();
        self.scratch
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.scratch.extend_from_slice(payload);
        self.scratch.extend_from_slice(&crc32(payload).to_le_bytes());

        Ok(&self.scratch)
    }

    /// Encode lalu insert frame dengan satu panggilan `insert`.
    ///
    /// Tidak ada retry: `WouldNotFit` berarti buffer tidak berubah.
    pub fn write(&mut self, rb: &CircularBuffer<u8>, payload: &[u8]) -> Result<(), RecordError> {
        let frame = self.encode(payload)?;

        if rb.insert(frame) {
            Ok(())
        } else {
            Err(RecordError::WouldNotFit {
                needed: frame.len(),
                free: rb.free_space(),
            })
        }
    }
}

/// Frame mentah yang sudah diambil dari buffer, checksum belum dicek
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Panjang payload
    #[inline(always)]
    pub fn payload_len(&self) -> usize {
        self.bytes.len() - RECORD_OVERHEAD
    }

    /// Validasi checksum dan kembalikan payload
    pub fn verify(&self) -> Result<&'a [u8], RecordError> {
        let payload_end = LENGTH_PREFIX_SIZE + self.payload_len();
        let payload = &self.bytes[LENGTH_PREFIX_SIZE..payload_end];

        let mut stored = [0u8; CHECKSUM_SIZE];
        stored.copy_from_slice(&self.bytes[payload_end..]);
        let expected = u32::from_le_bytes(stored);

        let actual = crc32(payload);
        if actual != expected {
            return Err(RecordError::ChecksumMismatch { expected, actual });
        }

        Ok(payload)
    }
}

/// Decoder record dengan scratch buffer yang di-reuse
pub struct RecordReader {
    scratch: Vec<u8>,
    max_payload: usize,
}

impl RecordReader {
    pub fn new(max_payload: usize) -> Self {
        let max_payload = max_payload.min(u32::MAX as usize);
        Self {
            scratch: Vec::with_capacity(max_payload.saturating_add(RECORD_OVERHEAD)),
            max_payload,
        }
    }

    /// Ambil satu frame lengkap dari buffer.
    ///
    /// Returns `Ok(None)` jika frame belum lengkap (buffer tidak berubah).
    /// `PayloadTooLarge` berarti length prefix rusak; frame tidak di-extract,
    /// caller sebaiknya `reset()` buffer.
    pub fn pull(&mut self, rb: &CircularBuffer<u8>) -> Result<Option<Frame<'_>>, RecordError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        if !rb.peek(&mut prefix) {
            return Ok(None);
        }

        let len = u32::from_le_bytes(prefix) as usize;
        if len > self.max_payload {
            return Err(RecordError::PayloadTooLarge {
                len,
                max: self.max_payload,
            });
        }

        self.scratch.resize(len + RECORD_OVERHEAD, 0);
        if !rb.extract(&mut self.scratch) {
            return Ok(None);
        }

        Ok(Some(Frame {
            bytes: &self.scratch,
        }))
    }

    /// Baca satu record ke `out` (isi lama `out` dibuang).
    ///
    /// Returns panjang payload, atau `Ok(None)` jika belum ada record lengkap.
    pub fn read(
        &mut self,
        rb: &CircularBuffer<u8>,
        out: &mut Vec<u8>,
    ) -> Result<Option<usize>, RecordError> {
        let Some(frame) = self.pull(rb)? else {
            return Ok(None);
        };

        let payload = frame.verify()?;
        out.clear();
        out.extend_from_slice(payload);
        Ok(Some(payload.len()))
    }
}
