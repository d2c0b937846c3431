//! CRC-32 (ISO-HDLC / zlib) untuk validasi integritas record
//!
//! Reflected polynomial 0xEDB88320, init dan final XOR 0xFFFFFFFF.
//! Lookup table 256 entry dibangun sekali saat pertama dipakai.

use std::sync::OnceLock;

const REVERSED_POLYNOMIAL: u32 = 0xEDB8_8320;

static TABLE: OnceLock<[u32; 256]> = OnceLock::new();

fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (n, entry) in table.iter_mut().enumerate() {
        let mut checksum = n as u32;
        for _ in 0..8 {
            checksum = if checksum & 1 != 0 {
                (checksum >> 1) ^ REVERSED_POLYNOMIAL
            } else {
                checksum >> 1
            };
        }
        *entry = checksum;
    }
    table
}

/// CRC-32 dari `data`
#[inline(always)]
pub fn crc32(data: &[u8]) -> u32 {
    let table = TABLE.get_or_init(build_table);

    !data.iter().fold(!0u32, |checksum, &byte| {
        table[((checksum ^ byte as u32) & 0xFF) as usize] ^ (checksum >> 8)
    })
}
