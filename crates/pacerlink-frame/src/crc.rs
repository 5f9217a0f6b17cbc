//! CRC-8/OpenSafety: polynomial `0x2F`, init `0x00`, no reflection, no final XOR.

/// Generator polynomial.
pub const POLYNOMIAL: u8 = 0x2F;

/// Lookup table, one entry per byte value.
pub const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running CRC-8 digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crc8(u8);

impl Crc8 {
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.0 = TABLE[(self.0 ^ byte) as usize];
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.update(byte);
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// CRC-8 of `bytes`.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut digest = Crc8::new();
    digest.update_slice(bytes);
    digest.value()
}
