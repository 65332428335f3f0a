//! Streaming checksum accumulators.
//!
//! [Adler32] verifies the trailer of zlib-wrapped payloads (see
//! [`crate::inflate`]); [Crc32] is used by the spritesheet packer to
//! cheaply pre-hash frame buffers before byte-exact duplicate
//! comparison. Both accept input in arbitrarily sized pieces: feeding
//! the same bytes in any split yields the same value.

/// Largest prime below 2^16, the Adler-32 modulus.
const ADLER_MOD: u32 = 65521;

/// How many bytes can be summed before the 32-bit `b` accumulator must
/// be reduced. 5552 is the standard worst-case bound for byte input.
const ADLER_NMAX: usize = 5552;

/// Streaming Adler-32 accumulator, seeded at 1 per the zlib convention.
#[derive(Debug, Clone)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    /// A fresh accumulator over the empty input (value 1).
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Feed more input and return the running checksum.
    pub fn update(&mut self, bytes: &[u8]) -> u32 {
        for block in bytes.chunks(ADLER_NMAX) {
            for &byte in block {
                self.a += byte as u32;
                self.b += self.a;
            }
            self.a %= ADLER_MOD;
            self.b %= ADLER_MOD;
        }
        self.value()
    }

    /// The checksum over everything fed so far.
    pub fn value(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Restart from the empty input.
    pub fn reset(&mut self) {
        self.a = 1;
        self.b = 0;
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Reflected CRC-32 polynomial (IEEE 802.3).
const CRC_POLY: u32 = 0xEDB8_8320;

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { CRC_POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = crc_table();

/// Streaming CRC-32 accumulator (reflected polynomial, table driven).
///
/// The register is kept pre-inverted internally, so `value()` already
/// includes the standard final complement.
#[derive(Debug, Clone)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    /// A fresh accumulator over the empty input (value 0).
    pub fn new() -> Self {
        Self { state: !0 }
    }

    /// Resume from a previously returned checksum value.
    pub fn with_initial(value: u32) -> Self {
        Self { state: !value }
    }

    /// Feed more input and return the running checksum.
    pub fn update(&mut self, bytes: &[u8]) -> u32 {
        let mut c = self.state;
        for &byte in bytes {
            c = CRC_TABLE[((c ^ byte as u32) & 0xFF) as usize] ^ (c >> 8);
        }
        self.state = c;
        self.value()
    }

    /// The checksum over everything fed so far.
    pub fn value(&self) -> u32 {
        !self.state
    }

    /// Restart from the empty input.
    pub fn reset(&mut self) {
        self.state = !0;
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-32 of a byte slice.
pub(crate) fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn adler32_known_values() {
        let mut adler = Adler32::new();
        assert_eq!(adler.value(), 1);
        assert_eq!(adler.update(b"123456789"), 0x091E_01DE);
    }

    #[test]
    fn crc32_known_values() {
        let mut crc = Crc32::new();
        assert_eq!(crc.value(), 0);
        assert_eq!(crc.update(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn adler32_reset() {
        let mut adler = Adler32::new();
        adler.update(b"garbage");
        adler.reset();
        assert_eq!(adler.update(b"123456789"), 0x091E_01DE);
    }

    #[test]
    fn crc32_resume_from_value() {
        let mut whole = Crc32::new();
        let expected = whole.update(b"hello world");
        let mut head = Crc32::new();
        let partial = head.update(b"hello ");
        let mut tail = Crc32::with_initial(partial);
        assert_eq!(tail.update(b"world"), expected);
    }

    // Feeding input in pieces must be equivalent to one concatenated
    // update, for any split.
    #[test]
    fn streaming_equivalence() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let data: Vec<u8> = (0..10_000).map(|_| rng.gen()).collect();

        let mut adler_whole = Adler32::new();
        let adler_expected = adler_whole.update(&data);
        let mut crc_whole = Crc32::new();
        let crc_expected = crc_whole.update(&data);

        for &split in &[0usize, 1, 2, 100, 5551, 5552, 5553, 9999, 10_000] {
            let (head, tail) = data.split_at(split);
            let mut adler = Adler32::new();
            adler.update(head);
            assert_eq!(adler.update(tail), adler_expected, "split {}", split);

            let mut crc = Crc32::new();
            crc.update(head);
            assert_eq!(crc.update(tail), crc_expected, "split {}", split);
        }
    }
}
