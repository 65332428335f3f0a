//! Decompression of zlib-wrapped DEFLATE payloads.
//!
//! Compressed cel pixels, tileset banks and tilemap indices are stored
//! as zlib streams: a 2-byte header, the DEFLATE body, and a big-endian
//! Adler-32 of the uncompressed data. The header and trailer are
//! validated here (the trailer against [`crate::checksum::Adler32`]);
//! the DEFLATE body itself is decoded by `flate2`. There is no
//! compression path in this crate.

use crate::checksum::Adler32;
use crate::{Error, Result};
use flate2::read::DeflateDecoder;
use std::io::Read;

/// Decompress one zlib stream, verifying header and trailer.
///
/// `size_hint` is the expected size of the decompressed output and is
/// only used to pre-size the buffer.
pub(crate) fn zlib_decompress(input: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    // 2-byte header + 4-byte Adler-32 trailer is the minimum stream.
    if input.len() < 6 {
        return Err(Error::Decompression(format!(
            "zlib stream truncated: {} bytes",
            input.len()
        )));
    }

    let cmf = input[0];
    let flg = input[1];
    if cmf & 0x0F != 8 {
        return Err(Error::Decompression(format!(
            "unknown zlib compression method: {}",
            cmf & 0x0F
        )));
    }
    if (cmf as u16 * 256 + flg as u16) % 31 != 0 {
        return Err(Error::Decompression(format!(
            "zlib header check failed: cmf=0x{:02x} flg=0x{:02x}",
            cmf, flg
        )));
    }
    if flg & 0x20 != 0 {
        // FDICT: never produced by the container format.
        return Err(Error::Decompression(
            "zlib stream requires a preset dictionary".to_owned(),
        ));
    }

    let body = &input[2..input.len() - 4];
    let mut output = Vec::with_capacity(size_hint);
    let mut decoder = DeflateDecoder::new(body);
    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(format!("corrupt deflate stream: {}", e)))?;

    let trailer = &input[input.len() - 4..];
    let declared = u32::from_be_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let mut adler = Adler32::new();
    let actual = adler.update(&output);
    if actual != declared {
        return Err(Error::Decompression(format!(
            "Adler-32 mismatch: stored 0x{:08x}, computed 0x{:08x}",
            declared, actual
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::ZlibEncoder, Compression};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for &size in &[1usize, 100, 1000, 100_000] {
            let data: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
            let compressed = compress(&data);
            let decompressed = zlib_decompress(&compressed, size).unwrap();
            assert_eq!(decompressed, data, "payload size {}", size);
        }
    }

    #[test]
    fn rejects_truncated_stream() {
        let compressed = compress(b"some reasonably sized payload");
        let truncated = &compressed[..compressed.len() / 2];
        assert!(matches!(
            zlib_decompress(truncated, 29),
            Err(Error::Decompression(_))
        ));
    }

    #[test]
    fn rejects_bad_header() {
        let mut compressed = compress(b"payload");
        compressed[0] = 0xFF;
        assert!(matches!(
            zlib_decompress(&compressed, 7),
            Err(Error::Decompression(_))
        ));
    }

    #[test]
    fn rejects_corrupted_trailer() {
        let mut compressed = compress(b"payload");
        let last = compressed.len() - 1;
        compressed[last] ^= 0xFF;
        assert!(matches!(
            zlib_decompress(&compressed, 7),
            Err(Error::Decompression(_))
        ));
    }
}
