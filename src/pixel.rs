use crate::palette::Palette;
use crate::{header::ColorDepth, inflate, Error, Result};
use image::Rgba;

// Native pixel storage, one variant per color depth:
// RGBA: 4 bytes per pixel (r, g, b, a).
// Grayscale: 2 bytes per pixel (value, alpha).
// Indexed: 1 byte per pixel (palette index).
#[derive(Debug, Clone)]
pub(crate) enum Pixels {
    Rgba(Vec<u8>),
    Grayscale(Vec<u8>),
    Indexed(Vec<u8>),
}

/// Everything needed to turn native pixels into true color.
#[derive(Clone, Copy)]
pub(crate) struct ResolveContext<'a> {
    pub palette: Option<&'a Palette>,
    pub transparent_index: Option<u8>,
    pub layer_is_background: bool,
}

impl Pixels {
    fn from_bytes(bytes: Vec<u8>, depth: ColorDepth, expected_count: usize) -> Result<Self> {
        let expected_len = expected_count * depth.bytes_per_pixel();
        if bytes.len() != expected_len {
            return Err(Error::MalformedDocument(format!(
                "pixel data length {} does not match expected {} ({} pixels at {} bytes each)",
                bytes.len(),
                expected_len,
                expected_count,
                depth.bytes_per_pixel()
            )));
        }
        Ok(match depth {
            ColorDepth::Rgba => Pixels::Rgba(bytes),
            ColorDepth::Grayscale => Pixels::Grayscale(bytes),
            ColorDepth::Indexed { .. } => Pixels::Indexed(bytes),
        })
    }

    /// Pixels stored uncompressed, `expected_count` of them.
    pub(crate) fn from_raw(bytes: Vec<u8>, depth: ColorDepth, expected_count: usize) -> Result<Self> {
        Self::from_bytes(bytes, depth, expected_count)
    }

    /// Pixels stored as one zlib stream.
    pub(crate) fn from_compressed(
        compressed: &[u8],
        depth: ColorDepth,
        expected_count: usize,
    ) -> Result<Self> {
        let size_hint = expected_count * depth.bytes_per_pixel();
        let bytes = inflate::zlib_decompress(compressed, size_hint)?;
        Self::from_bytes(bytes, depth, expected_count)
    }

    /// The raw palette indices, for indexed storage.
    pub(crate) fn indexed_bytes(&self) -> Option<&[u8]> {
        match self {
            Pixels::Indexed(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Resolve to true color. Indexed entries go through the palette,
    /// with the transparent index reading as zero alpha on
    /// non-background layers; grayscale replicates the luminance into
    /// all three channels and passes alpha through.
    ///
    /// Palette presence and index ranges are validated when the
    /// document model is built, so resolution itself cannot fail.
    pub(crate) fn resolve_rgba(&self, ctx: &ResolveContext<'_>) -> Vec<Rgba<u8>> {
        match self {
            Pixels::Rgba(bytes) => bytes
                .chunks_exact(4)
                .map(|px| Rgba([px[0], px[1], px[2], px[3]]))
                .collect(),
            Pixels::Grayscale(bytes) => bytes
                .chunks_exact(2)
                .map(|px| Rgba([px[0], px[0], px[0], px[1]]))
                .collect(),
            Pixels::Indexed(bytes) => {
                let palette = ctx
                    .palette
                    .expect("indexed pixels without palette; validated at load time");
                bytes
                    .iter()
                    .map(|&index| {
                        let [r, g, b, a] = palette
                            .color(index as u32)
                            .expect("palette index out of range; validated at load time");
                        let transparent = ctx.transparent_index == Some(index)
                            && !ctx.layer_is_background;
                        if transparent {
                            Rgba([0, 0, 0, 0])
                        } else {
                            Rgba([r, g, b, a])
                        }
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_replicates_luminance() {
        let pixels = Pixels::from_raw(vec![200, 128, 10, 255], ColorDepth::Grayscale, 2).unwrap();
        let ctx = ResolveContext {
            palette: None,
            transparent_index: None,
            layer_is_background: false,
        };
        assert_eq!(
            pixels.resolve_rgba(&ctx),
            vec![Rgba([200, 200, 200, 128]), Rgba([10, 10, 10, 255])]
        );
    }

    #[test]
    fn rejects_short_pixel_data() {
        assert!(Pixels::from_raw(vec![0; 7], ColorDepth::Rgba, 2).is_err());
    }
}
