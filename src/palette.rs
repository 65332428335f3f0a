use crate::reader::ByteReader;
use crate::{Error, Result};
use nohash::IntMap;

/// The color table of the document.
///
/// Built by merging every palette chunk in encounter order: each chunk
/// declares an explicit index range, and later chunks overwrite earlier
/// entries at the same index. Indexed-depth documents resolve their
/// pixel bytes through this table at composite time.
#[derive(Debug, Default)]
pub struct Palette {
    entries: IntMap<u32, PaletteEntry>,
}

/// A single palette slot.
#[derive(Debug, Clone)]
pub struct PaletteEntry {
    index: u32,
    rgba: [u8; 4],
    name: Option<String>,
}

impl PaletteEntry {
    /// Index of this entry in the palette.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The color as an `[r, g, b, a]` array.
    pub fn rgba(&self) -> [u8; 4] {
        self.rgba
    }

    /// Alpha component (0 = fully transparent, 255 = fully opaque).
    pub fn alpha(&self) -> u8 {
        self.rgba[3]
    }

    /// Optional color name, if the document stored one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Palette {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of colors present in the palette.
    pub fn num_colors(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Look up the entry at `index`.
    pub fn entry(&self, index: u32) -> Option<&PaletteEntry> {
        self.entries.get(&index)
    }

    /// Look up the color at `index` as an `[r, g, b, a]` array.
    pub fn color(&self, index: u32) -> Option<[u8; 4]> {
        self.entries.get(&index).map(|e| e.rgba)
    }

    /// True if every pixel byte in `indices` has a palette entry.
    pub(crate) fn validate_indices(&self, indices: &[u8]) -> Result<()> {
        for &index in indices {
            if self.entries.get(&(index as u32)).is_none() {
                return Err(Error::MalformedDocument(format!(
                    "palette index out of range: {} (palette has {} colors)",
                    index,
                    self.num_colors()
                )));
            }
        }
        Ok(())
    }

    fn set(&mut self, index: u32, rgba: [u8; 4], name: Option<String>) {
        self.entries.insert(index, PaletteEntry { index, rgba, name });
    }
}

/// New-style palette chunk (0x2019): explicit first/last range, 8-bit
/// channels, optional per-entry names.
pub(crate) fn parse_chunk(palette: &mut Palette, data: &[u8]) -> Result<()> {
    let mut reader = ByteReader::new(data);

    let _new_size = reader.dword()?;
    let first = reader.dword()?;
    let last = reader.dword()?;
    reader.skip(8)?;

    if last < first {
        return Err(Error::MalformedDocument(format!(
            "bad palette index range: first={} last={}",
            first, last
        )));
    }

    for index in first..=last {
        let flags = reader.word()?;
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        let name = if flags & 1 != 0 {
            Some(reader.string()?)
        } else {
            None
        };
        palette.set(index, [red, green, blue, alpha], name);
    }

    Ok(())
}

/// Old-style palette chunk (0x0004 and 0x0011): a sequence of packets,
/// each skipping forward and then supplying consecutive RGB triples.
/// The 0x0011 variant stores 6-bit channels which scale up as `v << 2`.
/// Alpha is always opaque in the old format.
pub(crate) fn parse_old_chunk(palette: &mut Palette, data: &[u8], six_bit: bool) -> Result<()> {
    let mut reader = ByteReader::new(data);

    let num_packets = reader.word()?;
    let mut index: u32 = 0;
    for _ in 0..num_packets {
        let skip = reader.byte()?;
        let count = reader.byte()?;
        let count = if count == 0 { 256 } else { count as u32 };
        index += skip as u32;
        for _ in 0..count {
            let mut red = reader.byte()?;
            let mut green = reader.byte()?;
            let mut blue = reader.byte()?;
            if six_bit {
                red <<= 2;
                green <<= 2;
                blue <<= 2;
            }
            palette.set(index, [red, green, blue, 255], None);
            index += 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_chunk(first: u32, last: u32, colors: &[[u8; 4]]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&(colors.len() as u32).to_le_bytes());
        data.extend_from_slice(&first.to_le_bytes());
        data.extend_from_slice(&last.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        for c in colors {
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(c);
        }
        data
    }

    #[test]
    fn later_chunks_overwrite_same_index() {
        let mut palette = Palette::new();
        parse_chunk(
            &mut palette,
            &new_chunk(0, 1, &[[1, 2, 3, 255], [4, 5, 6, 255]]),
        )
        .unwrap();
        parse_chunk(&mut palette, &new_chunk(1, 1, &[[7, 8, 9, 255]])).unwrap();

        assert_eq!(palette.num_colors(), 2);
        assert_eq!(palette.color(0), Some([1, 2, 3, 255]));
        assert_eq!(palette.color(1), Some([7, 8, 9, 255]));
    }

    #[test]
    fn old_chunk_scales_six_bit_channels() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes()); // one packet
        data.push(0); // no skip
        data.push(1); // one color
        data.extend_from_slice(&[63, 0, 32]);

        let mut palette = Palette::new();
        parse_old_chunk(&mut palette, &data, true).unwrap();
        assert_eq!(palette.color(0), Some([252, 0, 128, 255]));
    }

    #[test]
    fn rejects_reversed_range() {
        let mut palette = Palette::new();
        let chunk = new_chunk(3, 1, &[]);
        assert!(parse_chunk(&mut palette, &chunk).is_err());
    }
}
