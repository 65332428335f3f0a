use crate::reader::ByteReader;
use crate::{inflate, Error, Result};
use std::io::Read;

/// One cell of a tilemap cel: a tile id plus transform bits.
///
/// The diagonal flip is a transpose applied before the axis flips,
/// which is how a 90° clockwise rotation is encoded.
#[derive(Debug, Clone, Copy)]
pub struct Tile {
    pub(crate) id: u32,
    pub(crate) flip_x: bool,
    pub(crate) flip_y: bool,
    pub(crate) flip_diagonal: bool,
}

impl Tile {
    /// Index into the tileset's tile bank. 0 is the empty tile.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Horizontal flip bit.
    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    /// Vertical flip bit.
    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    /// Diagonal flip (transpose) bit.
    pub fn flip_diagonal(&self) -> bool {
        self.flip_diagonal
    }

    fn from_bits(bits: u32, masks: &TileBitmasks) -> Self {
        Self {
            id: bits & masks.id,
            flip_x: bits & masks.flip_x != 0,
            flip_y: bits & masks.flip_y != 0,
            flip_diagonal: bits & masks.flip_diagonal != 0,
        }
    }
}

// Which bits of a tile word carry the id and each transform flag,
// as declared by the cel chunk itself.
#[derive(Debug, Clone, Copy)]
struct TileBitmasks {
    id: u32,
    flip_x: u32,
    flip_y: u32,
    flip_diagonal: u32,
}

impl TileBitmasks {
    fn parse<R: Read>(reader: &mut ByteReader<R>) -> Result<Self> {
        let id = reader.dword()?;
        let flip_x = reader.dword()?;
        let flip_y = reader.dword()?;
        let flip_diagonal = reader.dword()?;
        Ok(Self {
            id,
            flip_x,
            flip_y,
            flip_diagonal,
        })
    }
}

/// The tile indices of one tilemap cel, in row-major order.
#[derive(Debug, Clone)]
pub struct TilemapData {
    width: u16,
    height: u16,
    tiles: Vec<Tile>,
}

impl TilemapData {
    /// Width in tiles.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The tile at (x, y), if inside the map.
    pub fn tile(&self, x: u16, y: u16) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(&self.tiles[y as usize * self.width as usize + x as usize])
    }

    /// Largest tile id used by this map, for validation against the
    /// tileset's tile count.
    pub(crate) fn max_tile_id(&self) -> Option<u32> {
        self.tiles.iter().map(|t| t.id).max()
    }

    pub(crate) fn parse<R: Read>(mut reader: ByteReader<R>) -> Result<Self> {
        let width = reader.word()?;
        let height = reader.word()?;
        let bits_per_tile = reader.word()?;
        if bits_per_tile != 32 {
            return Err(Error::Unsupported(format!(
                "only 32 bits per tile are supported, got {}",
                bits_per_tile
            )));
        }
        let masks = TileBitmasks::parse(&mut reader)?;
        reader.skip(10)?;

        let tile_count = width as usize * height as usize;
        let compressed = reader.take_rest()?;
        let bytes = inflate::zlib_decompress(&compressed, tile_count * 4)?;
        if bytes.len() != tile_count * 4 {
            return Err(Error::MalformedDocument(format!(
                "tilemap data holds {} bytes, expected {} ({}x{} tiles)",
                bytes.len(),
                tile_count * 4,
                width,
                height
            )));
        }

        let tiles = bytes
            .chunks_exact(4)
            .map(|word| {
                let bits = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                Tile::from_bits(bits, &masks)
            })
            .collect();

        Ok(Self {
            width,
            height,
            tiles,
        })
    }
}
