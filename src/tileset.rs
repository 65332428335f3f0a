use std::collections::HashMap;

use crate::pixel::Pixels;
use crate::reader::ByteReader;
use crate::{header::ColorDepth, palette::Palette, Error, Result};
use bitflags::bitflags;

/// Identifier of a [Tileset], as referenced by tilemap layers.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TilesetId(pub(crate) u32);

impl TilesetId {
    /// The raw id value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

bitflags! {
    struct TilesetFlags: u32 {
        // Tiles live in an external file.
        const LINKS_EXTERNAL_FILE = 0x0001;
        // Tiles are embedded in this chunk.
        const FILE_INCLUDES_TILES = 0x0002;
        // Tile id 0 is the empty tile.
        const EMPTY_TILE_IS_ID_ZERO = 0x0004;
    }
}

/// A bank of fixed-size tile images shared by tilemap layers.
///
/// All tiles are stored concatenated in one pixel buffer; a tile id
/// indexes into it.
#[derive(Debug)]
pub struct Tileset {
    pub(crate) id: TilesetId,
    pub(crate) tile_count: u32,
    pub(crate) tile_width: u16,
    pub(crate) tile_height: u16,
    pub(crate) base_index: i16,
    pub(crate) name: String,
    pub(crate) pixels: Pixels,
}

impl Tileset {
    /// Tileset id.
    pub fn id(&self) -> TilesetId {
        self.id
    }

    /// Number of tiles in the bank. Tile 0 is the empty tile.
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// Tile size in pixels as (width, height).
    pub fn tile_size(&self) -> (u16, u16) {
        (self.tile_width, self.tile_height)
    }

    /// Tileset name. Not necessarily unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Editor-facing number shown for the first tile. Not used when
    /// resolving tile ids.
    pub fn base_index(&self) -> i16 {
        self.base_index
    }

    pub(crate) fn pixels_per_tile(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize
    }

    pub(crate) fn parse_chunk(data: &[u8], depth: ColorDepth) -> Result<Tileset> {
        let mut reader = ByteReader::new(data);
        let id = TilesetId(reader.dword()?);
        let flags = TilesetFlags::from_bits_truncate(reader.dword()?);
        let tile_count = reader.dword()?;
        let tile_width = reader.word()?;
        let tile_height = reader.word()?;
        let base_index = reader.short()?;
        reader.skip(14)?;
        let name = reader.string()?;

        if flags.contains(TilesetFlags::LINKS_EXTERNAL_FILE) {
            return Err(Error::Unsupported(format!(
                "tileset {} ({:?}) links to an external file",
                id.0, name
            )));
        }
        if !flags.contains(TilesetFlags::FILE_INCLUDES_TILES) {
            return Err(Error::MalformedDocument(format!(
                "tileset {} ({:?}) contains no tile data",
                id.0, name
            )));
        }

        let _compressed_length = reader.dword()?;
        let expected_count =
            tile_count as usize * tile_width as usize * tile_height as usize;
        let compressed = reader.take_rest()?;
        let pixels = Pixels::from_compressed(&compressed, depth, expected_count)?;

        Ok(Tileset {
            id,
            tile_count,
            tile_width,
            tile_height,
            base_index,
            name,
            pixels,
        })
    }
}

/// All tilesets of a document, addressed by id.
#[derive(Debug, Default)]
pub struct Tilesets(HashMap<TilesetId, Tileset>);

impl Tilesets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, tileset: Tileset) {
        self.0.insert(tileset.id(), tileset);
    }

    /// Look up a tileset by id.
    pub fn get(&self, id: TilesetId) -> Option<&Tileset> {
        self.0.get(&id)
    }

    /// Number of tilesets.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the document has no tilesets.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all tilesets in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &Tileset> {
        self.0.values()
    }

    pub(crate) fn validate(&self, palette: Option<&Palette>) -> Result<()> {
        for tileset in self.0.values() {
            if let Some(indices) = tileset.pixels.indexed_bytes() {
                let palette = palette.ok_or_else(|| {
                    Error::MalformedDocument(
                        "indexed tileset pixels but the document has no palette".to_owned(),
                    )
                })?;
                palette.validate_indices(indices)?;
            }
        }
        Ok(())
    }
}
