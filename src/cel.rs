use crate::layer::{LayerKind, Layers};
use crate::pixel::Pixels;
use crate::reader::ByteReader;
use crate::tilemap::TilemapData;
use crate::tileset::Tilesets;
use crate::user_data::UserData;
use crate::{header::ColorDepth, palette::Palette, Error, Result};
use std::fmt;

/// Position of a cel: the crossing of one frame and one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelId {
    /// Frame index.
    pub frame: u16,
    /// Layer index.
    pub layer: u16,
}

impl fmt::Display for CelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(frame {}, layer {})", self.frame, self.layer)
    }
}

// Pixel content of an image cel.
pub(crate) struct ImageData {
    pub width: u16,
    pub height: u16,
    pub pixels: Pixels,
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}x{} pixels>", self.width, self.height)
    }
}

// What a cel holds. Raw and compressed image cels both end up as
// Image; a linked cel stores only the frame it borrows from.
#[derive(Debug)]
pub(crate) enum CelContent {
    Image(ImageData),
    Linked(u16),
    Tilemap(TilemapData),
}

/// One cel: the pixel (or tile) content a layer contributes to a
/// frame, placed at an offset relative to the canvas.
#[derive(Debug)]
pub struct Cel {
    pub(crate) layer_index: u16,
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) opacity: u8,
    pub(crate) content: CelContent,
    pub(crate) user_data: Option<UserData>,
}

impl Cel {
    /// Layer this cel belongs to.
    pub fn layer_index(&self) -> u16 {
        self.layer_index
    }

    /// Top-left offset relative to the canvas. May be negative or
    /// reach outside the canvas; compositing clips.
    pub fn origin(&self) -> (i16, i16) {
        (self.x, self.y)
    }

    /// Cel opacity, combined with the layer opacity when compositing.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// True if this cel borrows its content from an earlier frame.
    pub fn is_linked(&self) -> bool {
        matches!(self.content, CelContent::Linked(_))
    }

    /// The frame a linked cel borrows from.
    pub fn linked_frame(&self) -> Option<u16> {
        match self.content {
            CelContent::Linked(frame) => Some(frame),
            _ => None,
        }
    }

    /// The tile indices of a tilemap cel.
    pub fn tilemap(&self) -> Option<&TilemapData> {
        match &self.content {
            CelContent::Tilemap(data) => Some(data),
            _ => None,
        }
    }

    /// User data attached to this cel, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }
}

/// All cels of the document in a dense frame-by-layer grid.
pub(crate) struct CelGrid {
    // data[frame][layer], rows padded lazily as cels arrive.
    data: Vec<Vec<Option<Cel>>>,
}

impl fmt::Debug for CelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (frame, row) in self.data.iter().enumerate() {
            for (layer, cel) in row.iter().enumerate() {
                if let Some(cel) = cel {
                    map.entry(
                        &CelId {
                            frame: frame as u16,
                            layer: layer as u16,
                        },
                        cel,
                    );
                }
            }
        }
        map.finish()
    }
}

impl CelGrid {
    pub(crate) fn new(num_frames: u16) -> Self {
        let mut data = Vec::with_capacity(num_frames as usize);
        data.resize_with(num_frames as usize, Vec::new);
        CelGrid { data }
    }

    pub(crate) fn add(&mut self, frame: u16, cel: Cel) -> Result<()> {
        let layer = cel.layer_index as usize;
        let row = self.data.get_mut(frame as usize).ok_or_else(|| {
            Error::MalformedDocument(format!("cel declared for frame {} outside document", frame))
        })?;
        if row.len() <= layer {
            row.resize_with(layer + 1, || None);
        }
        if row[layer].is_some() {
            return Err(Error::MalformedDocument(format!(
                "duplicate cel at {}",
                CelId {
                    frame,
                    layer: layer as u16
                }
            )));
        }
        row[layer] = Some(cel);
        Ok(())
    }

    pub(crate) fn get(&self, id: CelId) -> Option<&Cel> {
        self.data
            .get(id.frame as usize)?
            .get(id.layer as usize)?
            .as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: CelId) -> Option<&mut Cel> {
        self.data
            .get_mut(id.frame as usize)?
            .get_mut(id.layer as usize)?
            .as_mut()
    }

    /// The cels of one frame, bottom layer first.
    pub(crate) fn frame_cels(&self, frame: u16) -> impl Iterator<Item = (u16, &Cel)> {
        self.data[frame as usize]
            .iter()
            .enumerate()
            .filter_map(|(layer, cel)| cel.as_ref().map(|c| (layer as u16, c)))
    }

    pub(crate) fn validate(
        &self,
        layers: &Layers,
        tilesets: &Tilesets,
        palette: Option<&Palette>,
    ) -> Result<()> {
        for (frame, row) in self.data.iter().enumerate() {
            for (layer_index, cel) in row.iter().enumerate() {
                let cel = match cel {
                    Some(cel) => cel,
                    None => continue,
                };
                let id = CelId {
                    frame: frame as u16,
                    layer: layer_index as u16,
                };
                let layer = layers.get(layer_index).ok_or_else(|| {
                    Error::MalformedDocument(format!(
                        "cel at {} references layer outside the layer list",
                        id
                    ))
                })?;
                match &cel.content {
                    CelContent::Image(image) => {
                        if let Some(indices) = image.pixels.indexed_bytes() {
                            let palette = palette.ok_or_else(|| {
                                Error::MalformedDocument(
                                    "indexed cel pixels but the document has no palette"
                                        .to_owned(),
                                )
                            })?;
                            palette.validate_indices(indices)?;
                        }
                    }
                    CelContent::Linked(target_frame) => {
                        // Links may only point backwards; anything else
                        // could cycle.
                        if *target_frame >= id.frame {
                            return Err(Error::UnresolvedLink(format!(
                                "cel at {} links forward to frame {}",
                                id, target_frame
                            )));
                        }
                        let target = self
                            .get(CelId {
                                frame: *target_frame,
                                layer: id.layer,
                            })
                            .ok_or_else(|| {
                                Error::UnresolvedLink(format!(
                                    "cel at {} links to frame {} which has no cel on that layer",
                                    id, target_frame
                                ))
                            })?;
                        if target.is_linked() {
                            return Err(Error::UnresolvedLink(format!(
                                "cel at {} links to frame {} which is itself a link",
                                id, target_frame
                            )));
                        }
                    }
                    CelContent::Tilemap(map) => {
                        let tileset_id = match layer.kind() {
                            LayerKind::Tilemap(tileset_id) => tileset_id,
                            _ => {
                                return Err(Error::MalformedDocument(format!(
                                    "tilemap cel at {} on non-tilemap layer {:?}",
                                    id,
                                    layer.name()
                                )))
                            }
                        };
                        // Layer validation already checked the tileset
                        // exists.
                        if let Some(tileset) = tilesets.get(tileset_id) {
                            if let Some(max_id) = map.max_tile_id() {
                                if max_id >= tileset.tile_count() {
                                    return Err(Error::UnresolvedLink(format!(
                                        "cel at {} uses tile {} but tileset {} has {} tiles",
                                        id,
                                        max_id,
                                        tileset_id.value(),
                                        tileset.tile_count()
                                    )));
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn parse_chunk(data: &[u8], depth: ColorDepth) -> Result<Cel> {
    let mut reader = ByteReader::new(data);
    let layer_index = reader.word()?;
    let x = reader.short()?;
    let y = reader.short()?;
    let opacity = reader.byte()?;
    let cel_type = reader.word()?;
    reader.skip(7)?;

    let content = match cel_type {
        0 => parse_image(reader, depth, false)?,
        1 => CelContent::Linked(reader.word()?),
        2 => parse_image(reader, depth, true)?,
        3 => CelContent::Tilemap(TilemapData::parse(reader)?),
        // There is no declared sub-length to skip by, so an unknown
        // cel type cannot be stepped over like an unknown chunk.
        _ => {
            return Err(Error::MalformedDocument(format!(
                "unknown cel type {} on layer {}",
                cel_type, layer_index
            )))
        }
    };

    Ok(Cel {
        layer_index,
        x,
        y,
        opacity,
        content,
        user_data: None,
    })
}

fn parse_image<R: std::io::Read>(
    mut reader: ByteReader<R>,
    depth: ColorDepth,
    compressed: bool,
) -> Result<CelContent> {
    let width = reader.word()?;
    let height = reader.word()?;
    let pixel_count = width as usize * height as usize;
    let pixels = if compressed {
        let bytes = reader.take_rest()?;
        Pixels::from_compressed(&bytes, depth, pixel_count)?
    } else {
        let bytes = reader.take_bytes(pixel_count * depth.bytes_per_pixel())?;
        Pixels::from_raw(bytes, depth, pixel_count)?
    };
    Ok(CelContent::Image(ImageData {
        width,
        height,
        pixels,
    }))
}
