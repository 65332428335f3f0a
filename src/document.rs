use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::Arc,
};

use image::RgbaImage;

use crate::cel::{Cel, CelGrid, CelId};
use crate::compose::{self, ComposeOptions};
use crate::header::{ColorDepth, Header};
use crate::layer::{Layer, Layers};
use crate::palette::Palette;
use crate::slice::Slice;
use crate::tags::Tag;
use crate::tileset::Tilesets;
use crate::user_data::UserData;
use crate::{parse, Result};

/// A fully decoded sprite document.
///
/// All cross-entity relationships are dense zero-based indices (layer
/// index, frame index, palette index) into order-stable sequences, so
/// the model is cheap to share read-only. Compositing different frames
/// touches no shared mutable state and may run on parallel threads.
#[derive(Debug)]
pub struct Document {
    pub(crate) header: Header,
    // Behind an Arc because every piece of indexed pixel data resolves
    // through it, read-only.
    pub(crate) palette: Option<Arc<Palette>>,
    pub(crate) layers: Layers,
    pub(crate) frame_durations: Vec<u16>,
    pub(crate) cels: CelGrid,
    pub(crate) tags: Vec<Tag>,
    pub(crate) slices: Vec<Slice>,
    pub(crate) tilesets: Tilesets,
    pub(crate) sprite_user_data: Option<UserData>,
}

impl Document {
    /// Decode a document from a file on disk.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        parse::read_document(BufReader::new(file))
    }

    /// Decode a document from any byte source, e.g. an in-memory
    /// buffer.
    pub fn read<R: Read>(input: R) -> Result<Self> {
        parse::read_document(input)
    }

    /// The parsed file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u32 {
        self.header.width as u32
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u32 {
        self.header.height as u32
    }

    /// Canvas size as (width, height).
    pub fn size(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Pixel storage format of the document.
    pub fn color_depth(&self) -> ColorDepth {
        self.header.color_depth
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u32 {
        self.header.num_frames as u32
    }

    /// The document's layers, bottom to top.
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Look up a layer by name. If several share the name, the lowest
    /// index wins.
    pub fn layer_by_name(&self, name: &str) -> Option<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .find(|(_, layer)| layer.name() == name)
    }

    /// The color palette, present for indexed documents and whenever
    /// the file stored one.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_deref()
    }

    /// All animation tags, in file order.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Look up a tag by name. If several share the name, the lowest
    /// index wins.
    pub fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.name() == name)
    }

    /// All slices, in file order.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// The document's tilesets.
    pub fn tilesets(&self) -> &Tilesets {
        &self.tilesets
    }

    /// User data attached to the sprite itself, if any.
    pub fn sprite_user_data(&self) -> Option<&UserData> {
        self.sprite_user_data.as_ref()
    }

    /// A handle to one frame.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [Document::num_frames].
    pub fn frame(&self, index: u32) -> Frame<'_> {
        assert!(index < self.num_frames());
        Frame {
            document: self,
            index: index as u16,
        }
    }

    /// The cel at the given frame and layer, if one exists. A linked
    /// cel is returned as stored; see [Cel::linked_frame].
    pub fn cel(&self, frame: u32, layer: u32) -> Option<&Cel> {
        self.cels.get(CelId {
            frame: frame as u16,
            layer: layer as u16,
        })
    }
}

/// A reference to a single frame of a [Document].
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    document: &'a Document,
    index: u16,
}

impl<'a> Frame<'a> {
    /// Frame index.
    pub fn index(&self) -> u32 {
        self.index as u32
    }

    /// Frame duration in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        self.document.frame_durations[self.index as usize] as u32
    }

    /// Flatten this frame with default options: hidden layers are
    /// skipped, background and tilemap layers are included.
    pub fn image(&self) -> RgbaImage {
        self.image_with(&ComposeOptions::default())
    }

    /// Flatten this frame with explicit compositing options.
    pub fn image_with(&self, options: &ComposeOptions) -> RgbaImage {
        compose::compose_frame(self.document, self.index, options)
    }
}
