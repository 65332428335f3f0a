use crate::reader::ByteReader;
use crate::{Error, Result};
use std::io::Read;

/// Pixel storage format of the document, fixed by the 128-byte header.
///
/// Pixels are kept in this native depth inside the model and only
/// resolved to RGBA when a frame is composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// Red, green, blue and alpha, 8 bits each.
    Rgba,
    /// 8-bit luminance plus 8-bit alpha.
    Grayscale,
    /// 8-bit palette indices. `transparent_index` names the entry that
    /// reads as fully transparent on non-background layers.
    #[allow(missing_docs)]
    Indexed { transparent_index: u8 },
}

impl ColorDepth {
    /// Bytes used to store one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorDepth::Rgba => 4,
            ColorDepth::Grayscale => 2,
            ColorDepth::Indexed { .. } => 1,
        }
    }

    /// The transparent palette index, for indexed documents.
    pub fn transparent_index(&self) -> Option<u8> {
        match self {
            ColorDepth::Indexed { transparent_index } => Some(*transparent_index),
            _ => None,
        }
    }
}

/// The fixed-layout file header. Immutable once parsed.
#[derive(Debug, Clone)]
pub struct Header {
    pub(crate) file_size: u32,
    pub(crate) num_frames: u16,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) color_depth: ColorDepth,
    pub(crate) flags: u32,
    pub(crate) default_frame_time: u16,
    pub(crate) num_colors: u16,
    pub(crate) pixel_width: u8,
    pub(crate) pixel_height: u8,
    pub(crate) grid_x: i16,
    pub(crate) grid_y: i16,
    pub(crate) grid_width: u16,
    pub(crate) grid_height: u16,
}

pub(crate) const HEADER_MAGIC: u16 = 0xA5E0;

impl Header {
    /// Declared total file size in bytes.
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Number of animation frames.
    pub fn num_frames(&self) -> u16 {
        self.num_frames
    }

    /// Pixel storage format.
    pub fn color_depth(&self) -> ColorDepth {
        self.color_depth
    }

    /// Raw header flag word.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Default frame duration in milliseconds, used for frames that do
    /// not carry their own duration.
    pub fn default_frame_time(&self) -> u16 {
        self.default_frame_time
    }

    /// Declared number of palette colors. The on-disk value 0 means 256.
    pub fn num_colors(&self) -> u16 {
        self.num_colors
    }

    /// Pixel aspect ratio as (width, height). (1, 1) means square
    /// pixels; compositing does not rescale either way.
    pub fn pixel_ratio(&self) -> (u8, u8) {
        (self.pixel_width, self.pixel_height)
    }

    /// Grid origin in canvas coordinates.
    pub fn grid_origin(&self) -> (i16, i16) {
        (self.grid_x, self.grid_y)
    }

    /// Grid cell size. (0, 0) when the document defines no grid.
    pub fn grid_size(&self) -> (u16, u16) {
        (self.grid_width, self.grid_height)
    }
}

pub(crate) fn parse_header<R: Read>(reader: &mut ByteReader<R>) -> Result<Header> {
    let file_size = reader.dword()?;
    let magic = reader.word()?;
    if magic != HEADER_MAGIC {
        return Err(Error::MalformedDocument(format!(
            "bad header magic at offset {}: 0x{:04x} != 0x{:04x}",
            reader.pos() - 2,
            magic,
            HEADER_MAGIC
        )));
    }
    let num_frames = reader.word()?;
    let width = reader.word()?;
    let height = reader.word()?;
    let depth = reader.word()?;
    let flags = reader.dword()?;
    let default_frame_time = reader.word()?;
    let _reserved1 = reader.dword()?;
    let _reserved2 = reader.dword()?;
    let transparent_index = reader.byte()?;
    reader.skip(3)?;
    let num_colors = reader.word()?;
    let pixel_width = reader.byte()?;
    let pixel_height = reader.byte()?;
    let grid_x = reader.short()?;
    let grid_y = reader.short()?;
    let grid_width = reader.word()?;
    let grid_height = reader.word()?;
    reader.skip(84)?;

    if width == 0 || height == 0 {
        return Err(Error::MalformedDocument(format!(
            "bad canvas size: {}x{}",
            width, height
        )));
    }

    let color_depth = match depth {
        8 => ColorDepth::Indexed { transparent_index },
        16 => ColorDepth::Grayscale,
        32 => ColorDepth::Rgba,
        _ => {
            return Err(Error::MalformedDocument(format!(
                "unknown color depth: {} bits",
                depth
            )))
        }
    };

    // The on-disk color count uses 0 as shorthand for a full palette.
    let num_colors = if num_colors == 0 { 256 } else { num_colors };

    Ok(Header {
        file_size,
        num_frames,
        width,
        height,
        color_depth,
        flags,
        default_frame_time,
        num_colors,
        pixel_width,
        pixel_height,
        grid_x,
        grid_y,
        grid_width,
        grid_height,
    })
}
