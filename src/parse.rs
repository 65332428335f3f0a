//! The document reader: a single pass over the byte stream in the
//! shape Header, then per frame a frame header followed by that
//! frame's chunks.
//!
//! Chunks are self-length-prefixed and type-tagged. Types this crate
//! does not know are skipped using their declared length; the format
//! is forward-extensible and unknown chunks are the one tolerated
//! inconsistency. Everything else that does not line up aborts the
//! parse, and no partial document is ever returned.

use std::io::Read;
use std::sync::Arc;

use log::{debug, warn};

use crate::cel::{self, Cel, CelGrid, CelId};
use crate::document::Document;
use crate::header::{self, ColorDepth, Header};
use crate::layer::{self, Layer, Layers};
use crate::palette::{self, Palette};
use crate::reader::ByteReader;
use crate::slice::{self, Slice};
use crate::tags::{self, Tag};
use crate::tileset::{self, Tilesets};
use crate::user_data::{self, UserData};
use crate::{Error, Result};

pub(crate) const FRAME_MAGIC: u16 = 0xF1FA;

const FRAME_HEADER_SIZE: i64 = 16;
const CHUNK_HEADER_SIZE: u32 = 6;

// Chunk type tags. Deprecated and out-of-scope types are listed so
// they can be ignored quietly; everything else gets a warning.
const CHUNK_OLD_PALETTE_8: u16 = 0x0004;
const CHUNK_OLD_PALETTE_6: u16 = 0x0011;
const CHUNK_LAYER: u16 = 0x2004;
const CHUNK_CEL: u16 = 0x2005;
const CHUNK_CEL_EXTRA: u16 = 0x2006;
const CHUNK_COLOR_PROFILE: u16 = 0x2007;
const CHUNK_EXTERNAL_FILES: u16 = 0x2008;
const CHUNK_MASK: u16 = 0x2016;
const CHUNK_PATH: u16 = 0x2017;
const CHUNK_TAGS: u16 = 0x2018;
const CHUNK_PALETTE: u16 = 0x2019;
const CHUNK_USER_DATA: u16 = 0x2020;
const CHUNK_SLICE: u16 = 0x2022;
const CHUNK_TILESET: u16 = 0x2023;

// Where the next user data chunk will attach. The format appends user
// data *after* the chunk that owns it, so the parser carries the most
// recently parsed ownable chunk as single-slot state.
#[derive(Clone, Copy)]
enum AttachTarget {
    Layer(usize),
    Cel(CelId),
    // Index of the next tag to receive user data; consecutive user
    // data chunks after a tags chunk attach to consecutive tags.
    Tag(usize),
    Slice(usize),
    Sprite,
}

struct DocumentBuilder {
    depth: ColorDepth,
    palette: Option<Palette>,
    layers: Vec<Layer>,
    cels: CelGrid,
    frame_durations: Vec<u16>,
    tags: Vec<Tag>,
    slices: Vec<Slice>,
    tilesets: Tilesets,
    sprite_user_data: Option<UserData>,
    attach_target: Option<AttachTarget>,
}

impl DocumentBuilder {
    fn new(header: &Header) -> Self {
        Self {
            depth: header.color_depth,
            palette: None,
            layers: Vec::new(),
            cels: CelGrid::new(header.num_frames),
            frame_durations: vec![header.default_frame_time; header.num_frames as usize],
            tags: Vec::new(),
            slices: Vec::new(),
            tilesets: Tilesets::new(),
            sprite_user_data: None,
            attach_target: None,
        }
    }

    fn palette_mut(&mut self) -> &mut Palette {
        self.palette.get_or_insert_with(Palette::new)
    }

    fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
        self.attach_target = Some(AttachTarget::Layer(self.layers.len() - 1));
    }

    fn add_cel(&mut self, frame: u16, cel: Cel) -> Result<()> {
        let id = CelId {
            frame,
            layer: cel.layer_index(),
        };
        self.cels.add(frame, cel)?;
        self.attach_target = Some(AttachTarget::Cel(id));
        Ok(())
    }

    fn add_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
        self.attach_target = Some(AttachTarget::Tag(0));
    }

    fn add_slice(&mut self, slice: Slice) {
        self.slices.push(slice);
        self.attach_target = Some(AttachTarget::Slice(self.slices.len() - 1));
    }

    fn attach_user_data(&mut self, user_data: UserData) -> Result<()> {
        let target = self.attach_target.ok_or_else(|| {
            Error::MalformedDocument(
                "dangling user data chunk: no preceding chunk can own it".to_owned(),
            )
        })?;
        match target {
            AttachTarget::Layer(index) => {
                let layer = self.layers.get_mut(index).ok_or_else(|| {
                    Error::MalformedDocument(format!("user data names missing layer {}", index))
                })?;
                layer.user_data = Some(user_data);
            }
            AttachTarget::Cel(id) => {
                let cel = self.cels.get_mut(id).ok_or_else(|| {
                    Error::MalformedDocument(format!("user data names missing cel at {}", id))
                })?;
                cel.user_data = Some(user_data);
            }
            AttachTarget::Tag(index) => {
                let tag_count = self.tags.len();
                let tag = self.tags.get_mut(index).ok_or_else(|| {
                    Error::MalformedDocument(format!(
                        "user data chunk for tag {} but the document has {} tags",
                        index, tag_count
                    ))
                })?;
                tag.set_user_data(user_data);
                self.attach_target = Some(AttachTarget::Tag(index + 1));
            }
            AttachTarget::Slice(index) => {
                let slice = self.slices.get_mut(index).ok_or_else(|| {
                    Error::MalformedDocument(format!("user data names missing slice {}", index))
                })?;
                slice.user_data = Some(user_data);
            }
            AttachTarget::Sprite => {
                self.sprite_user_data = Some(user_data);
            }
        }
        Ok(())
    }

    fn finish(self, header: Header) -> Result<Document> {
        if self.layers.is_empty() {
            return Err(Error::MalformedDocument(
                "document contains no layers".to_owned(),
            ));
        }
        if matches!(header.color_depth, ColorDepth::Indexed { .. }) && self.palette.is_none() {
            return Err(Error::MalformedDocument(
                "indexed color depth but the document has no palette".to_owned(),
            ));
        }
        for tag in &self.tags {
            if tag.to_frame() >= header.num_frames {
                return Err(Error::MalformedDocument(format!(
                    "tag {:?} covers frames {}..{} but the document has {} frames",
                    tag.name(),
                    tag.from_frame(),
                    tag.to_frame(),
                    header.num_frames
                )));
            }
        }

        let layers = Layers::from_vec(self.layers);
        self.tilesets.validate(self.palette.as_ref())?;
        layers.validate(&self.tilesets)?;
        self.cels
            .validate(&layers, &self.tilesets, self.palette.as_ref())?;

        Ok(Document {
            header,
            palette: self.palette.map(Arc::new),
            layers,
            frame_durations: self.frame_durations,
            cels: self.cels,
            tags: self.tags,
            slices: self.slices,
            tilesets: self.tilesets,
            sprite_user_data: self.sprite_user_data,
        })
    }
}

/// Decode a complete document from `input`.
pub(crate) fn read_document<R: Read>(input: R) -> Result<Document> {
    let mut reader = ByteReader::with(input);
    let header = header::parse_header(&mut reader)?;
    let mut builder = DocumentBuilder::new(&header);

    for frame in 0..header.num_frames() {
        parse_frame(&mut reader, frame, &mut builder)?;
    }

    builder.finish(header)
}

fn parse_frame<R: Read>(
    reader: &mut ByteReader<R>,
    frame: u16,
    builder: &mut DocumentBuilder,
) -> Result<()> {
    let frame_start = reader.pos();
    let num_bytes = reader.dword()?;
    let magic = reader.word()?;
    if magic != FRAME_MAGIC {
        return Err(Error::MalformedDocument(format!(
            "bad frame magic for frame {} at offset {}: 0x{:04x} != 0x{:04x}",
            frame,
            reader.pos() - 2,
            magic,
            FRAME_MAGIC
        )));
    }
    let legacy_num_chunks = reader.word()?;
    let duration_ms = reader.word()?;
    reader.skip(2)?;
    let new_num_chunks = reader.dword()?;

    builder.frame_durations[frame as usize] = duration_ms;

    // The legacy WORD saturates at 0xFFFF; only then is the DWORD
    // field authoritative.
    let num_chunks = if legacy_num_chunks == 0xFFFF {
        new_num_chunks
    } else {
        legacy_num_chunks as u32
    };

    let mut bytes_available = num_bytes as i64 - FRAME_HEADER_SIZE;
    for _ in 0..num_chunks {
        bytes_available = parse_chunk(reader, frame, bytes_available, builder)?;
    }

    // The per-chunk size checks make overrun impossible; any
    // remainder is padding to step over so the next frame header
    // lines up.
    let consumed = reader.pos() - frame_start;
    if consumed < num_bytes as u64 {
        debug!(
            "frame {}: skipping {} trailing bytes",
            frame,
            num_bytes as u64 - consumed
        );
        reader.skip((num_bytes as u64 - consumed) as usize)?;
    }

    Ok(())
}

fn parse_chunk<R: Read>(
    reader: &mut ByteReader<R>,
    frame: u16,
    bytes_available: i64,
    builder: &mut DocumentBuilder,
) -> Result<i64> {
    let chunk_offset = reader.pos();
    let chunk_size = reader.dword()?;
    let chunk_type = reader.word()?;

    if chunk_size < CHUNK_HEADER_SIZE {
        return Err(Error::MalformedDocument(format!(
            "chunk at offset {} declares size {}, less than its own header",
            chunk_offset, chunk_size
        )));
    }
    if chunk_size as i64 > bytes_available {
        return Err(Error::MalformedDocument(format!(
            "chunk at offset {} declares size {} but only {} bytes remain in the frame",
            chunk_offset, chunk_size, bytes_available
        )));
    }

    let mut data = vec![0_u8; (chunk_size - CHUNK_HEADER_SIZE) as usize];
    reader.read_exact(&mut data)?;

    match chunk_type {
        CHUNK_OLD_PALETTE_8 => {
            palette::parse_old_chunk(builder.palette_mut(), &data, false)?;
            // Sprite user data follows the old palette chunk of the
            // first frame.
            builder.attach_target = Some(AttachTarget::Sprite);
        }
        CHUNK_OLD_PALETTE_6 => {
            palette::parse_old_chunk(builder.palette_mut(), &data, true)?;
            builder.attach_target = Some(AttachTarget::Sprite);
        }
        CHUNK_PALETTE => {
            palette::parse_chunk(builder.palette_mut(), &data)?;
        }
        CHUNK_LAYER => {
            let layer = layer::parse_chunk(&data)?;
            builder.add_layer(layer);
        }
        CHUNK_CEL => {
            let cel = cel::parse_chunk(&data, builder.depth)?;
            builder.add_cel(frame, cel)?;
        }
        CHUNK_TAGS => {
            if frame == 0 {
                builder.add_tags(tags::parse_chunk(&data)?);
            } else {
                debug!("ignoring tags chunk outside of frame 0");
            }
        }
        CHUNK_SLICE => {
            let slice = slice::parse_chunk(&data)?;
            builder.add_slice(slice);
        }
        CHUNK_TILESET => {
            let tileset = tileset::Tileset::parse_chunk(&data, builder.depth)?;
            builder.tilesets.add(tileset);
        }
        CHUNK_USER_DATA => {
            let user_data = user_data::parse_chunk(&data)?;
            builder.attach_user_data(user_data)?;
        }
        CHUNK_COLOR_PROFILE | CHUNK_CEL_EXTRA | CHUNK_EXTERNAL_FILES | CHUNK_MASK | CHUNK_PATH => {
            debug!("ignoring chunk type 0x{:04x}", chunk_type);
        }
        _ => {
            // Forward compatibility: step over anything unrecognized.
            warn!(
                "skipping unknown chunk type 0x{:04x} ({} bytes) at offset {}",
                chunk_type,
                data.len(),
                chunk_offset
            );
        }
    }

    Ok(bytes_available - chunk_size as i64)
}
