//! Spritesheet packing: arranging composited frames into one atlas
//! image plus animation metadata derived from tags.

use image::{imageops, RgbaImage};

use crate::checksum;
use crate::compose::ComposeOptions;
use crate::document::Document;
use crate::tags::LoopDirection;
use crate::{Error, Result};

/// Hard ceiling on either atlas dimension. Failing fast here beats
/// letting a corrupt frame count allocate gigabytes.
pub const MAX_ATLAS_DIM: u32 = 16384;

/// How frames are laid out in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackMethod {
    /// A roughly square grid: the column count is the square root of
    /// the (deduplicated) frame count, rounded up.
    SquareGrid,
    /// All frames in a single row.
    HorizontalStrip,
    /// All frames in a single column.
    VerticalStrip,
}

/// Options controlling [Spritesheet::build].
#[derive(Debug, Clone, Copy)]
pub struct SheetOptions {
    /// Layout strategy.
    pub method: PackMethod,
    /// Composite only visible layers (the default). When false, hidden
    /// layers are flattened into the frames as well.
    pub only_visible_layers: bool,
    /// Store byte-identical frames once and point every source frame
    /// at the shared copy.
    pub merge_duplicates: bool,
    /// Empty pixels around the outer edge of the atlas.
    pub border_padding: u32,
    /// Empty pixels between neighboring frame cells.
    pub shape_padding: u32,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            method: PackMethod::SquareGrid,
            only_visible_layers: true,
            merge_duplicates: true,
            border_padding: 0,
            shape_padding: 0,
        }
    }
}

/// A rectangle in atlas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

/// One physical cell of the atlas.
#[derive(Debug, Clone)]
pub struct SheetFrame {
    /// Where the cell sits in the atlas.
    pub rect: Rect,
    /// Source frame indices stored in this cell. More than one only
    /// when duplicate merging collapsed identical frames.
    pub sources: Vec<u32>,
}

/// One step of a packed animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationFrame {
    /// Atlas rectangle to display.
    pub rect: Rect,
    /// How long to display it, in milliseconds.
    pub duration_ms: u32,
}

/// An animation segment derived from one tag.
#[derive(Debug, Clone)]
pub struct Animation {
    pub(crate) name: String,
    pub(crate) direction: LoopDirection,
    pub(crate) repeat: u16,
    pub(crate) frames: Vec<AnimationFrame>,
}

impl Animation {
    /// The tag name this animation came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tag's loop direction. The [frames](Animation::frames)
    /// sequence is already unrolled accordingly; the direction is kept
    /// for consumers that want to know.
    pub fn direction(&self) -> LoopDirection {
        self.direction
    }

    /// How many times the segment plays. 0 means forever.
    pub fn repeat(&self) -> u16 {
        self.repeat
    }

    /// The unrolled playback sequence.
    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }
}

/// A packed spritesheet: the atlas image, per-frame placements, and
/// tag-derived animations.
#[derive(Debug)]
pub struct Spritesheet {
    image: RgbaImage,
    frames: Vec<SheetFrame>,
    // Source frame index -> index into `frames`.
    frame_map: Vec<usize>,
    animations: Vec<Animation>,
}

impl Spritesheet {
    /// Composite every frame of `document` and pack the results.
    pub fn build(document: &Document, options: &SheetOptions) -> Result<Spritesheet> {
        let compose_options = ComposeOptions {
            include_hidden_layers: !options.only_visible_layers,
            ..ComposeOptions::default()
        };
        let frames: Vec<RgbaImage> = (0..document.num_frames())
            .map(|index| document.frame(index).image_with(&compose_options))
            .collect();
        let durations: Vec<u32> = (0..document.num_frames())
            .map(|index| document.frame(index).duration_ms())
            .collect();
        pack(document, frames, &durations, options)
    }

    /// Atlas size as (width, height).
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// The atlas pixels: row-major RGBA, ready to hand to any image
    /// sink or texture upload that takes (width, height, bytes).
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the sheet, keeping only the atlas image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// The physical cells of the atlas, in placement order.
    pub fn frames(&self) -> &[SheetFrame] {
        &self.frames
    }

    /// The atlas rectangle holding `source_frame`'s pixels.
    ///
    /// # Panics
    ///
    /// Panics if `source_frame` is not a valid frame index of the
    /// packed document.
    pub fn frame_rect(&self, source_frame: u32) -> Rect {
        self.frames[self.frame_map[source_frame as usize]].rect
    }

    /// Animations derived from the document's tags, in tag order.
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }
}

fn pack(
    document: &Document,
    frames: Vec<RgbaImage>,
    durations: &[u32],
    options: &SheetOptions,
) -> Result<Spritesheet> {
    let (frame_w, frame_h) = check_uniform_size(&frames)?;

    // Deduplicate. A Crc32 over the raw bytes rules out most
    // candidates cheaply; byte comparison confirms, so hash collisions
    // cannot merge distinct frames.
    let mut unique: Vec<usize> = Vec::new();
    let mut hashes: Vec<u32> = Vec::new();
    let mut frame_map: Vec<usize> = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        let hash = checksum::crc32(frame.as_raw());
        let found = if options.merge_duplicates {
            unique
                .iter()
                .zip(&hashes)
                .position(|(&candidate, &candidate_hash)| {
                    candidate_hash == hash && frames[candidate].as_raw() == frame.as_raw()
                })
        } else {
            None
        };
        match found {
            Some(cell) => frame_map.push(cell),
            None => {
                unique.push(index);
                hashes.push(hash);
                frame_map.push(unique.len() - 1);
            }
        }
    }

    let (cols, rows) = grid_shape(options.method, unique.len() as u32);
    let atlas_w = atlas_extent(cols, frame_w, options.border_padding, options.shape_padding);
    let atlas_h = atlas_extent(rows, frame_h, options.border_padding, options.shape_padding);
    if atlas_w > MAX_ATLAS_DIM || atlas_h > MAX_ATLAS_DIM {
        return Err(Error::Packing(format!(
            "atlas of {}x{} exceeds the maximum dimension of {}",
            atlas_w, atlas_h, MAX_ATLAS_DIM
        )));
    }

    let mut image = RgbaImage::new(atlas_w, atlas_h);
    let mut sheet_frames: Vec<SheetFrame> = Vec::with_capacity(unique.len());
    for (cell, &source) in unique.iter().enumerate() {
        let col = cell as u32 % cols;
        let row = cell as u32 / cols;
        let rect = Rect {
            x: options.border_padding + col * (frame_w + options.shape_padding),
            y: options.border_padding + row * (frame_h + options.shape_padding),
            w: frame_w,
            h: frame_h,
        };
        imageops::replace(&mut image, &frames[source], rect.x as i64, rect.y as i64);
        sheet_frames.push(SheetFrame {
            rect,
            sources: Vec::new(),
        });
    }
    for (source, &cell) in frame_map.iter().enumerate() {
        sheet_frames[cell].sources.push(source as u32);
    }

    let animations = document
        .tags()
        .iter()
        .map(|tag| {
            let sequence = unroll(tag.from_frame(), tag.to_frame(), tag.direction());
            let frames = sequence
                .into_iter()
                .map(|frame| AnimationFrame {
                    rect: sheet_frames[frame_map[frame as usize]].rect,
                    duration_ms: durations[frame as usize],
                })
                .collect();
            Animation {
                name: tag.name().to_owned(),
                direction: tag.direction(),
                repeat: tag.repeat(),
                frames,
            }
        })
        .collect();

    Ok(Spritesheet {
        image,
        frames: sheet_frames,
        frame_map,
        animations,
    })
}

fn check_uniform_size(frames: &[RgbaImage]) -> Result<(u32, u32)> {
    let first = frames
        .first()
        .ok_or_else(|| Error::Packing("no frames to pack".to_owned()))?;
    let (w, h) = first.dimensions();
    for (index, frame) in frames.iter().enumerate() {
        if frame.dimensions() != (w, h) {
            return Err(Error::Packing(format!(
                "frame {} is {}x{} but frame 0 is {}x{}",
                index,
                frame.dimensions().0,
                frame.dimensions().1,
                w,
                h
            )));
        }
    }
    Ok((w, h))
}

fn grid_shape(method: PackMethod, count: u32) -> (u32, u32) {
    match method {
        PackMethod::HorizontalStrip => (count.max(1), 1),
        PackMethod::VerticalStrip => (1, count.max(1)),
        PackMethod::SquareGrid => {
            let cols = (count as f64).sqrt().ceil() as u32;
            let cols = cols.max(1);
            let rows = (count + cols - 1) / cols;
            (cols, rows.max(1))
        }
    }
}

// Saturating on purpose: a nonsense padding value must trip the
// MAX_ATLAS_DIM check instead of wrapping around it.
fn atlas_extent(cells: u32, cell_size: u32, border: u32, spacing: u32) -> u32 {
    cells
        .saturating_mul(cell_size)
        .saturating_add(cells.saturating_sub(1).saturating_mul(spacing))
        .saturating_add(border.saturating_mul(2))
}

// Unroll a tag's frame range into playback order. Ping-pong repeats
// the traversal backwards without doubling the endpoints.
fn unroll(from: u16, to: u16, direction: LoopDirection) -> Vec<u16> {
    let forward: Vec<u16> = (from..=to).collect();
    // Interior frames echoed on the way back.
    let echo = to.saturating_sub(from).saturating_sub(1) as usize;
    match direction {
        LoopDirection::Forward => forward,
        LoopDirection::Reverse => forward.into_iter().rev().collect(),
        LoopDirection::PingPong => {
            let mut sequence = forward.clone();
            sequence.extend(forward.into_iter().rev().skip(1).take(echo));
            sequence
        }
        LoopDirection::PingPongReverse => {
            let backward: Vec<u16> = (from..=to).rev().collect();
            let mut sequence = backward.clone();
            sequence.extend(backward.into_iter().rev().skip(1).take(echo));
            sequence
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shapes() {
        assert_eq!(grid_shape(PackMethod::SquareGrid, 1), (1, 1));
        assert_eq!(grid_shape(PackMethod::SquareGrid, 4), (2, 2));
        assert_eq!(grid_shape(PackMethod::SquareGrid, 5), (3, 2));
        assert_eq!(grid_shape(PackMethod::SquareGrid, 10), (4, 3));
        assert_eq!(grid_shape(PackMethod::HorizontalStrip, 7), (7, 1));
        assert_eq!(grid_shape(PackMethod::VerticalStrip, 7), (1, 7));
    }

    #[test]
    fn extent_includes_padding() {
        // 3 cells of 16px, 2px border, 1px spacing:
        // 2 + 16 + 1 + 16 + 1 + 16 + 2
        assert_eq!(atlas_extent(3, 16, 2, 1), 54);
        assert_eq!(atlas_extent(1, 16, 0, 5), 16);
    }

    #[test]
    fn unroll_directions() {
        assert_eq!(unroll(1, 4, LoopDirection::Forward), vec![1, 2, 3, 4]);
        assert_eq!(unroll(1, 4, LoopDirection::Reverse), vec![4, 3, 2, 1]);
        assert_eq!(
            unroll(1, 4, LoopDirection::PingPong),
            vec![1, 2, 3, 4, 3, 2]
        );
        assert_eq!(
            unroll(1, 4, LoopDirection::PingPongReverse),
            vec![4, 3, 2, 1, 2, 3]
        );
    }

    #[test]
    fn unroll_degenerate_ranges() {
        assert_eq!(unroll(2, 2, LoopDirection::PingPong), vec![2]);
        assert_eq!(unroll(2, 3, LoopDirection::PingPong), vec![2, 3]);
        assert_eq!(unroll(2, 2, LoopDirection::PingPongReverse), vec![2]);
    }
}
