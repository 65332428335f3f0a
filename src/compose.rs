//! Frame compositing: flattening one frame's cels into a single
//! true-color image.

use crate::blend::{self, Blender, Color8};
use crate::cel::{Cel, CelContent, CelId, ImageData};
use crate::document::Document;
use crate::layer::LayerKind;
use crate::pixel::ResolveContext;
use crate::tileset::Tileset;
use image::RgbaImage;

/// Which cels take part when a frame is flattened.
#[derive(Debug, Clone, Copy)]
pub struct ComposeOptions {
    /// Composite layers whose visibility is off (directly or through a
    /// hidden enclosing group). Off by default, matching the editor's
    /// flattened view.
    pub include_hidden_layers: bool,
    /// Composite background layers. On by default.
    pub include_background: bool,
    /// Composite tilemap layers. On by default.
    pub include_tilemaps: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            include_hidden_layers: false,
            include_background: true,
            include_tilemaps: true,
        }
    }
}

/// Flatten one frame. The output image has the canvas size of the
/// document; pixels are row-major, top-to-bottom, left-to-right, which
/// callers rely on for direct texture upload.
pub(crate) fn compose_frame(doc: &Document, frame: u16, options: &ComposeOptions) -> RgbaImage {
    let mut image = RgbaImage::new(doc.header.width as u32, doc.header.height as u32);

    // Layer index order is back-to-front by construction.
    for (layer_index, cel) in doc.cels.frame_cels(frame) {
        let layer = doc
            .layers
            .get(layer_index as usize)
            .expect("cel layer index validated at load time");
        match layer.kind() {
            LayerKind::Group => continue,
            LayerKind::Tilemap(_) if !options.include_tilemaps => continue,
            _ => {}
        }
        if !options.include_hidden_layers && !doc.layers.is_visible(layer_index as usize) {
            continue;
        }
        if !options.include_background && layer.is_background() {
            continue;
        }
        write_cel(doc, &mut image, layer_index, cel);
    }

    image
}

fn write_cel(doc: &Document, image: &mut RgbaImage, layer_index: u16, cel: &Cel) {
    let layer = &doc.layers.layers[layer_index as usize];
    let blender = blend::blender_for(layer.blend_mode());
    // Layer and cel opacity multiply into one source opacity.
    let opacity = blend::mul_un8(layer.opacity() as i32, cel.opacity() as i32);
    let ctx = ResolveContext {
        palette: doc.palette.as_deref(),
        transparent_index: doc.header.color_depth.transparent_index(),
        layer_is_background: layer.is_background(),
    };

    match &cel.content {
        CelContent::Image(data) => {
            write_image_cel(image, cel, data, &ctx, blender, opacity);
        }
        CelContent::Tilemap(map) => {
            let tileset_id = match layer.kind() {
                LayerKind::Tilemap(id) => id,
                _ => unreachable!("tilemap cel on non-tilemap layer; validated at load time"),
            };
            let tileset = doc
                .tilesets
                .get(tileset_id)
                .expect("tileset reference validated at load time");
            write_tilemap_cel(image, cel, map, tileset, &ctx, blender, opacity);
        }
        CelContent::Linked(frame) => {
            // Draw the target cel in full; a link shares position and
            // opacity along with the pixels.
            if let Some(target) = doc.cels.get(CelId {
                frame: *frame,
                layer: layer_index,
            }) {
                write_cel(doc, image, layer_index, target);
            }
        }
    }
}

fn write_image_cel(
    image: &mut RgbaImage,
    cel: &Cel,
    data: &ImageData,
    ctx: &ResolveContext<'_>,
    blender: Blender,
    opacity: u8,
) {
    let pixels = data.pixels.resolve_rgba(ctx);
    blit(
        image,
        &pixels,
        data.width as usize,
        data.height as usize,
        cel.x as i32,
        cel.y as i32,
        blender,
        opacity,
    );
}

fn write_tilemap_cel(
    image: &mut RgbaImage,
    cel: &Cel,
    map: &crate::tilemap::TilemapData,
    tileset: &Tileset,
    ctx: &ResolveContext<'_>,
    blender: Blender,
    opacity: u8,
) {
    let bank = tileset.pixels.resolve_rgba(ctx);
    let (tile_width, tile_height) = tileset.tile_size();
    let (tile_width, tile_height) = (tile_width as usize, tile_height as usize);
    let per_tile = tileset.pixels_per_tile();

    for tile_y in 0..map.height() {
        for tile_x in 0..map.width() {
            let tile = map
                .tile(tile_x, tile_y)
                .expect("tile coordinates inside the map");
            let start = per_tile * tile.id() as usize;
            let tile_pixels = &bank[start..start + per_tile];

            let dest_x = cel.x as i32 + tile_x as i32 * tile_width as i32;
            let dest_y = cel.y as i32 + tile_y as i32 * tile_height as i32;
            for py in 0..tile_height {
                for px in 0..tile_width {
                    let (mut sx, mut sy) = (px, py);
                    // Diagonal flip is a transpose, only meaningful
                    // for square tiles.
                    if tile.flip_diagonal() && tile_width == tile_height {
                        std::mem::swap(&mut sx, &mut sy);
                    }
                    if tile.flip_x() {
                        sx = tile_width - 1 - sx;
                    }
                    if tile.flip_y() {
                        sy = tile_height - 1 - sy;
                    }
                    let src = tile_pixels[sy * tile_width + sx];
                    blend_pixel(
                        image,
                        dest_x + px as i32,
                        dest_y + py as i32,
                        src,
                        blender,
                        opacity,
                    );
                }
            }
        }
    }
}

fn blit(
    image: &mut RgbaImage,
    pixels: &[Color8],
    width: usize,
    height: usize,
    x0: i32,
    y0: i32,
    blender: Blender,
    opacity: u8,
) {
    for row in 0..height {
        for col in 0..width {
            let src = pixels[row * width + col];
            blend_pixel(
                image,
                x0 + col as i32,
                y0 + row as i32,
                src,
                blender,
                opacity,
            );
        }
    }
}

// Offsets outside the canvas are clipped, not wrapped.
fn blend_pixel(image: &mut RgbaImage, x: i32, y: i32, src: Color8, blender: Blender, opacity: u8) {
    if x < 0 || y < 0 || x >= image.width() as i32 || y >= image.height() as i32 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let backdrop = *image.get_pixel(x, y);
    image.put_pixel(x, y, blender(backdrop, src, opacity));
}
