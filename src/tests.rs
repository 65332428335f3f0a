//! End-to-end scenarios over synthetic in-memory documents.
//!
//! The helpers below write the binary container by hand (header,
//! frame headers, chunks) so every test is self-contained and the
//! fixtures stay readable next to their assertions.

use crate::*;
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

const CHUNK_LAYER: u16 = 0x2004;
const CHUNK_CEL: u16 = 0x2005;
const CHUNK_TAGS: u16 = 0x2018;
const CHUNK_PALETTE: u16 = 0x2019;
const CHUNK_USER_DATA: u16 = 0x2020;
const CHUNK_TILESET: u16 = 0x2023;
const CHUNK_OLD_PALETTE: u16 = 0x0004;

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn chunk(chunk_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 6);
    out.extend_from_slice(&(payload.len() as u32 + 6).to_le_bytes());
    out.extend_from_slice(&chunk_type.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn frame(duration_ms: u16, chunks: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = chunks.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(body_len + 16);
    out.extend_from_slice(&(body_len as u32 + 16).to_le_bytes());
    out.extend_from_slice(&0xF1FAu16.to_le_bytes());
    out.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    out.extend_from_slice(&duration_ms.to_le_bytes());
    out.extend_from_slice(&[0; 2]);
    out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}

fn document_bytes(width: u16, height: u16, depth: u16, transparent: u8, frames: &[Vec<u8>]) -> Vec<u8> {
    let body_len: usize = frames.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(body_len + 128);
    out.extend_from_slice(&(body_len as u32 + 128).to_le_bytes());
    out.extend_from_slice(&0xA5E0u16.to_le_bytes());
    out.extend_from_slice(&(frames.len() as u16).to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&depth.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // flags: layer opacity valid
    out.extend_from_slice(&100u16.to_le_bytes()); // deprecated speed
    out.extend_from_slice(&[0; 8]);
    out.push(transparent);
    out.extend_from_slice(&[0; 3]);
    out.extend_from_slice(&0u16.to_le_bytes()); // color count (0 => 256)
    out.push(1); // pixel width
    out.push(1); // pixel height
    out.extend_from_slice(&[0; 8]); // grid
    out.extend_from_slice(&[0; 84]);
    for f in frames {
        out.extend_from_slice(f);
    }
    out
}

fn layer_chunk(name: &str, flags: u16, blend: u16, opacity: u8) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&flags.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes()); // image layer
    payload.extend_from_slice(&0u16.to_le_bytes()); // child level
    payload.extend_from_slice(&[0; 4]); // default size
    payload.extend_from_slice(&blend.to_le_bytes());
    payload.push(opacity);
    payload.extend_from_slice(&[0; 3]);
    put_string(&mut payload, name);
    chunk(CHUNK_LAYER, &payload)
}

fn tilemap_layer_chunk(name: &str, tileset_id: u32) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&1u16.to_le_bytes()); // visible
    payload.extend_from_slice(&2u16.to_le_bytes()); // tilemap layer
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&[0; 4]);
    payload.extend_from_slice(&0u16.to_le_bytes()); // normal blend
    payload.push(255);
    payload.extend_from_slice(&[0; 3]);
    put_string(&mut payload, name);
    payload.extend_from_slice(&tileset_id.to_le_bytes());
    chunk(CHUNK_LAYER, &payload)
}

fn cel_header(layer: u16, x: i16, y: i16, opacity: u8, cel_type: u16) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&layer.to_le_bytes());
    payload.extend_from_slice(&x.to_le_bytes());
    payload.extend_from_slice(&y.to_le_bytes());
    payload.push(opacity);
    payload.extend_from_slice(&cel_type.to_le_bytes());
    payload.extend_from_slice(&[0; 7]);
    payload
}

fn raw_cel_chunk(layer: u16, x: i16, y: i16, opacity: u8, w: u16, h: u16, pixels: &[u8]) -> Vec<u8> {
    let mut payload = cel_header(layer, x, y, opacity, 0);
    payload.extend_from_slice(&w.to_le_bytes());
    payload.extend_from_slice(&h.to_le_bytes());
    payload.extend_from_slice(pixels);
    chunk(CHUNK_CEL, &payload)
}

fn compressed_cel_chunk(layer: u16, x: i16, y: i16, w: u16, h: u16, pixels: &[u8]) -> Vec<u8> {
    let mut payload = cel_header(layer, x, y, 255, 2);
    payload.extend_from_slice(&w.to_le_bytes());
    payload.extend_from_slice(&h.to_le_bytes());
    payload.extend_from_slice(&zlib(pixels));
    chunk(CHUNK_CEL, &payload)
}

fn linked_cel_chunk(layer: u16, target_frame: u16) -> Vec<u8> {
    let mut payload = cel_header(layer, 0, 0, 255, 1);
    payload.extend_from_slice(&target_frame.to_le_bytes());
    chunk(CHUNK_CEL, &payload)
}

fn tags_chunk(tags: &[(&str, u16, u16, u8, u16)]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(tags.len() as u16).to_le_bytes());
    payload.extend_from_slice(&[0; 8]);
    for (name, from, to, direction, repeat) in tags {
        payload.extend_from_slice(&from.to_le_bytes());
        payload.extend_from_slice(&to.to_le_bytes());
        payload.push(*direction);
        payload.extend_from_slice(&repeat.to_le_bytes());
        payload.extend_from_slice(&[0; 6]);
        payload.extend_from_slice(&[0; 3]); // label color
        payload.push(0);
        put_string(&mut payload, name);
    }
    chunk(CHUNK_TAGS, &payload)
}

fn palette_chunk(colors: &[[u8; 4]]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(colors.len() as u32).to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&(colors.len() as u32 - 1).to_le_bytes());
    payload.extend_from_slice(&[0; 8]);
    for color in colors {
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(color);
    }
    chunk(CHUNK_PALETTE, &payload)
}

fn user_data_chunk(text: &str) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&1u32.to_le_bytes()); // has text
    put_string(&mut payload, text);
    chunk(CHUNK_USER_DATA, &payload)
}

fn tileset_chunk(id: u32, tile_w: u16, tile_h: u16, tile_count: u32, pixels: &[u8]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&id.to_le_bytes());
    payload.extend_from_slice(&6u32.to_le_bytes()); // embedded tiles, empty tile is id 0
    payload.extend_from_slice(&tile_count.to_le_bytes());
    payload.extend_from_slice(&tile_w.to_le_bytes());
    payload.extend_from_slice(&tile_h.to_le_bytes());
    payload.extend_from_slice(&1i16.to_le_bytes()); // base index
    payload.extend_from_slice(&[0; 14]);
    put_string(&mut payload, "tiles");
    let compressed = zlib(pixels);
    payload.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    payload.extend_from_slice(&compressed);
    chunk(CHUNK_TILESET, &payload)
}

fn tilemap_cel_chunk(layer: u16, w: u16, h: u16, tile_ids: &[u32]) -> Vec<u8> {
    let mut payload = cel_header(layer, 0, 0, 255, 3);
    payload.extend_from_slice(&w.to_le_bytes());
    payload.extend_from_slice(&h.to_le_bytes());
    payload.extend_from_slice(&32u16.to_le_bytes()); // bits per tile
    payload.extend_from_slice(&0x1FFF_FFFFu32.to_le_bytes()); // tile id mask
    payload.extend_from_slice(&0x8000_0000u32.to_le_bytes()); // x flip
    payload.extend_from_slice(&0x4000_0000u32.to_le_bytes()); // y flip
    payload.extend_from_slice(&0x2000_0000u32.to_le_bytes()); // diagonal
    payload.extend_from_slice(&[0; 10]);
    let words: Vec<u8> = tile_ids.iter().flat_map(|id| id.to_le_bytes()).collect();
    payload.extend_from_slice(&zlib(&words));
    chunk(CHUNK_CEL, &payload)
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn flat(pixels: &[[u8; 4]]) -> Vec<u8> {
    pixels.iter().flatten().copied().collect()
}

#[test]
fn composites_full_canvas_rgba_cel_exactly() {
    let pixels = flat(&[RED, GREEN, BLUE, WHITE]);
    let bytes = document_bytes(
        2,
        2,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 2, 2, &pixels),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert_eq!(doc.size(), (2, 2));
    assert_eq!(doc.num_frames(), 1);
    assert_eq!(doc.color_depth(), ColorDepth::Rgba);

    let image = doc.frame(0).image();
    assert_eq!(image.as_raw().as_slice(), pixels.as_slice());
}

#[test]
fn compositing_is_deterministic() {
    let pixels = flat(&[RED, GREEN, BLUE, WHITE]);
    let bytes = document_bytes(
        2,
        2,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("base", 1, 0, 255),
                layer_chunk("top", 1, 3, 128), // overlay blend, half opacity
                raw_cel_chunk(0, 0, 0, 255, 2, 2, &pixels),
                raw_cel_chunk(1, 0, 0, 200, 2, 2, &flat(&[WHITE, BLUE, GREEN, RED])),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    let first = doc.frame(0).image();
    let second = doc.frame(0).image();
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn hidden_layer_never_contributes() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("shown", 1, 0, 255),
                layer_chunk("hidden", 0, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
                raw_cel_chunk(1, 0, 0, 255, 1, 1, &GREEN),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();

    let image = doc.frame(0).image();
    assert_eq!(image.get_pixel(0, 0).0, RED);

    let all = doc.frame(0).image_with(&ComposeOptions {
        include_hidden_layers: true,
        ..ComposeOptions::default()
    });
    assert_eq!(all.get_pixel(0, 0).0, GREEN);
}

#[test]
fn linked_cel_renders_like_its_target() {
    let pixels = flat(&[RED, GREEN, BLUE, WHITE]);
    let bytes = document_bytes(
        2,
        2,
        32,
        0,
        &[
            frame(
                100,
                &[
                    layer_chunk("Layer 1", 1, 0, 255),
                    raw_cel_chunk(0, 0, 0, 255, 2, 2, &pixels),
                ],
            ),
            frame(100, &[linked_cel_chunk(0, 0)]),
        ],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert!(doc.cel(1, 0).unwrap().is_linked());
    assert_eq!(doc.cel(1, 0).unwrap().linked_frame(), Some(0));

    let first = doc.frame(0).image();
    let second = doc.frame(1).image();
    assert_eq!(first.as_raw(), second.as_raw());
    assert_eq!(first.get_pixel(0, 0).0, RED);
}

#[test]
fn forward_link_is_rejected() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[
            frame(
                100,
                &[layer_chunk("Layer 1", 1, 0, 255), linked_cel_chunk(0, 1)],
            ),
            frame(100, &[raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED)]),
        ],
    );
    assert!(matches!(
        Document::read(&bytes[..]),
        Err(Error::UnresolvedLink(_))
    ));
}

#[test]
fn compressed_cel_matches_raw_cel() {
    let pixels = flat(&[RED, GREEN, BLUE, WHITE]);
    let raw = document_bytes(
        2,
        2,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 2, 2, &pixels),
            ],
        )],
    );
    let compressed = document_bytes(
        2,
        2,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                compressed_cel_chunk(0, 0, 0, 2, 2, &pixels),
            ],
        )],
    );
    let raw_image = Document::read(&raw[..]).unwrap().frame(0).image();
    let compressed_image = Document::read(&compressed[..]).unwrap().frame(0).image();
    assert_eq!(raw_image.as_raw(), compressed_image.as_raw());
}

#[test]
fn cel_offsets_clip_at_canvas_edges() {
    // A 2x2 cel hanging off the top-left corner: only its bottom-right
    // pixel lands on the 1x1 canvas.
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, -1, -1, 255, 2, 2, &flat(&[RED, GREEN, BLUE, WHITE])),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    let image = doc.frame(0).image();
    assert_eq!(image.get_pixel(0, 0).0, WHITE);
}

#[test]
fn indexed_depth_resolves_through_palette() {
    let bytes = document_bytes(
        2,
        1,
        8,
        0, // palette index 0 is transparent
        &[frame(
            100,
            &[
                palette_chunk(&[[9, 9, 9, 255], RED, GREEN]),
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 2, 1, &[1, 0]),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert_eq!(doc.palette().unwrap().num_colors(), 3);

    let image = doc.frame(0).image();
    assert_eq!(image.get_pixel(0, 0).0, RED);
    // The transparent index reads as no pixel at all.
    assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0, 0]);
}

#[test]
fn indexed_pixel_outside_palette_is_rejected() {
    let bytes = document_bytes(
        1,
        1,
        8,
        0,
        &[frame(
            100,
            &[
                palette_chunk(&[RED]),
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &[7]),
            ],
        )],
    );
    assert!(matches!(
        Document::read(&bytes[..]),
        Err(Error::MalformedDocument(_))
    ));
}

#[test]
fn grayscale_depth_resolves_to_gray_rgba() {
    let bytes = document_bytes(
        2,
        1,
        16,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 2, 1, &[200, 255, 17, 128]),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    let image = doc.frame(0).image();
    assert_eq!(image.get_pixel(0, 0).0, [200, 200, 200, 255]);
    assert_eq!(image.get_pixel(1, 0).0, [17, 17, 17, 128]);
}

#[test]
fn tilemap_cel_expands_tiles() {
    // Three 1x1 tiles: empty, red, blue. The 2x2 map paints
    // red, blue / empty, red.
    let tile_pixels = flat(&[[0, 0, 0, 0], RED, BLUE]);
    let bytes = document_bytes(
        2,
        2,
        32,
        0,
        &[frame(
            100,
            &[
                tileset_chunk(0, 1, 1, 3, &tile_pixels),
                tilemap_layer_chunk("map", 0),
                tilemap_cel_chunk(0, 2, 2, &[1, 2, 0, 1]),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    let tileset = doc.tilesets().get(TilesetId(0));
    assert!(tileset.is_some());

    let image = doc.frame(0).image();
    assert_eq!(image.get_pixel(0, 0).0, RED);
    assert_eq!(image.get_pixel(1, 0).0, BLUE);
    assert_eq!(image.get_pixel(0, 1).0, [0, 0, 0, 0]);
    assert_eq!(image.get_pixel(1, 1).0, RED);
}

#[test]
fn tilemap_layer_with_missing_tileset_is_rejected() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(100, &[tilemap_layer_chunk("map", 9)])],
    );
    assert!(matches!(
        Document::read(&bytes[..]),
        Err(Error::UnresolvedLink(_))
    ));
}

#[test]
fn user_data_attaches_to_most_recent_chunk() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                user_data_chunk("layer note"),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
                user_data_chunk("cel note"),
                tags_chunk(&[("walk", 0, 0, 0, 0), ("idle", 0, 0, 2, 3)]),
                user_data_chunk("first tag"),
                user_data_chunk("second tag"),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    let layer = doc.layers().get(0).unwrap();
    assert_eq!(layer.user_data().unwrap().text.as_deref(), Some("layer note"));
    let cel = doc.cel(0, 0).unwrap();
    assert_eq!(cel.user_data().unwrap().text.as_deref(), Some("cel note"));
    assert_eq!(
        doc.tags()[0].user_data().unwrap().text.as_deref(),
        Some("first tag")
    );
    assert_eq!(
        doc.tags()[1].user_data().unwrap().text.as_deref(),
        Some("second tag")
    );

    // Tag metadata from the same document.
    assert_eq!(doc.tags()[1].direction(), LoopDirection::PingPong);
    assert_eq!(doc.tags()[1].repeat(), 3);
}

#[test]
fn sprite_user_data_follows_old_palette_chunk() {
    let mut old_palette = Vec::new();
    old_palette.extend_from_slice(&0u16.to_le_bytes()); // zero packets
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                chunk(CHUNK_OLD_PALETTE, &old_palette),
                user_data_chunk("sprite note"),
                layer_chunk("Layer 1", 1, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert_eq!(
        doc.sprite_user_data().unwrap().text.as_deref(),
        Some("sprite note")
    );
}

#[test]
fn dangling_user_data_is_rejected() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                user_data_chunk("nothing owns this"),
                layer_chunk("Layer 1", 1, 0, 255),
            ],
        )],
    );
    assert!(matches!(
        Document::read(&bytes[..]),
        Err(Error::MalformedDocument(_))
    ));
}

#[test]
fn unknown_chunk_types_are_skipped() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("Layer 1", 1, 0, 255),
                chunk(0x7777, b"future format extension"),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert_eq!(doc.frame(0).image().get_pixel(0, 0).0, RED);
}

#[test]
fn bad_header_magic_is_rejected() {
    let mut bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(100, &[layer_chunk("Layer 1", 1, 0, 255)])],
    );
    bytes[4] = 0x00; // corrupt the 0xA5E0 magic
    assert!(matches!(
        Document::read(&bytes[..]),
        Err(Error::MalformedDocument(_))
    ));
}

#[test]
fn truncated_chunk_is_rejected() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(100, &[layer_chunk("Layer 1", 1, 0, 255)])],
    );
    // Chop off the tail of the last chunk.
    let truncated = &bytes[..bytes.len() - 4];
    assert!(Document::read(truncated).is_err());
}

#[test]
fn frame_durations_come_from_frame_headers() {
    let red_cel = || raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED);
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[
            frame(80, &[layer_chunk("Layer 1", 1, 0, 255), red_cel()]),
            frame(120, &[red_cel()]),
        ],
    );
    let doc = Document::read(&bytes[..]).unwrap();
    assert_eq!(doc.frame(0).duration_ms(), 80);
    assert_eq!(doc.frame(1).duration_ms(), 120);
}

// -- Spritesheet packing ------------------------------------------------

fn three_frame_doc() -> Document {
    // Frames: red, blue, red again (byte-identical to frame 0).
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[
            frame(
                100,
                &[
                    layer_chunk("Layer 1", 1, 0, 255),
                    tags_chunk(&[("all", 0, 2, 0, 0), ("back", 0, 2, 1, 0)]),
                    raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
                ],
            ),
            frame(200, &[raw_cel_chunk(0, 0, 0, 255, 1, 1, &BLUE)]),
            frame(300, &[raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED)]),
        ],
    );
    Document::read(&bytes[..]).unwrap()
}

#[test]
fn duplicate_frames_are_stored_once() {
    let doc = three_frame_doc();
    let sheet = Spritesheet::build(
        &doc,
        &SheetOptions {
            method: PackMethod::HorizontalStrip,
            ..SheetOptions::default()
        },
    )
    .unwrap();

    assert_eq!(sheet.size(), (2, 1));
    assert_eq!(sheet.frames().len(), 2);
    assert_eq!(sheet.frames()[0].sources, vec![0, 2]);
    assert_eq!(sheet.frame_rect(0), sheet.frame_rect(2));
    assert_ne!(sheet.frame_rect(0), sheet.frame_rect(1));

    assert_eq!(sheet.image().get_pixel(0, 0).0, RED);
    assert_eq!(sheet.image().get_pixel(1, 0).0, BLUE);
}

#[test]
fn dedup_off_keeps_every_frame() {
    let doc = three_frame_doc();
    let sheet = Spritesheet::build(
        &doc,
        &SheetOptions {
            method: PackMethod::HorizontalStrip,
            merge_duplicates: false,
            ..SheetOptions::default()
        },
    )
    .unwrap();
    assert_eq!(sheet.size(), (3, 1));
    assert_eq!(sheet.frames().len(), 3);
}

#[test]
fn animations_follow_tag_directions_and_durations() {
    let doc = three_frame_doc();
    let sheet = Spritesheet::build(
        &doc,
        &SheetOptions {
            method: PackMethod::HorizontalStrip,
            ..SheetOptions::default()
        },
    )
    .unwrap();

    let all = &sheet.animations()[0];
    assert_eq!(all.name(), "all");
    let rects: Vec<u32> = all.frames().iter().map(|f| f.rect.x).collect();
    let durations: Vec<u32> = all.frames().iter().map(|f| f.duration_ms).collect();
    assert_eq!(rects, vec![0, 1, 0]); // frame 2 reuses frame 0's cell
    assert_eq!(durations, vec![100, 200, 300]);

    let back = &sheet.animations()[1];
    assert_eq!(back.direction(), LoopDirection::Reverse);
    let rects: Vec<u32> = back.frames().iter().map(|f| f.rect.x).collect();
    assert_eq!(rects, vec![0, 1, 0]);
    let durations: Vec<u32> = back.frames().iter().map(|f| f.duration_ms).collect();
    assert_eq!(durations, vec![300, 200, 100]);
}

#[test]
fn square_grid_packs_into_rows() {
    // Five distinct 1x1 frames pack into a 3x2 grid.
    let colors = [RED, GREEN, BLUE, WHITE, [9, 9, 9, 255]];
    let mut frames: Vec<Vec<u8>> = vec![frame(
        100,
        &[
            layer_chunk("Layer 1", 1, 0, 255),
            raw_cel_chunk(0, 0, 0, 255, 1, 1, &colors[0]),
        ],
    )];
    for color in &colors[1..] {
        frames.push(frame(100, &[raw_cel_chunk(0, 0, 0, 255, 1, 1, color)]));
    }
    let doc = Document::read(&document_bytes(1, 1, 32, 0, &frames)[..]).unwrap();
    let sheet = Spritesheet::build(&doc, &SheetOptions::default()).unwrap();

    assert_eq!(sheet.size(), (3, 2));
    assert_eq!(sheet.frame_rect(3), Rect { x: 0, y: 1, w: 1, h: 1 });
    assert_eq!(sheet.image().get_pixel(2, 0).0, BLUE);
    assert_eq!(sheet.image().get_pixel(1, 1).0, [9, 9, 9, 255]);
}

#[test]
fn padding_offsets_every_cell() {
    let doc = three_frame_doc();
    let sheet = Spritesheet::build(
        &doc,
        &SheetOptions {
            method: PackMethod::HorizontalStrip,
            border_padding: 2,
            shape_padding: 1,
            ..SheetOptions::default()
        },
    )
    .unwrap();

    // 2 + 1 + 1 + 1 + 2 across, 2 + 1 + 2 down.
    assert_eq!(sheet.size(), (7, 5));
    assert_eq!(sheet.frame_rect(0), Rect { x: 2, y: 2, w: 1, h: 1 });
    assert_eq!(sheet.frame_rect(1), Rect { x: 4, y: 2, w: 1, h: 1 });
    assert_eq!(sheet.image().get_pixel(0, 0).0, [0, 0, 0, 0]);
    assert_eq!(sheet.image().get_pixel(2, 2).0, RED);
    assert_eq!(sheet.image().get_pixel(4, 2).0, BLUE);
}

#[test]
fn oversized_atlas_is_rejected() {
    let doc = three_frame_doc();
    let result = Spritesheet::build(
        &doc,
        &SheetOptions {
            border_padding: MAX_ATLAS_DIM,
            ..SheetOptions::default()
        },
    );
    assert!(matches!(result, Err(Error::Packing(_))));
}

#[test]
fn hidden_layers_can_be_packed_in() {
    let bytes = document_bytes(
        1,
        1,
        32,
        0,
        &[frame(
            100,
            &[
                layer_chunk("shown", 1, 0, 255),
                layer_chunk("hidden", 0, 0, 255),
                raw_cel_chunk(0, 0, 0, 255, 1, 1, &RED),
                raw_cel_chunk(1, 0, 0, 255, 1, 1, &GREEN),
            ],
        )],
    );
    let doc = Document::read(&bytes[..]).unwrap();

    let visible_only = Spritesheet::build(&doc, &SheetOptions::default()).unwrap();
    assert_eq!(visible_only.image().get_pixel(0, 0).0, RED);

    let everything = Spritesheet::build(
        &doc,
        &SheetOptions {
            only_visible_layers: false,
            ..SheetOptions::default()
        },
    )
    .unwrap();
    assert_eq!(everything.image().get_pixel(0, 0).0, GREEN);
}
