#![warn(clippy::all)]
#![warn(missing_docs)]
/*!

Load [Aseprite](https://www.aseprite.org/) files and pack their frames
into spritesheet atlases. This library reads the binary file format
directly ([file format specification][spec]), flattens layered frames
into composited images using the same fixed-point blend arithmetic as
the editor, and can arrange the results into a single atlas image with
animation metadata derived from tags — no JSON export step required.

Note that this library can be rather slow when compiled without
optimizations. We recommend that you override the optimization settings
for this dependency in dev mode by adding the following to your
`Cargo.toml`:

```text
[profile.dev.package.asesheet]
opt-level = 2  # or 3
```

[spec]: https://github.com/aseprite/aseprite/blob/master/docs/ase-file-specs.md

# Basic Usage

## Load a file and composite a frame

```no_run
use asesheet::Document;

let doc = Document::read_file("player.aseprite").unwrap();
println!("Size: {}x{}", doc.width(), doc.height());
println!("Frames: {}", doc.num_frames());

// An `image::RgbaImage`, flattened the way the editor shows it.
let frame = doc.frame(0).image();
```

The pixel buffer is row-major RGBA, so it can be handed directly to a
PNG encoder or a texture upload.

## Pack a spritesheet

```no_run
use asesheet::{Document, SheetOptions, Spritesheet};

let doc = Document::read_file("player.aseprite").unwrap();
let sheet = Spritesheet::build(&doc, &SheetOptions::default()).unwrap();

let (width, height) = sheet.size();
println!("Atlas: {}x{}", width, height);
for animation in sheet.animations() {
    println!(
        "{}: {} frames",
        animation.name(),
        animation.frames().len()
    );
}
```

With [SheetOptions::merge_duplicates] enabled (the default),
byte-identical frames are stored once and every animation step points
at the shared rectangle.

## Layers, cels, tags

```no_run
use asesheet::Document;

let doc = Document::read_file("player.aseprite").unwrap();
for (index, layer) in doc.layers().iter().enumerate() {
    println!("{}: {:?} visible={}", index, layer.name(), doc.layers().is_visible(index));
}
if let Some(tag) = doc.tag_by_name("walk") {
    println!("walk: frames {}..={}", tag.from_frame(), tag.to_frame());
}
```

*/

pub(crate) mod blend;
pub(crate) mod cel;
pub mod checksum;
pub(crate) mod compose;
pub(crate) mod document;
pub(crate) mod error;
pub(crate) mod header;
pub(crate) mod inflate;
pub(crate) mod layer;
pub(crate) mod palette;
pub(crate) mod parse;
pub(crate) mod pixel;
pub(crate) mod reader;
pub(crate) mod sheet;
pub(crate) mod slice;
pub(crate) mod tags;
#[cfg(test)]
mod tests;
pub(crate) mod tilemap;
pub(crate) mod tileset;
pub(crate) mod user_data;

pub use cel::{Cel, CelId};
pub use compose::ComposeOptions;
pub use document::{Document, Frame};
pub use error::{Error, Result};
pub use header::{ColorDepth, Header};
pub use layer::{BlendMode, Layer, LayerFlags, LayerKind, Layers};
pub use palette::{Palette, PaletteEntry};
pub use sheet::{
    Animation, AnimationFrame, PackMethod, Rect, SheetFrame, SheetOptions, Spritesheet,
    MAX_ATLAS_DIM,
};
pub use slice::{Slice, SliceKey};
pub use tags::{LoopDirection, Tag};
pub use tilemap::{Tile, TilemapData};
pub use tileset::{Tileset, TilesetId, Tilesets};
pub use user_data::UserData;
