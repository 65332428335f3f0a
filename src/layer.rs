use crate::reader::ByteReader;
use crate::tileset::TilesetId;
use crate::{Error, Result};
use bitflags::bitflags;

bitflags! {
    /// Flag word of a layer chunk.
    pub struct LayerFlags: u32 {
        /// Layer is visible (eye icon is enabled).
        const VISIBLE = 0x0001;
        /// Layer can be modified (lock icon is disabled).
        const EDITABLE = 0x0002;
        /// Layer cannot be moved.
        const MOVEMENT_LOCKED = 0x0004;
        /// Layer is a background (stack order cannot be changed).
        const BACKGROUND = 0x0008;
        /// Prefer to link cels when the user copies them.
        const CONTINUOUS = 0x0010;
        /// Prefer to show this group layer collapsed.
        const COLLAPSED = 0x0020;
        /// This is a reference layer.
        const REFERENCE = 0x0040;
    }
}

impl LayerFlags {
    /// Shortcut for `.contains(LayerFlags::VISIBLE)`.
    pub fn is_visible(&self) -> bool {
        self.contains(LayerFlags::VISIBLE)
    }
}

/// What a layer contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// A regular image layer.
    Image,
    /// A grouping layer. Carries no image data of its own; its
    /// children follow it in the flat layer list at a deeper child
    /// level.
    Group,
    /// A tilemap layer. Cels on it hold tile indices into the
    /// referenced tileset.
    Tilemap(TilesetId),
}

/// How a layer's pixels combine with the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Addition,
    Subtract,
    Divide,
}

/// One layer of the document.
///
/// Layers live in a flat, insertion-ordered list; index 0 is the
/// bottommost layer. Grouping is expressed through [child
/// level](Layer::child_level), not through ownership.
#[derive(Debug)]
pub struct Layer {
    pub(crate) name: String,
    pub(crate) flags: LayerFlags,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) kind: LayerKind,
    pub(crate) child_level: u16,
    pub(crate) user_data: Option<crate::UserData>,
}

impl Layer {
    /// Layer name, as shown in the editor. Not necessarily unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw layer flags.
    pub fn flags(&self) -> LayerFlags {
        self.flags
    }

    /// Blend mode used when compositing this layer over the stack
    /// below it.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Layer opacity (0 = fully transparent, 255 = fully opaque).
    /// Combined with per-cel opacity during compositing.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Whether this is an image, group or tilemap layer.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Nesting depth. 0 for top-level layers; a layer's parent is the
    /// nearest preceding layer with a smaller child level.
    pub fn child_level(&self) -> u16 {
        self.child_level
    }

    /// True if the background flag is set.
    pub fn is_background(&self) -> bool {
        self.flags.contains(LayerFlags::BACKGROUND)
    }

    /// This layer's own visibility flag. See [Layers::is_visible] for
    /// the ancestor-aware check used by the compositor.
    pub fn is_visible(&self) -> bool {
        self.flags.is_visible()
    }

    /// User data attached to this layer, if any.
    pub fn user_data(&self) -> Option<&crate::UserData> {
        self.user_data.as_ref()
    }
}

/// The document's flat layer list, back to front.
#[derive(Debug, Default)]
pub struct Layers {
    pub(crate) layers: Vec<Layer>,
    // parents[i] is the index of layer i's enclosing group, if any.
    parents: Vec<Option<usize>>,
}

impl Layers {
    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True if the document has no layers. A valid document always has
    /// at least one, so this only holds for a default value.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layer at `index` (0 = bottommost).
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Index of the group enclosing the layer at `index`, if any.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Ancestor-aware visibility: a layer is visible only if its own
    /// flag is set and every enclosing group is visible too.
    pub fn is_visible(&self, index: usize) -> bool {
        let mut current = index;
        loop {
            if !self.layers[current].flags.is_visible() {
                return false;
            }
            match self.parents[current] {
                Some(parent) => current = parent,
                None => return true,
            }
        }
    }

    /// Iterate over the layers back to front.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub(crate) fn from_vec(layers: Vec<Layer>) -> Self {
        let parents = compute_parents(&layers);
        Layers { layers, parents }
    }

    /// Every tilemap layer must name a tileset that exists.
    pub(crate) fn validate(&self, tilesets: &crate::tileset::Tilesets) -> Result<()> {
        for (index, layer) in self.layers.iter().enumerate() {
            if let LayerKind::Tilemap(tileset_id) = layer.kind {
                if tilesets.get(tileset_id).is_none() {
                    return Err(Error::UnresolvedLink(format!(
                        "layer {} ({:?}) references missing tileset {}",
                        index,
                        layer.name,
                        tileset_id.value()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn compute_parents(layers: &[Layer]) -> Vec<Option<usize>> {
    let mut result = Vec::with_capacity(layers.len());
    for index in 0..layers.len() {
        let my_level = layers[index].child_level;
        let parent = if my_level == 0 {
            None
        } else {
            // Nearest earlier layer with a smaller child level.
            layers[..index]
                .iter()
                .rposition(|candidate| candidate.child_level < my_level)
        };
        result.push(parent);
    }
    result
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<Layer> {
    let mut reader = ByteReader::new(data);

    let flags = reader.word()?;
    let kind = reader.word()?;
    let child_level = reader.word()?;
    let _default_width = reader.word()?;
    let _default_height = reader.word()?;
    let blend_mode = reader.word()?;
    let opacity = reader.byte()?;
    reader.skip(3)?;
    let name = reader.string()?;

    let flags = LayerFlags::from_bits_truncate(flags as u32);
    let blend_mode = parse_blend_mode(blend_mode)?;
    let kind = match kind {
        0 => LayerKind::Image,
        1 => LayerKind::Group,
        2 => {
            // The tileset index trails the name for tilemap layers.
            let tileset_index = reader.dword()?;
            LayerKind::Tilemap(TilesetId(tileset_index))
        }
        _ => {
            return Err(Error::MalformedDocument(format!(
                "unknown layer type {} in layer {:?}",
                kind, name
            )))
        }
    };

    Ok(Layer {
        name,
        flags,
        blend_mode,
        opacity,
        kind,
        child_level,
        user_data: None,
    })
}

fn parse_blend_mode(id: u16) -> Result<BlendMode> {
    match id {
        0 => Ok(BlendMode::Normal),
        1 => Ok(BlendMode::Multiply),
        2 => Ok(BlendMode::Screen),
        3 => Ok(BlendMode::Overlay),
        4 => Ok(BlendMode::Darken),
        5 => Ok(BlendMode::Lighten),
        6 => Ok(BlendMode::ColorDodge),
        7 => Ok(BlendMode::ColorBurn),
        8 => Ok(BlendMode::HardLight),
        9 => Ok(BlendMode::SoftLight),
        10 => Ok(BlendMode::Difference),
        11 => Ok(BlendMode::Exclusion),
        12 => Ok(BlendMode::Hue),
        13 => Ok(BlendMode::Saturation),
        14 => Ok(BlendMode::Color),
        15 => Ok(BlendMode::Luminosity),
        16 => Ok(BlendMode::Addition),
        17 => Ok(BlendMode::Subtract),
        18 => Ok(BlendMode::Divide),
        _ => Err(Error::MalformedDocument(format!(
            "unknown blend mode: {}",
            id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str, child_level: u16, visible: bool) -> Layer {
        Layer {
            name: name.to_owned(),
            flags: if visible {
                LayerFlags::VISIBLE
            } else {
                LayerFlags::empty()
            },
            blend_mode: BlendMode::Normal,
            opacity: 255,
            kind: LayerKind::Image,
            child_level,
            user_data: None,
        }
    }

    #[test]
    fn parents_follow_child_levels() {
        // group > (a, group2 > (b)), c
        let layers = Layers::from_vec(vec![
            layer("group", 0, true),
            layer("a", 1, true),
            layer("group2", 1, true),
            layer("b", 2, true),
            layer("c", 0, true),
        ]);
        assert_eq!(layers.parent(0), None);
        assert_eq!(layers.parent(1), Some(0));
        assert_eq!(layers.parent(2), Some(0));
        assert_eq!(layers.parent(3), Some(2));
        assert_eq!(layers.parent(4), None);
    }

    #[test]
    fn hidden_group_hides_children() {
        let layers = Layers::from_vec(vec![layer("group", 0, false), layer("child", 1, true)]);
        assert!(layers.get(1).unwrap().is_visible());
        assert!(!layers.is_visible(1));
    }
}
