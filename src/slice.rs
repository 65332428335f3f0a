use crate::reader::ByteReader;
use crate::user_data::UserData;
use crate::Result;

/// A named region whose geometry may change across frames.
#[derive(Debug)]
pub struct Slice {
    pub(crate) name: String,
    pub(crate) keys: Vec<SliceKey>,
    pub(crate) user_data: Option<UserData>,
}

impl Slice {
    /// Slice name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The per-frame keys, in file order. Each key applies from its
    /// frame onward until the next key.
    pub fn keys(&self) -> &[SliceKey] {
        &self.keys
    }

    /// User data attached to this slice, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }
}

/// Slice geometry from one frame onward.
#[derive(Debug, Clone)]
pub struct SliceKey {
    /// Frame at which this key takes effect.
    pub from_frame: u32,
    /// Top-left corner of the bounds, canvas-relative.
    pub origin: (i32, i32),
    /// Bounds size in pixels.
    pub size: (u32, u32),
    /// 9-patch center rectangle (x, y, width, height), relative to the
    /// bounds, if the slice has one.
    pub nine_patch_center: Option<(i32, i32, u32, u32)>,
    /// Pivot point relative to the bounds origin, if the slice has
    /// one.
    pub pivot: Option<(i32, i32)>,
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<Slice> {
    let mut reader = ByteReader::new(data);

    let num_keys = reader.dword()?;
    let flags = reader.dword()?;
    let _reserved = reader.dword()?;
    let name = reader.string()?;

    let mut keys = Vec::with_capacity(num_keys as usize);
    for _ in 0..num_keys {
        let from_frame = reader.dword()?;
        let origin_x = reader.long()?;
        let origin_y = reader.long()?;
        let width = reader.dword()?;
        let height = reader.dword()?;
        let nine_patch_center = if flags & 1 != 0 {
            let center_x = reader.long()?;
            let center_y = reader.long()?;
            let center_width = reader.dword()?;
            let center_height = reader.dword()?;
            Some((center_x, center_y, center_width, center_height))
        } else {
            None
        };
        let pivot = if flags & 2 != 0 {
            let pivot_x = reader.long()?;
            let pivot_y = reader.long()?;
            Some((pivot_x, pivot_y))
        } else {
            None
        };
        keys.push(SliceKey {
            from_frame,
            origin: (origin_x, origin_y),
            size: (width, height),
            nine_patch_center,
            pivot,
        });
    }

    Ok(Slice {
        name,
        keys,
        user_data: None,
    })
}
