use crate::reader::ByteReader;
use crate::Result;
use log::debug;

/// Free-form metadata attached to a layer, cel, tag, slice, or the
/// sprite itself.
#[derive(Debug, Clone)]
pub struct UserData {
    /// User-provided text.
    pub text: Option<String>,
    /// User-provided color as `[r, g, b, a]`.
    pub color: Option<[u8; 4]>,
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<UserData> {
    let mut reader = ByteReader::new(data);

    let flags = reader.dword()?;
    let text = if flags & 1 != 0 {
        Some(reader.string()?)
    } else {
        None
    };
    let color = if flags & 2 != 0 {
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let alpha = reader.byte()?;
        Some([red, green, blue, alpha])
    } else {
        None
    };
    if flags & 4 != 0 {
        // Property maps carry structured editor extension data that
        // nothing downstream consumes; the chunk boundary makes them
        // safe to leave unread.
        debug!("ignoring user data property maps");
    }

    Ok(UserData { text, color })
}
