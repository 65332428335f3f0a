use crate::reader::ByteReader;
use crate::user_data::UserData;
use crate::{Error, Result};

/// Traversal order of a tag's frame range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDirection {
    /// First to last frame.
    Forward,
    /// Last to first frame.
    Reverse,
    /// Forward, then backward without repeating the endpoints.
    PingPong,
    /// Backward, then forward without repeating the endpoints.
    PingPongReverse,
}

/// A named, directional range of frames defining one animation
/// segment.
#[derive(Debug, Clone)]
pub struct Tag {
    pub(crate) name: String,
    pub(crate) from_frame: u16,
    pub(crate) to_frame: u16,
    pub(crate) direction: LoopDirection,
    pub(crate) repeat: u16,
    pub(crate) color: [u8; 3],
    pub(crate) user_data: Option<UserData>,
}

impl Tag {
    /// Tag name. Not necessarily unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First frame of the range (inclusive).
    pub fn from_frame(&self) -> u16 {
        self.from_frame
    }

    /// Last frame of the range (inclusive).
    pub fn to_frame(&self) -> u16 {
        self.to_frame
    }

    /// Traversal order over the range.
    pub fn direction(&self) -> LoopDirection {
        self.direction
    }

    /// How many times the segment plays. 0 means forever.
    pub fn repeat(&self) -> u16 {
        self.repeat
    }

    /// Editor label color of the tag.
    pub fn color(&self) -> [u8; 3] {
        self.color
    }

    /// User data attached to this tag, if any.
    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    pub(crate) fn set_user_data(&mut self, user_data: UserData) {
        self.user_data = Some(user_data);
    }
}

pub(crate) fn parse_chunk(data: &[u8]) -> Result<Vec<Tag>> {
    let mut reader = ByteReader::new(data);

    let num_tags = reader.word()?;
    reader.skip(8)?;

    let mut tags = Vec::with_capacity(num_tags as usize);
    for _ in 0..num_tags {
        let from_frame = reader.word()?;
        let to_frame = reader.word()?;
        let direction = parse_direction(reader.byte()?)?;
        let repeat = reader.word()?;
        reader.skip(6)?;
        let red = reader.byte()?;
        let green = reader.byte()?;
        let blue = reader.byte()?;
        let _extra = reader.byte()?;
        let name = reader.string()?;

        if to_frame < from_frame {
            return Err(Error::MalformedDocument(format!(
                "tag {:?} has reversed frame range {}..{}",
                name, from_frame, to_frame
            )));
        }

        tags.push(Tag {
            name,
            from_frame,
            to_frame,
            direction,
            repeat,
            color: [red, green, blue],
            user_data: None,
        });
    }

    Ok(tags)
}

fn parse_direction(id: u8) -> Result<LoopDirection> {
    match id {
        0 => Ok(LoopDirection::Forward),
        1 => Ok(LoopDirection::Reverse),
        2 => Ok(LoopDirection::PingPong),
        3 => Ok(LoopDirection::PingPongReverse),
        _ => Err(Error::MalformedDocument(format!(
            "unknown animation direction: {}",
            id
        ))),
    }
}
