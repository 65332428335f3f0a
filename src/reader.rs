use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Little-endian cursor over the document byte stream.
///
/// Keeps a running byte offset so that malformed-input errors can name
/// the position at which decoding went wrong. Offsets are absolute for
/// the top-level reader and chunk-relative for readers constructed over
/// a single chunk's payload.
pub(crate) struct ByteReader<T: Read> {
    input: T,
    pos: u64,
}

impl<'a> ByteReader<Cursor<&'a [u8]>> {
    pub(crate) fn new(data: &'a [u8]) -> ByteReader<Cursor<&'a [u8]>> {
        ByteReader {
            input: Cursor::new(data),
            pos: 0,
        }
    }
}

impl<T: Read> ByteReader<T> {
    pub(crate) fn with(input: T) -> Self {
        Self { input, pos: 0 }
    }

    /// Current offset into the stream, in bytes.
    pub(crate) fn pos(&self) -> u64 {
        self.pos
    }

    pub(crate) fn byte(&mut self) -> Result<u8> {
        let v = self.input.read_u8()?;
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn word(&mut self) -> Result<u16> {
        let v = self.input.read_u16::<LittleEndian>()?;
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn short(&mut self) -> Result<i16> {
        let v = self.input.read_i16::<LittleEndian>()?;
        self.pos += 2;
        Ok(v)
    }

    pub(crate) fn dword(&mut self) -> Result<u32> {
        let v = self.input.read_u32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    pub(crate) fn long(&mut self) -> Result<i32> {
        let v = self.input.read_i32::<LittleEndian>()?;
        self.pos += 4;
        Ok(v)
    }

    /// A length-prefixed UTF-8 string (WORD length, then bytes).
    pub(crate) fn string(&mut self) -> Result<String> {
        let len = self.word()?;
        let mut bytes = vec![0_u8; len as usize];
        self.read_exact(&mut bytes)?;
        let s = String::from_utf8(bytes)?;
        Ok(s)
    }

    pub(crate) fn read_exact(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.input.read_exact(buffer)?;
        self.pos += buffer.len() as u64;
        Ok(())
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<()> {
        let mut ignored = vec![0_u8; count];
        self.read_exact(&mut ignored)
    }

    /// Read exactly `limit` bytes, consuming the reader.
    pub(crate) fn take_bytes(mut self, limit: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(limit);
        let read = self
            .input
            .by_ref()
            .take(limit as u64)
            .read_to_end(&mut output)?;
        if read != limit {
            return Err(Error::MalformedDocument(format!(
                "expected {} bytes of data at offset {}, found {}",
                limit, self.pos, read
            )));
        }
        Ok(output)
    }

    /// Read whatever is left in the stream, consuming the reader.
    pub(crate) fn take_rest(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.input.read_to_end(&mut output)?;
        Ok(output)
    }
}
