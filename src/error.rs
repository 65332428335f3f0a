use std::{error::Error as StdError, fmt, io, string::FromUtf8Error};

/// An error occurred while decoding a sprite document or packing its
/// frames.
#[derive(Debug)]
pub enum Error {
    /// The binary document is inconsistent: a bad magic number, a
    /// truncated chunk, or a declared length that does not match the
    /// data. The message includes the byte offset where decoding
    /// failed. No partial document is ever returned.
    MalformedDocument(String),
    /// A compressed payload could not be decoded: corrupt DEFLATE
    /// data, a bad zlib header, or an Adler-32 mismatch.
    Decompression(String),
    /// An index reference inside the document does not resolve: a
    /// linked cel without a valid target, or a tilemap layer naming a
    /// tileset that does not exist.
    UnresolvedLink(String),
    /// Spritesheet packing failed: input frames disagree on their
    /// dimensions or the atlas would exceed the maximum size. The
    /// decoded document itself remains valid.
    Packing(String),
    /// The document is well-formed but uses a feature outside the
    /// scope of this crate (e.g. tilesets stored in external files).
    Unsupported(String),
    /// An I/O error, including inputs shorter than a declared length.
    Io(io::Error),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<FromUtf8Error> for Error {
    fn from(err: FromUtf8Error) -> Self {
        Error::MalformedDocument(format!("could not decode utf8 string: {}", err))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedDocument(msg) => write!(f, "Malformed document: {}", msg),
            Error::Decompression(msg) => write!(f, "Decompression failed: {}", msg),
            Error::UnresolvedLink(msg) => write!(f, "Unresolved reference: {}", msg),
            Error::Packing(msg) => write!(f, "Packing failed: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported feature: {}", msg),
            Error::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}
