//! Error types for image load and mmap adoption.
//!
//! Once an image is built and validated, no runtime error path exists in
//! stepping, running, or accept queries; everything here concerns bringing
//! untrusted bytes into that trusted state. The enum is `#[non_exhaustive]`
//! so new rejection reasons can be added without breaking callers.

use std::fmt;
use std::io;

/// Errors from deserializing or adopting a scanner image.
#[derive(Debug)]
#[non_exhaustive]
pub enum LoadError {
    /// I/O error while reading the stream.
    Io(io::Error),
    /// The framing header is missing, has a bad magic, or an unsupported
    /// version.
    BadHeader,
    /// The buffer or stream ended before the full image.
    ShortImage,
    /// The image was produced by the other relocation variant.
    SignatureMismatch { expected: usize, actual: usize },
    /// The image was built with incompatible layout settings (exit-mask
    /// count or row-header size).
    PlatformMismatch,
    /// The mmap base address is not word-aligned.
    Misaligned,
    /// The image failed structural validation.
    Corrupt { detail: &'static str },
}

impl LoadError {
    /// Constructs a corruption error with a static detail string.
    #[inline]
    pub const fn corrupt(detail: &'static str) -> Self {
        Self::Corrupt { detail }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::BadHeader => write!(f, "bad image header"),
            Self::ShortImage => write!(f, "EOF reached while reading scanner image"),
            Self::SignatureMismatch { expected, actual } => {
                write!(
                    f,
                    "relocation signature mismatch: expected {expected}, found {actual}"
                )
            }
            Self::PlatformMismatch => {
                write!(f, "scanner image was built for an incompatible platform")
            }
            Self::Misaligned => write!(f, "mmap base is not word-aligned"),
            Self::Corrupt { detail } => write!(f, "corrupt scanner image: {detail}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::ShortImage,
            _ => Self::Io(err),
        }
    }
}
