//! Errors reported by this library

use thiserror::Error;

/// The header check which rejected a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFault {
    /// The buffer cannot hold a header.
    TooShort { len: usize },
    /// The magic number `FDT_MAGIC` was not found at offset 0.
    BadMagic { found: u32 },
    /// The header declares a format version this reader cannot handle.
    UnsupportedVersion { version: u32, last_comp_version: u32 },
    /// `totalsize` is smaller than the header or larger than the buffer.
    TotalSize { declared: usize, available: usize },
    /// The memory reservation map is unaligned or outside `totalsize`.
    ReserveMap,
    /// The structure block is unaligned or outside `totalsize`.
    StructBlock,
    /// The strings block lies outside `totalsize`.
    StringsBlock,
    /// The structure and strings blocks share bytes.
    Overlap,
    /// The structure block does not open with a node.
    MissingRoot,
}

impl core::fmt::Display for HeaderFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            HeaderFault::TooShort { len } => {
                write!(f, "buffer of {} bytes cannot hold a header", len)
            }
            HeaderFault::BadMagic { found } => write!(f, "invalid magic number {:#010x}", found),
            HeaderFault::UnsupportedVersion { version, last_comp_version } => write!(
                f,
                "unsupported version {} (last compatible {})",
                version, last_comp_version
            ),
            HeaderFault::TotalSize { declared, available } => write!(
                f,
                "totalsize {} does not fit the {} bytes available",
                declared, available
            ),
            HeaderFault::ReserveMap => write!(f, "memory reservation map out of bounds"),
            HeaderFault::StructBlock => write!(f, "structure block out of bounds"),
            HeaderFault::StringsBlock => write!(f, "strings block out of bounds"),
            HeaderFault::Overlap => write!(f, "structure and strings blocks overlap"),
            HeaderFault::MissingRoot => write!(f, "structure block does not begin with a node"),
        }
    }
}

/// An error describing problems met while decoding a FIT blob.
///
/// Every offset is absolute, counted from the start of the blob.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    /// The header failed validation. Nothing in the blob can be trusted.
    #[error("malformed header: {0}")]
    MalformedHeader(HeaderFault),

    /// A property name offset points past the strings block, or its string is unterminated.
    #[error("string offset {offset:#x} is outside the strings block")]
    StringOffsetOutOfRange { offset: usize },

    /// A token's payload runs past the end of the structure block.
    #[error("truncated token at offset {offset:#x}")]
    TruncatedToken { offset: usize },

    /// A token tag that is not part of the format.
    #[error("unknown token tag {tag:#x} at offset {offset:#x}")]
    UnknownTag { tag: u32, offset: usize },

    /// A node or property name that is not valid UTF-8.
    #[error("invalid string at offset {offset:#x}")]
    InvalidString { offset: usize },

    /// A node handle that does not point at a begin token of this blob.
    #[error("no node begins at offset {offset:#x}")]
    InvalidHandle { offset: usize },

    /// A path did not resolve to a node.
    #[error("path not found")]
    NotFound,
}

impl From<HeaderFault> for FitError {
    fn from(fault: HeaderFault) -> FitError {
        FitError::MalformedHeader(fault)
    }
}

/// The result of a parse.
pub type Result<T> = core::result::Result<T, FitError>;
