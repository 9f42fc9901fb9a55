use core::mem::size_of;
use core::str::from_utf8;

use crate::error::{FitError, HeaderFault, Result};

use crate::priv_util::{SliceRead, SliceReadResult};
use crate::spec::{
    fdt_header, fdt_reserve_entry, FDT_FIRST_SUPPORTED_VERSION, FDT_LAST_SUPPORTED_VERSION,
    FDT_MAGIC, FDT_TAGSIZE, FDT_VERSION_SIZE_DT_STRUCT,
};

use fallible_iterator::FallibleIterator;

use crate::iters::FitNodeIter;
use crate::node::{FitNode, NodeHandle};
use crate::parse::{FitParseIter, ParsedTok};

macro_rules! get_be32_field {
    ( $f:ident, $s:ident , $buf:expr ) => {
        $buf.read_be_u32(offset_of!($s, $f))
    };
}

const fn is_aligned(offset: usize) -> bool {
    offset % FDT_TAGSIZE == 0
}

/// The decoded header fields of a FIT blob.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FitHeader {
    pub magic: u32,
    pub totalsize: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    pub boot_cpuid_phys: u32,
    pub size_dt_strings: u32,
    pub size_dt_struct: u32,
}

impl FitHeader {
    fn read(buf: &[u8]) -> SliceReadResult<Self> {
        Ok(Self {
            magic: get_be32_field!(magic, fdt_header, buf)?,
            totalsize: get_be32_field!(totalsize, fdt_header, buf)?,
            off_dt_struct: get_be32_field!(off_dt_struct, fdt_header, buf)?,
            off_dt_strings: get_be32_field!(off_dt_strings, fdt_header, buf)?,
            off_mem_rsvmap: get_be32_field!(off_mem_rsvmap, fdt_header, buf)?,
            version: get_be32_field!(version, fdt_header, buf)?,
            last_comp_version: get_be32_field!(last_comp_version, fdt_header, buf)?,
            boot_cpuid_phys: get_be32_field!(boot_cpuid_phys, fdt_header, buf)?,
            size_dt_strings: get_be32_field!(size_dt_strings, fdt_header, buf)?,
            size_dt_struct: get_be32_field!(size_dt_struct, fdt_header, buf)?,
        })
    }
}

/// A validated, read-only view of a FIT blob.
///
/// This is the only owner of position information: nodes and properties are offsets into
/// the structure block, re-resolved against this view on every access. It is `Copy` and
/// never mutated, so any number of traversals may share it, across threads included.
#[derive(Copy, Clone, Debug)]
pub struct FitBlob<'dt> {
    buf: &'dt [u8],
    header: FitHeader,
    structure: &'dt [u8],
    strings: &'dt [u8],
    root: NodeHandle,
}

impl<'dt> PartialEq for FitBlob<'dt> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.buf, other.buf)
    }
}

impl<'dt> FitBlob<'dt> {
    pub const MIN_HEADER_SIZE: usize = size_of::<fdt_header>();

    /// Validate the header of `buf` and construct the blob view.
    ///
    /// Checks, in order: the buffer holds a header, the magic number, the format version,
    /// `totalsize` against the buffer, the reservation map, structure and strings blocks
    /// against `totalsize`, that the two blocks do not overlap, and that the structure block
    /// opens with a node. Bytes past `totalsize` are ignored.
    pub fn open(buf: &'dt [u8]) -> Result<Self> {
        let header = FitHeader::read(buf).map_err(|_| HeaderFault::TooShort { len: buf.len() })?;

        if header.magic != FDT_MAGIC {
            return Err(HeaderFault::BadMagic {
                found: header.magic,
            }
            .into());
        }
        if header.version < FDT_FIRST_SUPPORTED_VERSION
            || header.last_comp_version > FDT_LAST_SUPPORTED_VERSION
        {
            return Err(HeaderFault::UnsupportedVersion {
                version: header.version,
                last_comp_version: header.last_comp_version,
            }
            .into());
        }

        let totalsize = header.totalsize as usize;
        if totalsize < Self::MIN_HEADER_SIZE || totalsize > buf.len() {
            return Err(HeaderFault::TotalSize {
                declared: totalsize,
                available: buf.len(),
            }
            .into());
        }
        let buf = &buf[..totalsize];

        let rsvmap = header.off_mem_rsvmap as usize;
        if !is_aligned(rsvmap)
            || rsvmap < Self::MIN_HEADER_SIZE
            || rsvmap + size_of::<fdt_reserve_entry>() > totalsize
        {
            return Err(HeaderFault::ReserveMap.into());
        }

        let off_strings = header.off_dt_strings as usize;
        let size_strings = header.size_dt_strings as usize;
        let strings_end = off_strings
            .checked_add(size_strings)
            .filter(|&end| off_strings >= Self::MIN_HEADER_SIZE && end <= totalsize)
            .ok_or(HeaderFault::StringsBlock)?;

        let off_struct = header.off_dt_struct as usize;
        let size_struct = if header.version >= FDT_VERSION_SIZE_DT_STRUCT {
            header.size_dt_struct as usize
        } else if off_strings >= off_struct {
            // Older headers carry no structure size: it ends where the strings begin.
            off_strings - off_struct
        } else {
            totalsize.saturating_sub(off_struct)
        };
        let struct_end = off_struct
            .checked_add(size_struct)
            .filter(|&end| {
                is_aligned(off_struct) && off_struct >= Self::MIN_HEADER_SIZE && end <= totalsize
            })
            .ok_or(HeaderFault::StructBlock)?;

        if size_struct > 0
            && size_strings > 0
            && off_struct < strings_end
            && off_strings < struct_end
        {
            return Err(HeaderFault::Overlap.into());
        }

        let mut fit = Self {
            buf,
            header,
            structure: &buf[off_struct..struct_end],
            strings: &buf[off_strings..strings_end],
            root: NodeHandle::new(0),
        };
        fit.root = fit.find_root()?;
        Ok(fit)
    }

    /// Locate the root node's begin token, skipping any leading `FDT_NOP`s.
    fn find_root(&self) -> Result<NodeHandle> {
        let mut iter = self.parse_iter();
        loop {
            let offset = iter.offset;
            match iter.next() {
                Ok(Some(ParsedTok::BeginNode(_))) => return Ok(NodeHandle::new(offset)),
                Ok(Some(ParsedTok::Nop)) => continue,
                Ok(_) | Err(FitError::TruncatedToken { .. }) => {
                    return Err(HeaderFault::MissingRoot.into())
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The decoded header.
    #[inline]
    #[must_use]
    pub fn header(&self) -> &FitHeader {
        &self.header
    }

    /// Returns the totalsize field of the header.
    #[inline]
    #[must_use]
    pub fn totalsize(&self) -> usize {
        self.header.totalsize as usize
    }

    /// Returns the dt_struct offset field of the header.
    #[inline]
    #[must_use]
    pub fn off_dt_struct(&self) -> usize {
        self.header.off_dt_struct as usize
    }

    /// Returns the dt_strings offset field of the header.
    #[inline]
    #[must_use]
    pub fn off_dt_strings(&self) -> usize {
        self.header.off_dt_strings as usize
    }

    /// Returns the version field of the header.
    #[inline]
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// The whole blob, cut to `totalsize`.
    #[inline]
    pub fn buf(&self) -> &'dt [u8] {
        self.buf
    }

    /// The structure block: the token stream encoding the tree.
    #[inline]
    pub fn structure_slice(&self) -> &'dt [u8] {
        self.structure
    }

    /// The strings block: the pool of null-terminated property names.
    #[inline]
    pub fn strings_slice(&self) -> &'dt [u8] {
        self.strings
    }

    /// Read the null-terminated string starting at `offset` within the strings block.
    pub fn string_at(&self, offset: usize) -> Result<&'dt str> {
        let out_of_range = FitError::StringOffsetOutOfRange {
            offset: self.off_dt_strings().saturating_add(offset),
        };
        let name = self.strings.read_bstring0(offset).map_err(|_| out_of_range)?;
        from_utf8(name).map_err(|_| FitError::InvalidString {
            offset: self.off_dt_strings() + offset,
        })
    }

    /// Returns the root node of the tree.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    /// Returns the root node as a [`FitNode`] view.
    #[inline]
    #[must_use]
    pub fn root_node(&self) -> FitNode<'_, 'dt> {
        self.node(self.root)
    }

    /// Wrap a handle previously obtained from this blob in a [`FitNode`] view.
    #[inline]
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> FitNode<'_, 'dt> {
        FitNode::new(self, handle)
    }

    /// Returns an iterator over low level parsing tokens, [`ParsedTok`].
    #[must_use]
    pub fn parse_iter(&self) -> FitParseIter<'_, 'dt> {
        FitParseIter::new(self)
    }

    /// Returns an iterator over every node in structure block order, found by a flat scan
    /// of the token stream rather than by walking the tree.
    #[must_use]
    pub fn nodes(&self) -> FitNodeIter<'_, 'dt> {
        FitNodeIter::new(self)
    }
}
