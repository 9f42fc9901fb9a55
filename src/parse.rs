//! Low level structure block tokenizer.

use core::mem::size_of;

use num_traits::FromPrimitive;

use crate::blob::FitBlob;
use crate::error::{FitError, Result};
use crate::priv_util::SliceRead;
use crate::spec::{fdt_prop_header, fdt_tag_align, FdtTok};

use fallible_iterator::FallibleIterator;

/// This function implements the logic to tokenize the structure block.
///
/// `buf` is the structure block and `base` its absolute offset within the blob (used only
/// for error reporting). This function will return the next [`ParsedTok`] if one exists and
/// `Ok(None)` at the `FDT_END` token. If it succeeds in parsing a token, `off` is moved to
/// the start of the next token within `buf`. On error `off` is left where it was.
///
/// No read ever leaves `buf`, whatever the offset or the contents.
pub fn next_fit_token<'dt>(
    buf: &'dt [u8],
    base: usize,
    off: &mut usize,
) -> Result<Option<ParsedTok<'dt>>> {
    let start = *off;
    let truncated = FitError::TruncatedToken {
        offset: base + start,
    };

    let tag = buf.read_be_u32(start).map_err(|_| truncated)?;
    let mut cur = start + size_of::<u32>();

    let tok = match FdtTok::from_u32(tag) {
        Some(FdtTok::BeginNode) => {
            let name = buf.read_bstring0(cur).map_err(|_| truncated)?;

            // Skip the name and its null byte, then pad back to the tag size.
            cur = fdt_tag_align(cur + name.len() + 1);

            ParsedTok::BeginNode(ParsedBeginNode {
                name,
                name_offset: base + start + size_of::<u32>(),
            })
        }
        Some(FdtTok::Prop) => {
            let len = buf
                .read_be_u32(cur + offset_of!(fdt_prop_header, len))
                .map_err(|_| truncated)? as usize;
            let name_offset = buf
                .read_be_u32(cur + offset_of!(fdt_prop_header, nameoff))
                .map_err(|_| truncated)? as usize;
            cur += size_of::<fdt_prop_header>();

            let prop_buf = cur
                .checked_add(len)
                .and_then(|end| buf.get(cur..end))
                .ok_or(truncated)?;
            cur = fdt_tag_align(cur + len);

            ParsedTok::Prop(ParsedProp {
                prop_buf,
                name_offset,
            })
        }
        Some(FdtTok::EndNode) => ParsedTok::EndNode,
        Some(FdtTok::Nop) => ParsedTok::Nop,
        Some(FdtTok::End) => return Ok(None),
        None => {
            return Err(FitError::UnknownTag {
                tag,
                offset: base + start,
            })
        }
    };

    *off = cur;
    Ok(Some(tok))
}

#[derive(Debug, Clone, Copy)]
pub struct ParsedBeginNode<'a> {
    pub name: &'a [u8],
    /// Absolute offset of the name bytes, for error reporting.
    pub name_offset: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ParsedProp<'a> {
    pub prop_buf: &'a [u8],
    /// Offset of the property name within the strings block.
    pub name_offset: usize,
}

/// Enumeration of all tokens within a blob's structure block.
#[derive(Debug, Clone, Copy)]
pub enum ParsedTok<'a> {
    BeginNode(ParsedBeginNode<'a>),
    EndNode,
    Prop(ParsedProp<'a>),
    Nop,
}

/// A forward-only cursor over the structure block.
///
/// `offset` is the position of the token the next call to `next()` decodes. Any offset
/// previously observed here can be handed back to [`FitParseIter::from_offset`] to resume.
#[derive(Clone, Debug)]
pub struct FitParseIter<'r, 'dt: 'r> {
    pub offset: usize,
    pub fit: &'r FitBlob<'dt>,
}

impl<'r, 'dt: 'r> FitParseIter<'r, 'dt> {
    pub(crate) fn new(fit: &'r FitBlob<'dt>) -> Self {
        Self::from_offset(fit, 0)
    }

    pub(crate) fn from_offset(fit: &'r FitBlob<'dt>, offset: usize) -> Self {
        Self { offset, fit }
    }
}

impl<'r, 'dt: 'r> FallibleIterator for FitParseIter<'r, 'dt> {
    type Error = FitError;
    type Item = ParsedTok<'dt>;

    fn next(&mut self) -> Result<Option<Self::Item>> {
        next_fit_token(
            self.fit.structure_slice(),
            self.fit.off_dt_struct(),
            &mut self.offset,
        )
    }
}
