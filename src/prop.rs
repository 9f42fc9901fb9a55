use core::str::from_utf8;

use crate::blob::FitBlob;
use crate::error::{FitError, Result};
use crate::node::{FitNode, NodeHandle};
use crate::priv_util::SliceRead;
use crate::value::PropValue;

/// A handle to a [`FitNode`]'s property.
#[derive(Copy, Clone, Debug)]
pub struct FitProp<'r, 'dt: 'r> {
    fit: &'r FitBlob<'dt>,
    node: NodeHandle,
    propbuf: &'dt [u8],
    nameoff: usize,
}

impl<'r, 'dt: 'r> FitProp<'r, 'dt> {
    pub(crate) fn new(
        fit: &'r FitBlob<'dt>,
        node: NodeHandle,
        propbuf: &'dt [u8],
        nameoff: usize,
    ) -> Self {
        Self {
            fit,
            node,
            propbuf,
            nameoff,
        }
    }

    /// Returns the name of the property, looked up in the strings block.
    #[inline]
    pub fn name(&self) -> Result<&'dt str> {
        self.fit.string_at(self.nameoff)
    }

    /// Returns offset of this property's name within the strings block.
    #[inline]
    #[must_use]
    pub fn nameoff(&self) -> usize {
        self.nameoff
    }

    /// Returns the node which this property is attached to.
    #[must_use]
    pub fn node(&self) -> FitNode<'r, 'dt> {
        self.fit.node(self.node)
    }

    /// Returns the length of the property value.
    #[inline]
    #[must_use]
    pub fn length(&self) -> usize {
        self.propbuf.len()
    }

    /// Returns this property's data as a raw slice.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &'dt [u8] {
        self.propbuf
    }

    /// Read the big-endian [`u32`] at byte `offset` of the value, if the value is long enough.
    #[inline]
    #[must_use]
    pub fn u32_at(&self, offset: usize) -> Option<u32> {
        self.propbuf.read_be_u32(offset).ok()
    }

    /// Read the value as one or two big-endian cells, the encoding of addresses.
    #[must_use]
    pub fn cells(&self) -> Option<u64> {
        match self.propbuf.len() {
            4 => self.u32_at(0).map(u64::from),
            8 => self.propbuf.read_be_u64(0).ok(),
            _ => None,
        }
    }

    /// Returns the leading null-terminated string of the value.
    ///
    /// A value without a null byte, or whose string is not UTF-8, is rejected with
    /// [`FitError::InvalidString`].
    pub fn str(&self) -> Result<&'dt str> {
        let invalid = FitError::InvalidString {
            offset: self.value_offset(),
        };
        let bytes = self.propbuf.read_bstring0(0).map_err(|_| invalid)?;
        from_utf8(bytes).map_err(|_| invalid)
    }

    /// Infer the most useful representation of the value, see [`PropValue::classify`].
    #[must_use]
    pub fn value(&self) -> PropValue<'dt> {
        PropValue::classify(self.propbuf)
    }

    /// Absolute offset of the value, recovered from the value slice's position in the blob.
    fn value_offset(&self) -> usize {
        (self.propbuf.as_ptr() as usize).saturating_sub(self.fit.buf().as_ptr() as usize)
    }
}
