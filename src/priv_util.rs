use core::convert::TryInto;
use core::mem::size_of;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum SliceReadError {
    UnexpectedEndOfInput,
}

pub(crate) type SliceReadResult<T> = Result<T, SliceReadError>;

/// Bounds-checked reads out of a byte slice. None of these panic, whatever `pos` is.
pub(crate) trait SliceRead<'a> {
    fn read_be_u32(&self, pos: usize) -> SliceReadResult<u32>;
    fn read_be_u64(&self, pos: usize) -> SliceReadResult<u64>;
    fn read_bstring0(&self, pos: usize) -> SliceReadResult<&'a [u8]>;
}

macro_rules! be_read {
    ( $buf:ident, $type:ident , $off:expr ) => {
        $off.checked_add(size_of::<$type>())
            .and_then(|end| $buf.get($off..end))
            .and_then(|bytes| bytes.try_into().ok())
            .map($type::from_be_bytes)
            .ok_or(SliceReadError::UnexpectedEndOfInput)
    };
}

impl<'a> SliceRead<'a> for &'a [u8] {
    #[inline]
    fn read_be_u32(&self, pos: usize) -> SliceReadResult<u32> {
        be_read!(self, u32, pos)
    }

    #[inline]
    fn read_be_u64(&self, pos: usize) -> SliceReadResult<u64> {
        be_read!(self, u64, pos)
    }

    /// Returns the bytes from `pos` up to (not including) the next null byte.
    #[inline]
    fn read_bstring0(&self, pos: usize) -> SliceReadResult<&'a [u8]> {
        let tail: &'a [u8] = self.get(pos..).ok_or(SliceReadError::UnexpectedEndOfInput)?;
        tail.iter()
            .position(|&b| b == 0)
            .map(|end| &tail[..end])
            .ok_or(SliceReadError::UnexpectedEndOfInput)
    }
}
