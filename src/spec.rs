#![allow(non_camel_case_types)]

use core::mem::size_of;

use endian_type::types::{u32_be, u64_be};
use num_derive::FromPrimitive;
use static_assertions::{assert_eq_size, const_assert_eq};

pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Oldest format version whose header we understand.
pub const FDT_FIRST_SUPPORTED_VERSION: u32 = 0x02;
/// Newest format version we can read without loss.
pub const FDT_LAST_SUPPORTED_VERSION: u32 = 0x11;
/// First version carrying the `size_dt_struct` header field.
pub const FDT_VERSION_SIZE_DT_STRUCT: u32 = 0x11;

/// Every token and property payload is padded to this boundary.
pub const FDT_TAGSIZE: usize = size_of::<u32>();

#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtTok {
    BeginNode = 0x1,
    EndNode = 0x2,
    Prop = 0x3,
    Nop = 0x4,
    End = 0x9,
}

// These records are never cast onto the buffer. They describe the on-disk layout and hand
// out field offsets to the slice reader.

#[repr(C)]
pub struct fdt_header {
    pub magic: u32_be,
    pub totalsize: u32_be,
    pub off_dt_struct: u32_be,
    pub off_dt_strings: u32_be,
    pub off_mem_rsvmap: u32_be,
    pub version: u32_be,
    pub last_comp_version: u32_be,
    pub boot_cpuid_phys: u32_be,
    pub size_dt_strings: u32_be,
    pub size_dt_struct: u32_be,
}

#[repr(C)]
pub struct fdt_prop_header {
    pub len: u32_be,
    pub nameoff: u32_be,
}

#[repr(C)]
pub struct fdt_reserve_entry {
    pub address: u64_be,
    pub size: u64_be,
}

const_assert_eq!(size_of::<fdt_header>(), 40);
assert_eq_size!(fdt_prop_header, [u32; 2]);
assert_eq_size!(fdt_reserve_entry, [u64; 2]);

/// Align `off` up to the next token boundary.
#[inline]
#[must_use]
pub const fn fdt_tag_align(off: usize) -> usize {
    (off + FDT_TAGSIZE - 1) & !(FDT_TAGSIZE - 1)
}
