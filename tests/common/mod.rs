//! Builds flattened tree blobs for the integration tests.
#![allow(dead_code)]

const HEADER_SIZE: usize = 40;
const RSVMAP_SIZE: usize = 16;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

pub const FDT_MAGIC: u32 = 0xd00d_feed;

fn pad(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

#[derive(Default, Clone)]
pub struct FdtBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
}

impl FdtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn word(&mut self, w: u32) -> &mut Self {
        self.structure.extend_from_slice(&w.to_be_bytes());
        self
    }

    /// Offset of `name` in the strings block, appending it on first use.
    pub fn string_offset(&mut self, name: &str) -> u32 {
        let mut off = 0;
        for s in self.strings.split(|&b| b == 0) {
            if s == name.as_bytes() && off < self.strings.len() {
                return off as u32;
            }
            off += s.len() + 1;
        }
        let off = self.strings.len();
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        off as u32
    }

    /// Append `bytes` to the strings block as a new entry, returning its offset.
    pub fn raw_string(&mut self, bytes: &[u8]) -> u32 {
        let off = self.strings.len();
        self.strings.extend_from_slice(bytes);
        self.strings.push(0);
        off as u32
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.begin_node_raw(name.as_bytes())
    }

    /// A begin token whose name bytes are taken verbatim.
    pub fn begin_node_raw(&mut self, name: &[u8]) -> &mut Self {
        self.word(FDT_BEGIN_NODE);
        self.structure.extend_from_slice(name);
        self.structure.push(0);
        pad(&mut self.structure);
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.word(FDT_END_NODE)
    }

    pub fn nop(&mut self) -> &mut Self {
        self.word(FDT_NOP)
    }

    pub fn raw_word(&mut self, w: u32) -> &mut Self {
        self.word(w)
    }

    /// A property whose name offset is given verbatim.
    pub fn prop_at(&mut self, nameoff: u32, value: &[u8]) -> &mut Self {
        self.word(FDT_PROP);
        self.word(value.len() as u32);
        self.word(nameoff);
        self.structure.extend_from_slice(value);
        pad(&mut self.structure);
        self
    }

    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let nameoff = self.string_offset(name);
        self.prop_at(nameoff, value)
    }

    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes)
    }

    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    /// The structure block as built so far, terminated by `FDT_END`.
    pub fn structure(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        structure.extend_from_slice(&FDT_END.to_be_bytes());
        structure
    }

    /// The structure block without the `FDT_END` terminator.
    pub fn unterminated(&self) -> Vec<u8> {
        self.structure.clone()
    }

    pub fn strings(&self) -> Vec<u8> {
        self.strings.clone()
    }

    /// Assemble header, empty reservation map, structure block and strings block.
    pub fn finish(&self) -> Vec<u8> {
        assemble(&self.structure(), &self.strings)
    }
}

/// Lay out a version 17 blob around the given blocks.
pub fn assemble(structure: &[u8], strings: &[u8]) -> Vec<u8> {
    let off_struct = HEADER_SIZE + RSVMAP_SIZE;
    let off_strings = off_struct + structure.len();
    let totalsize = off_strings + strings.len();

    let header = [
        FDT_MAGIC,
        totalsize as u32,
        off_struct as u32,
        off_strings as u32,
        HEADER_SIZE as u32,
        17,
        16,
        0,
        strings.len() as u32,
        structure.len() as u32,
    ];

    let mut blob: Vec<u8> = header.iter().flat_map(|w| w.to_be_bytes()).collect();
    blob.extend_from_slice(&[0u8; RSVMAP_SIZE]);
    blob.extend_from_slice(structure);
    blob.extend_from_slice(strings);
    blob
}

/// Overwrite header word `index` (0 = magic, 1 = totalsize, ...).
pub fn set_header_word(blob: &mut [u8], index: usize, value: u32) {
    blob[index * 4..index * 4 + 4].copy_from_slice(&value.to_be_bytes());
}

pub const KERNEL_DATA: [u8; 16] = [
    0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// A small but complete FIT: a kernel with a hash subnode, a signature node without data,
/// and a configuration.
pub fn sample_fit() -> Vec<u8> {
    let mut b = FdtBuilder::new();
    b.begin_node("")
        .prop_str("description", "Test firmware")
        .prop_u32("#address-cells", 1)
        .begin_node("images")
        .begin_node("kernel")
        .prop_str("description", "Linux kernel")
        .prop("data", &KERNEL_DATA)
        .prop_str("type", "kernel")
        .prop_str("arch", "arm64")
        .prop_str("os", "linux")
        .prop_str("compression", "none")
        .prop_u32("load", 0x8008_0000)
        .prop_u32("entry", 0x8008_0000)
        .begin_node("hash-1")
        .prop("value", &[0xde, 0xad, 0xbe, 0xef, 0x01])
        .prop_str("algo", "sha256")
        .end_node()
        .end_node()
        .begin_node("signature")
        .prop_str("type", "signature")
        .end_node()
        .end_node()
        .begin_node("configurations")
        .prop_str("default", "conf-1")
        .begin_node("conf-1")
        .prop_str("kernel", "kernel")
        .end_node()
        .end_node()
        .end_node();
    b.finish()
}

