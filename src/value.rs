//! Best-effort typing of property payloads for display.
//!
//! The format stores every property as untyped bytes. [`PropValue::classify`] tries a fixed,
//! ordered list of interpretations and keeps the first that fits. The result only drives
//! rendering; extraction always works on the raw bytes.
//!
//! The heuristic is knowingly ambiguous: any payload whose length is a multiple of four and
//! which is not a clean string list reads as integers, so a 4 byte magic cookie prints as a
//! number, and four printable bytes ending in a null print as a string.

use core::fmt;
use core::str::from_utf8;

/// Opaque payloads longer than this render as a byte count instead of hex.
pub const OPAQUE_HEX_LIMIT: usize = 64;

/// The inferred representation of a property payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue<'a> {
    /// One or more null-terminated printable strings filling the payload exactly.
    StringList(Vec<&'a str>),
    /// Big-endian 32-bit cells.
    Uint32List(Vec<u32>),
    /// Anything else.
    Opaque(&'a [u8]),
}

type Classifier = for<'a> fn(&'a [u8]) -> Option<PropValue<'a>>;

/// Tried in order, first match wins. [`PropValue::Opaque`] is the fallback.
const CLASSIFIERS: &[Classifier] = &[string_list, uint32_list];

impl<'a> PropValue<'a> {
    /// Classify `raw`. The same bytes always yield the same variant.
    #[must_use]
    pub fn classify(raw: &'a [u8]) -> Self {
        CLASSIFIERS
            .iter()
            .find_map(|classify| classify(raw))
            .unwrap_or(PropValue::Opaque(raw))
    }
}

fn is_printable(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(char::is_control)
}

fn string_list(raw: &[u8]) -> Option<PropValue<'_>> {
    let (&last, body) = raw.split_last()?;
    if last != 0 {
        return None;
    }

    body.split(|&b| b == 0)
        .map(|s| from_utf8(s).ok().filter(|s| is_printable(s)))
        .collect::<Option<Vec<_>>>()
        .map(PropValue::StringList)
}

fn uint32_list(raw: &[u8]) -> Option<PropValue<'_>> {
    if raw.is_empty() || raw.len() % 4 != 0 {
        return None;
    }

    let cells = raw
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Some(PropValue::Uint32List(cells))
}

impl fmt::Display for PropValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::StringList(strings) => {
                for (i, s) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(s)?;
                }
                Ok(())
            }
            PropValue::Uint32List(cells) => {
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:#x}", cell)?;
                }
                Ok(())
            }
            PropValue::Opaque(bytes) if bytes.is_empty() || bytes.len() > OPAQUE_HEX_LIMIT => {
                write!(f, "<{} bytes>", bytes.len())
            }
            PropValue::Opaque(bytes) => bytes.iter().try_for_each(|b| write!(f, "{:02x}", b)),
        }
    }
}
