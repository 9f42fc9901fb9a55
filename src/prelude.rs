//! Module exporting traits of this library.
pub use crate::extract::ArtifactWriter;
pub use crate::print::Palette;

pub use fallible_iterator::FallibleIterator;
