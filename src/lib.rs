//! A reader for Flattened Image Tree (FIT) blobs.
//!
//! A FIT image is a compiled device tree used to bundle firmware images with metadata. This
//! crate decodes the binary form in place: the blob is borrowed once and every node or
//! property is an offset into it, resolved on demand. No tree is ever built in memory.
//!
//! # Overview
//!
//! - [`FitBlob::open`] validates the header and exposes the structure and strings blocks.
//! - [`parse`] tokenizes the structure block.
//! - [`FitBlob`]'s walking primitives ([`FitBlob::first_child`], [`FitBlob::next_sibling`],
//!   [`FitBlob::properties`], [`FitBlob::find_path`]) and the [`FitNode`] view navigate it.
//! - [`PropValue::classify`] guesses how to display a property.
//! - [`extract::extract_images`] writes every `/images/*/data` payload to a file.
//! - [`print::TreePrinter`] renders the whole tree as text.
//!
//! # Example
//!
//! ```ignore
//! use fit_rs::prelude::*;
//! use fit_rs::FitBlob;
//!
//! let bytes = std::fs::read("image.fit")?;
//! let fit = FitBlob::open(&bytes)?;
//!
//! let images = fit.resolve_path("/images")?;
//! let mut children = fit.children(images);
//! while let Some(image) = children.next()? {
//!     println!("{}", image.name()?);
//! }
//! ```

#[macro_use]
extern crate memoffset;

pub mod blob;
pub mod error;
pub mod extract;
pub mod iters;
pub mod node;
pub mod parse;
pub mod prelude;
pub mod print;
pub mod prop;
pub mod spec;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

mod priv_util;

#[doc(inline)]
pub use blob::{FitBlob, FitHeader};
#[doc(inline)]
pub use error::{FitError, HeaderFault, Result};
#[doc(inline)]
pub use node::{FitNode, NodeHandle};
#[doc(inline)]
pub use prop::FitProp;
#[doc(inline)]
pub use value::PropValue;
