//! Text rendering of a whole tree.
//!
//! [`TreePrinter`] walks the tree depth-first, pre-order, and renders
//!
//! ```text
//! name {
//!   prop = value;
//!   child {
//!   }
//! }
//! ```
//!
//! Values come from [`PropValue`], except `data` which always renders as a byte count. The
//! output depends only on the blob. Styling (colors) is layered on through a [`Palette`].

use std::borrow::Cow;

use crate::blob::FitBlob;
use crate::error::Result;
use crate::extract::DATA_PROP;
use crate::node::NodeHandle;
use crate::value::PropValue;

use fallible_iterator::FallibleIterator;

const INDENT: &str = "  ";

/// Decorates the pieces of a rendered line. The default methods leave the text untouched.
pub trait Palette {
    fn node_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }

    fn prop_name<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }

    fn value<'a>(&self, value: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(value)
    }

    fn bracket<'a>(&self, bracket: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(bracket)
    }
}

/// No decoration at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Plain;

impl Palette for Plain {}

/// Renders a [`FitBlob`] as nested, indented blocks.
#[derive(Debug, Clone)]
pub struct TreePrinter<'r, 'dt: 'r, P: Palette = Plain> {
    fit: &'r FitBlob<'dt>,
    palette: P,
}

impl<'r, 'dt: 'r> TreePrinter<'r, 'dt, Plain> {
    pub fn new(fit: &'r FitBlob<'dt>) -> Self {
        Self::with_palette(fit, Plain)
    }
}

struct Frame {
    next_child: Option<NodeHandle>,
}

impl<'r, 'dt: 'r, P: Palette> TreePrinter<'r, 'dt, P> {
    pub fn with_palette(fit: &'r FitBlob<'dt>, palette: P) -> Self {
        Self { fit, palette }
    }

    /// Render the whole tree into a single document, every line ending in `\n`.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        self.for_each_line(|line| {
            out.push_str(line);
            out.push('\n');
        })?;
        Ok(out)
    }

    /// Render the whole tree as a list of lines, without line terminators.
    pub fn render_lines(&self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        self.for_each_line(|line| lines.push(line.to_owned()))?;
        Ok(lines)
    }

    /// Hand every rendered line to `sink`, in document order.
    ///
    /// The walk keeps its own stack, so arbitrarily deep trees cannot exhaust the call stack.
    /// On a decoding error the lines already emitted stay emitted.
    pub fn for_each_line<F: FnMut(&str)>(&self, mut sink: F) -> Result<()> {
        let root = self.fit.root();
        self.open_node(root, 0, &mut sink)?;
        let mut stack = vec![Frame {
            next_child: self.fit.first_child(root)?,
        }];

        while let Some(frame) = stack.last_mut() {
            match frame.next_child {
                Some(child) => {
                    frame.next_child = self.fit.next_sibling(child)?;
                    let depth = stack.len();
                    self.open_node(child, depth, &mut sink)?;
                    stack.push(Frame {
                        next_child: self.fit.first_child(child)?,
                    });
                }
                None => {
                    stack.pop();
                    let indent = INDENT.repeat(stack.len());
                    sink(&format!("{}{}", indent, self.palette.bracket("}")));
                }
            }
        }
        Ok(())
    }

    fn open_node<F: FnMut(&str)>(
        &self,
        node: NodeHandle,
        depth: usize,
        sink: &mut F,
    ) -> Result<()> {
        let indent = INDENT.repeat(depth);
        let name = match self.fit.name(node)? {
            "" => "/",
            name => name,
        };
        sink(&format!(
            "{}{} {}",
            indent,
            self.palette.node_name(name),
            self.palette.bracket("{")
        ));

        let mut props = self.fit.properties(node);
        while let Some(prop) = props.next()? {
            let prop_name = prop.name()?;
            let value = if prop_name == DATA_PROP {
                format!("<{} bytes>", prop.length())
            } else {
                PropValue::classify(prop.raw()).to_string()
            };
            sink(&format!(
                "{}{}{} = {};",
                indent,
                INDENT,
                self.palette.prop_name(prop_name),
                self.palette.value(&value)
            ));
        }
        Ok(())
    }
}
