//! Iterative walkers of a [`FitBlob`].
//!
//! All of these are [`FallibleIterator`]s: `Ok(None)` is a clean end, an `Err` is damage in
//! the structure block. The two never collapse into each other.

use crate::blob::FitBlob;
use crate::error::{FitError, Result};
use crate::node::{FitNode, NodeHandle};
use crate::parse::{FitParseIter, ParsedTok};
use crate::prop::FitProp;

use fallible_iterator::FallibleIterator;

/// Every node of the blob in structure block order, found by a flat token scan.
///
/// This never consults the tree walking primitives, which makes it an independent count of
/// the nodes the walker should reach.
#[derive(Clone, Debug)]
pub struct FitNodeIter<'r, 'dt: 'r> {
    iter: FitParseIter<'r, 'dt>,
}

impl<'r, 'dt: 'r> FitNodeIter<'r, 'dt> {
    pub(crate) fn new(fit: &'r FitBlob<'dt>) -> Self {
        Self {
            iter: fit.parse_iter(),
        }
    }
}

impl<'r, 'dt: 'r> FallibleIterator for FitNodeIter<'r, 'dt> {
    type Item = FitNode<'r, 'dt>;
    type Error = FitError;

    fn next(&mut self) -> Result<Option<Self::Item>> {
        loop {
            let offset = self.iter.offset;
            match self.iter.next()? {
                Some(ParsedTok::BeginNode(_)) => {
                    return Ok(Some(self.iter.fit.node(NodeHandle::new(offset))))
                }
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ChildCursor {
    Parent(NodeHandle),
    After(NodeHandle),
    Done,
}

/// The direct children of a node, in tree order.
#[derive(Clone, Debug)]
pub struct FitChildIter<'r, 'dt: 'r> {
    fit: &'r FitBlob<'dt>,
    cursor: ChildCursor,
}

impl<'r, 'dt: 'r> FitChildIter<'r, 'dt> {
    pub(crate) fn new(fit: &'r FitBlob<'dt>, parent: NodeHandle) -> Self {
        Self {
            fit,
            cursor: ChildCursor::Parent(parent),
        }
    }
}

impl<'r, 'dt: 'r> FallibleIterator for FitChildIter<'r, 'dt> {
    type Item = FitNode<'r, 'dt>;
    type Error = FitError;

    fn next(&mut self) -> Result<Option<Self::Item>> {
        let next = match self.cursor {
            ChildCursor::Parent(parent) => self.fit.first_child(parent),
            ChildCursor::After(prev) => self.fit.next_sibling(prev),
            ChildCursor::Done => return Ok(None),
        };
        // Stop for good on errors too; a damaged stream is not retried.
        self.cursor = ChildCursor::Done;

        let next = next?;
        if let Some(handle) = next {
            self.cursor = ChildCursor::After(handle);
        }
        Ok(next.map(|handle| self.fit.node(handle)))
    }
}

/// The properties of a node, in tree order. Child nodes' properties are not included.
#[derive(Clone, Debug)]
pub struct FitPropIter<'r, 'dt: 'r> {
    node: NodeHandle,
    iter: Option<FitParseIter<'r, 'dt>>,
    fit: &'r FitBlob<'dt>,
    done: bool,
}

impl<'r, 'dt: 'r> FitPropIter<'r, 'dt> {
    pub(crate) fn new(fit: &'r FitBlob<'dt>, node: NodeHandle) -> Self {
        Self {
            node,
            iter: None,
            fit,
            done: false,
        }
    }
}

impl<'r, 'dt: 'r> FallibleIterator for FitPropIter<'r, 'dt> {
    type Item = FitProp<'r, 'dt>;
    type Error = FitError;

    fn next(&mut self) -> Result<Option<Self::Item>> {
        if self.done {
            return Ok(None);
        }
        if self.iter.is_none() {
            // Lazily step over the node's own begin token.
            match self.fit.begin(self.node) {
                Ok((_, iter)) => self.iter = Some(iter),
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }
        let iter = match self.iter.as_mut() {
            Some(iter) => iter,
            None => return Ok(None),
        };

        loop {
            let offset = iter.offset;
            match iter.next() {
                Ok(Some(ParsedTok::Prop(prop))) => {
                    return Ok(Some(FitProp::new(
                        self.fit,
                        self.node,
                        prop.prop_buf,
                        prop.name_offset,
                    )))
                }
                Ok(Some(ParsedTok::Nop)) => continue,
                // Properties precede children: the first child or the end token closes the list.
                Ok(Some(ParsedTok::BeginNode(_))) | Ok(Some(ParsedTok::EndNode)) => {
                    self.done = true;
                    return Ok(None);
                }
                Ok(None) => {
                    self.done = true;
                    return Err(self.fit.truncated_at(offset));
                }
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }
    }
}
