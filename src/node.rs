use core::str::from_utf8;

use crate::blob::FitBlob;
use crate::error::{FitError, Result};
use crate::iters::{FitChildIter, FitPropIter};
use crate::parse::{FitParseIter, ParsedBeginNode, ParsedTok};
use crate::prop::FitProp;

use fallible_iterator::FallibleIterator;

/// The position of a node's begin token within the structure block.
///
/// A handle owns nothing. It is re-resolved against its [`FitBlob`] on every access and is
/// meaningless with any other blob.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    #[inline]
    pub(crate) const fn new(offset: usize) -> Self {
        Self(offset)
    }

    /// Offset of the node's begin token, relative to the structure block.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

// Tree walking primitives. Each one replays the token stream from a handle; none of them
// keep state between calls.
impl<'dt> FitBlob<'dt> {
    /// Decode the begin token at `node`, returning it and a cursor positioned just after it.
    pub(crate) fn begin(
        &self,
        node: NodeHandle,
    ) -> Result<(ParsedBeginNode<'dt>, FitParseIter<'_, 'dt>)> {
        let mut iter = FitParseIter::from_offset(self, node.offset());
        match iter.next()? {
            Some(ParsedTok::BeginNode(begin)) => Ok((begin, iter)),
            _ => Err(FitError::InvalidHandle {
                offset: self.off_dt_struct() + node.offset(),
            }),
        }
    }

    /// Returns the name of the node (including unit address).
    pub fn name(&self, node: NodeHandle) -> Result<&'dt str> {
        let (begin, _) = self.begin(node)?;
        from_utf8(begin.name).map_err(|_| FitError::InvalidString {
            offset: begin.name_offset,
        })
    }

    /// Returns the first child of `node`, if it has any.
    pub fn first_child(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        let (_, mut iter) = self.begin(node)?;
        loop {
            let offset = iter.offset;
            match iter.next()? {
                Some(ParsedTok::BeginNode(_)) => return Ok(Some(NodeHandle::new(offset))),
                Some(ParsedTok::EndNode) => return Ok(None),
                Some(ParsedTok::Prop(_)) | Some(ParsedTok::Nop) => continue,
                None => return Err(self.truncated_at(offset)),
            }
        }
    }

    /// Returns the sibling following `node`, if any. The root has no siblings.
    pub fn next_sibling(&self, node: NodeHandle) -> Result<Option<NodeHandle>> {
        if node == self.root() {
            return Ok(None);
        }

        let mut iter = FitParseIter::from_offset(self, self.skip_node(node)?);
        loop {
            let offset = iter.offset;
            match iter.next()? {
                Some(ParsedTok::BeginNode(_)) => return Ok(Some(NodeHandle::new(offset))),
                Some(ParsedTok::EndNode) => return Ok(None),
                Some(ParsedTok::Prop(_)) | Some(ParsedTok::Nop) => continue,
                // The parent is still open.
                None => return Err(self.truncated_at(offset)),
            }
        }
    }

    /// Returns the offset just past the end token closing `node`, stepping over every
    /// nested subtree.
    fn skip_node(&self, node: NodeHandle) -> Result<usize> {
        let (_, mut iter) = self.begin(node)?;
        let mut depth = 1usize;
        loop {
            let offset = iter.offset;
            match iter.next()? {
                Some(ParsedTok::BeginNode(_)) => depth += 1,
                Some(ParsedTok::EndNode) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(iter.offset);
                    }
                }
                Some(ParsedTok::Prop(_)) | Some(ParsedTok::Nop) => continue,
                None => return Err(self.truncated_at(offset)),
            }
        }
    }

    /// Returns an iterator over the direct children of `node`, in tree order.
    #[must_use]
    pub fn children(&self, node: NodeHandle) -> FitChildIter<'_, 'dt> {
        FitChildIter::new(self, node)
    }

    /// Returns an iterator over the properties of `node`, in tree order.
    #[must_use]
    pub fn properties(&self, node: NodeHandle) -> FitPropIter<'_, 'dt> {
        FitPropIter::new(self, node)
    }

    /// Returns the first property of `node` called `name`.
    pub fn prop(&self, node: NodeHandle, name: &str) -> Result<Option<FitProp<'_, 'dt>>> {
        let mut props = self.properties(node);
        while let Some(prop) = props.next()? {
            if prop.name()? == name {
                return Ok(Some(prop));
            }
        }
        Ok(None)
    }

    /// Returns the child of `node` matching the path segment `segment`.
    ///
    /// A segment without a unit address also matches children named `segment@<unit>`. The
    /// first match in tree order is returned.
    pub fn subnode(&self, node: NodeHandle, segment: &str) -> Result<Option<NodeHandle>> {
        let mut children = self.children(node);
        while let Some(child) = children.next()? {
            let name = child.name()?;
            if name == segment || Self::matches_unit_name(name, segment) {
                return Ok(Some(child.handle()));
            }
        }
        Ok(None)
    }

    fn matches_unit_name(name: &str, segment: &str) -> bool {
        !segment.contains('@')
            && name
                .strip_prefix(segment)
                .map_or(false, |rest| rest.starts_with('@'))
    }

    /// Resolve a slash separated path from the root, one segment at a time.
    ///
    /// Empty segments are ignored, so `"/"` and `""` both name the root. `Ok(None)` means the
    /// path does not exist; `Err` means the tree itself is damaged.
    pub fn find_path(&self, path: &str) -> Result<Option<NodeHandle>> {
        let mut node = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = match self.subnode(node, segment)? {
                Some(child) => child,
                None => return Ok(None),
            };
        }
        Ok(Some(node))
    }

    /// Like [`FitBlob::find_path`], with a missing path reported as [`FitError::NotFound`].
    pub fn resolve_path(&self, path: &str) -> Result<NodeHandle> {
        self.find_path(path)?.ok_or(FitError::NotFound)
    }

    pub(crate) fn truncated_at(&self, offset: usize) -> FitError {
        FitError::TruncatedToken {
            offset: self.off_dt_struct() + offset,
        }
    }
}

/// A node of a [`FitBlob`]: a handle bundled with the blob it belongs to.
#[derive(Copy, Clone, Debug)]
pub struct FitNode<'r, 'dt: 'r> {
    fit: &'r FitBlob<'dt>,
    handle: NodeHandle,
}

impl<'r, 'dt: 'r> PartialEq for FitNode<'r, 'dt> {
    fn eq(&self, other: &Self) -> bool {
        self.fit == other.fit && self.handle == other.handle
    }
}

impl<'r, 'dt: 'r> FitNode<'r, 'dt> {
    pub(crate) fn new(fit: &'r FitBlob<'dt>, handle: NodeHandle) -> Self {
        Self { fit, handle }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    #[inline]
    #[must_use]
    pub fn fit(&self) -> &'r FitBlob<'dt> {
        self.fit
    }

    /// Returns the name of the node (including unit address). The root's name is empty.
    #[inline]
    pub fn name(&self) -> Result<&'dt str> {
        self.fit.name(self.handle)
    }

    #[must_use]
    pub fn props(&self) -> FitPropIter<'r, 'dt> {
        FitPropIter::new(self.fit, self.handle)
    }

    #[must_use]
    pub fn children(&self) -> FitChildIter<'r, 'dt> {
        FitChildIter::new(self.fit, self.handle)
    }

    pub fn prop(&self, name: &str) -> Result<Option<FitProp<'r, 'dt>>> {
        self.fit.prop(self.handle, name)
    }

    pub fn first_child(&self) -> Result<Option<Self>> {
        Ok(self
            .fit
            .first_child(self.handle)?
            .map(|h| Self::new(self.fit, h)))
    }

    pub fn next_sibling(&self) -> Result<Option<Self>> {
        Ok(self
            .fit
            .next_sibling(self.handle)?
            .map(|h| Self::new(self.fit, h)))
    }
}
