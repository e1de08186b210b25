//! Route tree nodes.

use std::fmt;

use crate::routing::segment::param_name;
use crate::routing::Handler;

/// Role of a node in the route tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Controller,
    Method,
    Static,
    Param,
}

/// One node of the route tree.
///
/// `max_depth` is the longest route (in segments after the controller) that
/// passes through this node. The matcher skips nodes that cannot reach the
/// requested depth.
pub struct RouteNode {
    kind: NodeKind,
    segment: String,
    max_depth: usize,
    handler: Option<Handler>,
    children: Vec<RouteNode>,
}

impl RouteNode {
    pub(crate) fn new(kind: NodeKind, segment: impl Into<String>, max_depth: usize) -> Self {
        Self {
            kind,
            segment: segment.into(),
            max_depth,
            handler: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn root() -> Self {
        Self::new(NodeKind::Root, "", 0)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Literal token: controller name, method name, path literal or `:name`.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Parameter name without the marker; `None` for non-parameter nodes.
    pub fn param_name(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Param => param_name(&self.segment),
            _ => None,
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    pub fn children(&self) -> &[RouteNode] {
        &self.children
    }

    /// Child whose literal token equals `segment`.
    pub fn child(&self, segment: &str) -> Option<&RouteNode> {
        self.children.iter().find(|n| n.segment == segment)
    }

    /// The unique parameter child, if any.
    pub fn param_child(&self) -> Option<&RouteNode> {
        self.children.iter().find(|n| n.kind == NodeKind::Param)
    }

    /// Static child matching a request segment.
    pub fn static_child(&self, segment: &str) -> Option<&RouteNode> {
        self.children
            .iter()
            .find(|n| n.kind == NodeKind::Static && n.segment == segment)
    }

    /// Return the child for `segment`, creating it with `kind` when missing.
    pub(crate) fn child_or_insert(&mut self, kind: NodeKind, segment: &str) -> &mut RouteNode {
        let index = match self.children.iter().position(|n| n.segment == segment) {
            Some(index) => index,
            None => {
                self.children.push(RouteNode::new(kind, segment, 0));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    pub(crate) fn raise_max_depth(&mut self, depth: usize) {
        self.max_depth = self.max_depth.max(depth);
    }

    pub(crate) fn set_handler(&mut self, handler: Handler) {
        self.handler = Some(handler);
    }
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("kind", &self.kind)
            .field("segment", &self.segment)
            .field("max_depth", &self.max_depth)
            .field("handler", &self.handler.is_some())
            .field("children", &self.children)
            .finish()
    }
}
