//! Request matching against the frozen route table.
//!
//! # Responsibilities
//! - Resolve controller, then method, then each remaining segment
//! - Capture parameter values in path order
//! - Report which level missed: controller, method or path
//!
//! # Design Decisions
//! - Depth-first, no backtracking: a static child is taken over the parameter
//!   child whenever it can still reach the requested depth
//! - Numeric or format checks on parameter values belong to handlers

use std::fmt;

use axum::http::Method;

use crate::error::HttpError;
use crate::http::stack::Middleware;
use crate::http::{Context, CONTROLLER_KEY};
use crate::routing::node::RouteNode;
use crate::routing::params::Params;
use crate::routing::registry::RouteBinding;
use crate::routing::segment::Segments;
use crate::routing::Handler;

pub const CONTROLLER_NOT_FOUND: &str = "Controller not found";
pub const METHOD_NOT_FOUND: &str = "Method not found";
pub const PATH_NOT_FOUND: &str = "Path not found";
pub const INVALID_PATH_ENCODING: &str = "Path is not valid UTF-8";

/// A resolved route.
pub struct RouteMatch<'t> {
    pub handler: &'t Handler,
    pub params: Params,
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Immutable route tree, shared across request threads without locking.
#[derive(Debug)]
pub struct RouteTable {
    root: RouteNode,
    bindings: Vec<RouteBinding>,
}

impl RouteTable {
    pub(crate) fn new(root: RouteNode, bindings: Vec<RouteBinding>) -> Self {
        Self { root, bindings }
    }

    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve a request path. Segments are percent-decoded first.
    pub fn lookup<'t>(&'t self, method: &Method, path: &str) -> Result<RouteMatch<'t>, HttpError> {
        let segments = decode_path(path)?;
        self.find(&segments.controller, method, &segments.rest)
    }

    /// Resolve `rest` under `controller` and `method`.
    pub fn find<'t, S: AsRef<str>>(
        &'t self,
        controller: &str,
        method: &Method,
        rest: &[S],
    ) -> Result<RouteMatch<'t>, HttpError> {
        let controller = self
            .root
            .child(controller)
            .ok_or_else(|| HttpError::not_found(CONTROLLER_NOT_FOUND))?;
        let mut node = controller
            .child(method.as_str())
            .ok_or_else(|| HttpError::not_found(METHOD_NOT_FOUND))?;

        let depth = rest.len();
        let (last, inner) = rest
            .split_last()
            .ok_or_else(|| HttpError::not_found(PATH_NOT_FOUND))?;

        let mut params = Params::new();
        for segment in inner {
            let segment = segment.as_ref();
            node = match reachable(node.static_child(segment), depth) {
                Some(next) => next,
                None => {
                    let next = reachable(node.param_child(), depth)
                        .ok_or_else(|| HttpError::not_found(PATH_NOT_FOUND))?;
                    params.insert(next.param_name().unwrap_or_default(), segment);
                    next
                }
            };
        }

        let last = last.as_ref();
        if let Some(handler) = node.static_child(last).and_then(RouteNode::handler) {
            return Ok(RouteMatch { handler, params });
        }
        if let Some(leaf) = node.param_child() {
            if let Some(handler) = leaf.handler() {
                params.insert(leaf.param_name().unwrap_or_default(), last);
                return Ok(RouteMatch { handler, params });
            }
        }
        Err(HttpError::not_found(PATH_NOT_FOUND))
    }
}

fn decode_path(path: &str) -> Result<Segments<'_>, HttpError> {
    Segments::parse(path).map_err(|_| HttpError::validation(INVALID_PATH_ENCODING))
}

fn reachable(node: Option<&RouteNode>, depth: usize) -> Option<&RouteNode> {
    node.filter(|n| n.max_depth() >= depth)
}

/// The route table runs as the last middleware of the stack: it resolves the
/// route, invokes the handler and writes the envelope.
impl Middleware for RouteTable {
    fn handle(&self, ctx: &mut Context) {
        let (controller, outcome) = match decode_path(ctx.path()) {
            Ok(segments) => {
                let outcome = self.find(&segments.controller, ctx.method(), &segments.rest);
                (segments.controller.into_owned(), outcome)
            }
            Err(err) => (String::new(), Err(err)),
        };

        match outcome {
            Ok(route) => {
                ctx.insert_data(CONTROLLER_KEY, controller);
                ctx.set_params(route.params);
                match (route.handler)(ctx) {
                    Ok(data) => {
                        ctx.ok(data);
                    }
                    Err(err) => {
                        ctx.fail(&err);
                    }
                }
            }
            Err(err) => {
                ctx.fail(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::routing::RouteRegistry;

    fn tagged(tag: &'static str) -> impl Fn(&mut Context) -> Result<&'static str, HttpError> {
        move |_ctx: &mut Context| Ok(tag)
    }

    fn table() -> RouteTable {
        let mut registry = RouteRegistry::default();
        registry
            .controller("user")
            .unwrap()
            .get("/user/:id", tagged("show"))
            .unwrap()
            .get("/user/list", tagged("list"))
            .unwrap()
            .get("/user/:id/posts", tagged("posts"))
            .unwrap()
            .get("/user/:id/posts/:post", tagged("post"))
            .unwrap()
            .post("/user/create", tagged("create"))
            .unwrap();
        registry
            .controller("org")
            .unwrap()
            .get("/org/:org/member/:member", tagged("member"))
            .unwrap();
        registry.freeze()
    }

    fn not_found_message(result: Result<RouteMatch<'_>, HttpError>) -> String {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        err.message().to_string()
    }

    #[test]
    fn test_param_binding() {
        let table = table();
        let route = table.lookup(&Method::GET, "/user/42").unwrap();
        assert_eq!(route.params.get("id"), Some("42"));
        assert_eq!(route.params.len(), 1);
    }

    #[test]
    fn test_multiple_params_in_order() {
        let table = table();
        let route = table.lookup(&Method::GET, "/org/acme/member/7").unwrap();
        let pairs: Vec<_> = route.params.iter().collect();
        assert_eq!(pairs, vec![("org", "acme"), ("member", "7")]);

        let route = table.lookup(&Method::GET, "/user/9/posts/3").unwrap();
        assert_eq!(route.params.get("id"), Some("9"));
        assert_eq!(route.params.get("post"), Some("3"));
    }

    #[test]
    fn test_static_takes_precedence() {
        let table = table();
        let route = table.lookup(&Method::GET, "/user/list").unwrap();
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_param_leaf_with_children_still_matches() {
        let table = table();
        let route = table.lookup(&Method::GET, "/user/5").unwrap();
        assert_eq!(route.params.get("id"), Some("5"));
        let route = table.lookup(&Method::GET, "/user/5/posts").unwrap();
        assert_eq!(route.params.get("id"), Some("5"));
    }

    #[test]
    fn test_controller_not_found() {
        let table = table();
        let msg = not_found_message(table.lookup(&Method::GET, "/unknown/1"));
        assert_eq!(msg, CONTROLLER_NOT_FOUND);
    }

    #[test]
    fn test_method_not_found() {
        let table = table();
        let msg = not_found_message(table.lookup(&Method::PUT, "/user/1"));
        assert_eq!(msg, METHOD_NOT_FOUND);
    }

    #[test]
    fn test_path_not_found() {
        let table = table();
        assert_eq!(
            not_found_message(table.lookup(&Method::GET, "/user")),
            PATH_NOT_FOUND
        );
        assert_eq!(
            not_found_message(table.lookup(&Method::POST, "/user/remove")),
            PATH_NOT_FOUND
        );
    }

    #[test]
    fn test_depth_mismatch_never_matches() {
        let table = table();
        // Deeper than any registered GET route under `user`.
        assert_eq!(
            not_found_message(table.lookup(&Method::GET, "/user/1/posts/2/extra")),
            PATH_NOT_FOUND
        );
        // `list` only reaches depth 1, so a two-segment path cannot go through it.
        assert_eq!(
            not_found_message(table.lookup(&Method::GET, "/user/list/x")),
            PATH_NOT_FOUND
        );
        // Shorter than any registered route under `org`.
        assert_eq!(
            not_found_message(table.lookup(&Method::GET, "/org/acme/member")),
            PATH_NOT_FOUND
        );
    }

    #[test]
    fn test_pruned_static_falls_back_to_param() {
        let table = table();
        // `list` cannot reach depth 2, so the parameter child takes the segment.
        let route = table.lookup(&Method::GET, "/user/list/posts").unwrap();
        assert_eq!(route.params.get("id"), Some("list"));
    }

    #[test]
    fn test_encoded_param_is_decoded() {
        let table = table();
        let route = table.lookup(&Method::GET, "/user/john%20doe").unwrap();
        assert_eq!(route.params.get("id"), Some("john doe"));

        // An encoded slash stays inside its segment.
        let route = table.lookup(&Method::GET, "/user/a%2Fb/posts").unwrap();
        assert_eq!(route.params.get("id"), Some("a/b"));
    }

    #[test]
    fn test_encoded_static_segments_match() {
        let table = table();
        let route = table.lookup(&Method::GET, "/us%65r/l%69st").unwrap();
        assert!(route.params.is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_validation_error() {
        let table = table();
        let err = table.lookup(&Method::GET, "/user/%FF").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), INVALID_PATH_ENCODING);
    }

    #[test]
    fn test_every_binding_resolves() {
        let table = table();
        for binding in table.bindings() {
            let path = binding
                .pattern
                .split('/')
                .map(|s| if s.starts_with(':') { "v" } else { s })
                .collect::<Vec<_>>()
                .join("/");
            assert!(
                table.lookup(&binding.method, &path).is_ok(),
                "{} {} did not resolve",
                binding.method,
                path
            );
        }
    }
}
