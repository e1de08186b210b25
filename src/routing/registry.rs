//! Route registration.
//!
//! # Responsibilities
//! - Validate pattern shape and segment count
//! - Reject duplicate routes and sibling parameters with different names
//! - Insert nodes, reusing existing ones, and raise `max_depth` along the way
//!
//! # Design Decisions
//! - Checks run against the current tree before anything is inserted, so a
//!   rejected route leaves no partial branch behind
//! - `freeze` consumes the registry; the resulting table has no mutating API

use axum::http::Method;
use serde::Serialize;

use crate::config::RoutingConfig;
use crate::error::{HttpError, RegistrationError};
use crate::http::Context;
use crate::routing::matcher::RouteTable;
use crate::routing::node::{NodeKind, RouteNode};
use crate::routing::segment::{self, param_name};
use crate::routing::{handler, Handler};

/// A registered `(controller, method, pattern)` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteBinding {
    pub controller: String,
    pub method: Method,
    pub pattern: String,
}

/// Route tree under construction.
#[derive(Debug)]
pub struct RouteRegistry {
    root: RouteNode,
    min_segments: usize,
    max_segments: usize,
    bindings: Vec<RouteBinding>,
}

impl RouteRegistry {
    /// Create a registry accepting patterns of `min..=max` segments,
    /// controller included.
    pub fn new(min_segments: usize, max_segments: usize) -> Self {
        Self {
            root: RouteNode::root(),
            min_segments,
            max_segments,
            bindings: Vec::new(),
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.min_segments, config.max_segments)
    }

    /// Declare a controller and return its route builder.
    pub fn controller(&mut self, name: &str) -> Result<ControllerRoutes<'_>, RegistrationError> {
        if self.root.child(name).is_some() {
            return Err(RegistrationError::DuplicateController(name.to_string()));
        }
        self.root.child_or_insert(NodeKind::Controller, name);
        Ok(ControllerRoutes {
            registry: self,
            name: name.to_string(),
        })
    }

    /// Bind `handler` to `method pattern` under `controller`.
    ///
    /// The controller node is created on first use.
    pub fn register(
        &mut self,
        controller: &str,
        method: Method,
        pattern: &str,
        handler: Handler,
    ) -> Result<(), RegistrationError> {
        let segments = segment::split(pattern);
        let len = segments.len();
        if len < self.min_segments {
            return Err(RegistrationError::PathTooShort {
                pattern: pattern.to_string(),
                len,
                min: self.min_segments,
            });
        }
        if len > self.max_segments {
            return Err(RegistrationError::PathTooLong {
                pattern: pattern.to_string(),
                len,
                max: self.max_segments,
            });
        }
        if segments.iter().any(|s| s.is_empty() || param_name(s) == Some("")) {
            return Err(RegistrationError::EmptySegment {
                pattern: pattern.to_string(),
            });
        }
        if segments[0] != controller {
            return Err(RegistrationError::ControllerMismatch {
                controller: controller.to_string(),
                pattern: pattern.to_string(),
            });
        }

        let rest = &segments[1..];
        self.check_conflicts(controller, &method, pattern, rest)?;

        let Some((last, inner)) = rest.split_last() else {
            return Err(RegistrationError::PathTooShort {
                pattern: pattern.to_string(),
                len,
                min: 2,
            });
        };
        let depth = rest.len();

        let mut node = self.root.child_or_insert(NodeKind::Controller, controller);
        node.raise_max_depth(depth);
        node = node.child_or_insert(NodeKind::Method, method.as_str());
        node.raise_max_depth(depth);
        for segment in inner {
            node = node.child_or_insert(kind_of(segment), segment);
            node.raise_max_depth(depth);
        }
        let leaf = node.child_or_insert(kind_of(last), last);
        leaf.raise_max_depth(depth);
        leaf.set_handler(handler);

        tracing::debug!(
            controller = %controller,
            method = %method,
            pattern = %pattern,
            "Route registered"
        );
        self.bindings.push(RouteBinding {
            controller: controller.to_string(),
            method,
            pattern: pattern.to_string(),
        });
        Ok(())
    }

    /// Walk the existing tree along `rest` looking for conflicts.
    fn check_conflicts(
        &self,
        controller: &str,
        method: &Method,
        pattern: &str,
        rest: &[&str],
    ) -> Result<(), RegistrationError> {
        let mut node = match self
            .root
            .child(controller)
            .and_then(|c| c.child(method.as_str()))
        {
            Some(node) => node,
            None => return Ok(()),
        };

        for (i, segment) in rest.iter().enumerate() {
            if param_name(segment).is_some() {
                if let Some(existing) = node.param_child() {
                    if existing.segment() != *segment {
                        return Err(RegistrationError::ConflictingParameter {
                            pattern: pattern.to_string(),
                            existing: existing.segment().to_string(),
                            new: segment.to_string(),
                        });
                    }
                }
            }

            let Some(next) = node.child(segment) else {
                return Ok(());
            };
            if i == rest.len() - 1 && next.handler().is_some() {
                return Err(RegistrationError::DuplicateRoute {
                    method: method.clone(),
                    pattern: pattern.to_string(),
                });
            }
            node = next;
        }
        Ok(())
    }

    pub fn bindings(&self) -> &[RouteBinding] {
        &self.bindings
    }

    /// Seal the registry. No route can be added afterwards.
    pub fn freeze(self) -> RouteTable {
        tracing::info!(routes = self.bindings.len(), "Route table frozen");
        RouteTable::new(self.root, self.bindings)
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
    }
}

fn kind_of(segment: &str) -> NodeKind {
    if param_name(segment).is_some() {
        NodeKind::Param
    } else {
        NodeKind::Static
    }
}

/// Per-controller route builder.
pub struct ControllerRoutes<'a> {
    registry: &'a mut RouteRegistry,
    name: String,
}

impl ControllerRoutes<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handle<F, T>(
        &mut self,
        method: Method,
        pattern: &str,
        f: F,
    ) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.registry
            .register(&self.name, method, pattern, handler(f))?;
        Ok(self)
    }

    pub fn get<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::GET, pattern, f)
    }

    pub fn post<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::POST, pattern, f)
    }

    pub fn put<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::PUT, pattern, f)
    }

    pub fn patch<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::PATCH, pattern, f)
    }

    pub fn delete<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::DELETE, pattern, f)
    }

    pub fn head<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::HEAD, pattern, f)
    }

    pub fn options<F, T>(&mut self, pattern: &str, f: F) -> Result<&mut Self, RegistrationError>
    where
        F: Fn(&mut Context) -> Result<T, HttpError> + Send + Sync + 'static,
        T: Serialize,
    {
        self.handle(Method::OPTIONS, pattern, f)
    }
}
