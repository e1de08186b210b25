//! Path segmentation.
//!
//! A path is split on `/` after dropping one leading and one trailing slash.
//! The first segment names the controller; the remainder is walked through the
//! route table. Empty interior segments are preserved so `/a//b` never matches
//! a route registered as `/a/b`.
//!
//! Request segments are percent-decoded after splitting, so an encoded `/`
//! (`%2F`) stays inside its segment.

use std::borrow::Cow;
use std::str::Utf8Error;

use percent_encoding::percent_decode_str;

/// Marker that turns a pattern segment into a named parameter.
pub const PARAM_MARKER: char = ':';

/// A request path split into its controller and the decoded segments after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments<'a> {
    pub controller: Cow<'a, str>,
    pub rest: Vec<Cow<'a, str>>,
}

impl<'a> Segments<'a> {
    /// Split and percent-decode a request path. Fails when a decoded segment
    /// is not valid UTF-8.
    pub fn parse(path: &'a str) -> Result<Self, Utf8Error> {
        let mut parts = split(path).into_iter().map(decode);
        let controller = parts.next().transpose()?.unwrap_or(Cow::Borrowed(""));
        Ok(Self {
            controller,
            rest: parts.collect::<Result<_, _>>()?,
        })
    }

    /// Number of segments after the controller.
    pub fn depth(&self) -> usize {
        self.rest.len()
    }
}

/// Split a path into its segments.
pub fn split(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.split('/').collect()
}

/// Percent-decode one request segment.
pub fn decode(segment: &str) -> Result<Cow<'_, str>, Utf8Error> {
    percent_decode_str(segment).decode_utf8()
}

/// Parameter name of a pattern segment, if it is one.
pub fn param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix(PARAM_MARKER)
}
