// SPDX-License-Identifier: MIT OR Apache-2.0
//! Relative node paths.
//!
//! A path is a list of child names walked from some starting node. `..`
//! climbs to the parent, `.` (or the empty path) names the starting node.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name segment that climbs to the parent node
pub const PARENT_SEGMENT: &str = "..";

/// A path from one node to another, relative to the first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodePath {
    names: Vec<String>,
}

impl NodePath {
    /// The path naming the starting node itself (`.`)
    pub fn current() -> Self {
        Self::default()
    }

    /// Build a path from individual segments
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::default();
        for name in names {
            path.push(name);
        }
        path
    }

    /// Parse a `/`-separated path. Empty and `.` segments are dropped.
    pub fn parse(s: &str) -> Self {
        Self::from_names(s.split('/'))
    }

    /// Whether this path names the starting node
    pub fn is_current(&self) -> bool {
        self.names.is_empty()
    }

    /// Path segments
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Same as [`NodePath::is_current`]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a segment
    pub fn push(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name.is_empty() || name == "." {
            return;
        }
        self.names.push(name);
    }

    /// Return a new path with `name` appended
    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(name);
        path
    }

    /// Return a new path with every segment of `other` appended
    pub fn concat(&self, other: &NodePath) -> Self {
        let mut path = self.clone();
        for name in &other.names {
            path.push(name.clone());
        }
        path
    }

    /// The path without its final segment, or `None` for `.`
    pub fn parent(&self) -> Option<Self> {
        if self.names.is_empty() {
            return None;
        }
        Some(Self {
            names: self.names[..self.names.len() - 1].to_vec(),
        })
    }

    /// Final segment
    pub fn last(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.names.is_empty() {
            f.write_str(".")
        } else {
            f.write_str(&self.names.join("/"))
        }
    }
}

impl FromStr for NodePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}
