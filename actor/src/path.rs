// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Actor path
//!
//! The `path` module provides the `ActorPath` type, the hierarchical address of an actor in the
//! actor system.
//!

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::fmt::{Error, Formatter};

/// Path separator.
pub const SEPARATOR: char = '/';

/// Name of the guardian segment every user actor lives under.
pub const USER_GUARDIAN: &str = "user";

/// Hierarchical actor path.
///
/// An `ActorPath` is an ordered sequence of name segments, written like a filesystem path:
/// `/user/supervisor/worker1` is the actor `worker1`, child of `supervisor`, child of the
/// `user` guardian. Two paths are equal iff their segment sequences are equal, and no segment
/// ever contains the `/` separator.
///
/// Parent/child relationships are purely a property of the segments: the system keeps no
/// back-pointers between actors, children are found by path prefix.
///
/// # Construction
///
/// - [`ActorPath::user`] returns the `/user` root.
/// - The `/` operator appends one or more segments: `ActorPath::user() / "worker1"`.
/// - [`ActorPath::parse`] accepts only well formed strings and returns `None` otherwise.
/// - `From<&str>` is lenient: empty segments are skipped, so `"/user//a/"` becomes `/user/a`.
///
/// ```ignore
/// use actor::ActorPath;
///
/// let worker = ActorPath::user() / "supervisor" / "worker1";
/// assert_eq!(worker.to_string(), "/user/supervisor/worker1");
/// assert_eq!(worker.parent(), ActorPath::from("/user/supervisor"));
/// assert_eq!(worker.key(), "worker1");
/// assert!(ActorPath::parse("/user//worker1").is_none());
/// ```
///
/// Paths are immutable values; every navigation method returns a new path.
///
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ActorPath(Vec<String>);

impl ActorPath {
    /// The `/user` root path.
    pub fn user() -> Self {
        ActorPath(vec![USER_GUARDIAN.to_owned()])
    }

    /// Parses a path string strictly.
    ///
    /// The string must start with `/`, contain at least one segment, and no segment may be
    /// empty or blank. A single trailing separator is tolerated. Malformed input yields `None`
    /// rather than an error, so callers can treat it as "no match".
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(SEPARATOR)?;
        let rest = rest.strip_suffix(SEPARATOR).unwrap_or(rest);
        if rest.is_empty() {
            return None;
        }
        let mut segments = Vec::new();
        for segment in rest.split(SEPARATOR) {
            if segment.trim().is_empty() {
                return None;
            }
            segments.push(segment.to_owned());
        }
        Some(ActorPath(segments))
    }

    /// The segments of this path, root first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the top-level segment as a path. Empty paths stay empty.
    pub fn root(&self) -> Self {
        if self.0.len() == 1 {
            self.clone()
        } else if !self.0.is_empty() {
            ActorPath(self.0.iter().take(1).cloned().collect())
        } else {
            ActorPath(Vec::new())
        }
    }

    /// Returns the path without its last segment. The parent of a top-level path is the empty
    /// path.
    pub fn parent(&self) -> Self {
        if self.0.len() > 1 {
            let mut tokens = self.0.clone();
            tokens.truncate(tokens.len() - 1);
            ActorPath(tokens)
        } else {
            ActorPath(Vec::new())
        }
    }

    /// Last segment, the actor's own name.
    pub fn key(&self) -> String {
        self.0.last().cloned().unwrap_or_default()
    }

    /// Number of segments.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// Truncates the path to `level` segments. Out of range levels return the path unchanged.
    pub fn at_level(&self, level: usize) -> Self {
        if level < 1 || level >= self.level() {
            self.clone()
        } else {
            let mut tokens = self.0.clone();
            tokens.truncate(level);
            ActorPath(tokens)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `other` lives strictly below this path.
    pub fn is_ancestor_of(&self, other: &ActorPath) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }

    pub fn is_descendant_of(&self, other: &ActorPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// True if `other` is a direct child of this path.
    pub fn is_parent_of(&self, other: &ActorPath) -> bool {
        !other.is_empty() && *self == other.parent()
    }

    pub fn is_child_of(&self, other: &ActorPath) -> bool {
        other.is_parent_of(self)
    }

    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }

    /// Appends exactly one segment. Returns `None` when `name` is blank or contains the
    /// separator, where the `/` operator would silently drop or split it.
    pub fn child(&self, name: &str) -> Option<Self> {
        if name.trim().is_empty() || name.contains(SEPARATOR) {
            return None;
        }
        let mut segments = self.0.clone();
        segments.push(name.to_owned());
        Some(ActorPath(segments))
    }
}

fn tokens(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split(SEPARATOR)
        .filter(|x| !x.trim().is_empty())
        .map(|s| s.to_string())
}

impl From<&str> for ActorPath {
    fn from(str: &str) -> Self {
        ActorPath(tokens(str).collect())
    }
}

impl From<String> for ActorPath {
    fn from(string: String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl From<&String> for ActorPath {
    fn from(string: &String) -> Self {
        ActorPath::from(string.as_str())
    }
}

impl std::ops::Div<&str> for ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        let mut keys = self.0;
        keys.extend(tokens(rhs));
        ActorPath(keys)
    }
}

impl std::ops::Div<&str> for &ActorPath {
    type Output = ActorPath;

    fn div(self, rhs: &str) -> Self::Output {
        self.clone() / rhs
    }
}

impl std::fmt::Display for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self.level().cmp(&1) {
            Ordering::Less => write!(f, "/"),
            Ordering::Equal => write!(f, "/{}", self.0[0]),
            Ordering::Greater => write!(f, "/{}", self.0.join("/")),
        }
    }
}

impl std::fmt::Debug for ActorPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parse_empty_string() {
        let path = ActorPath::from("");
        assert_eq!(path.0, Vec::<String>::new());
    }

    #[test]
    fn parse_three_deep() {
        let path = ActorPath::from("/user/supervisor/worker1");
        assert_eq!(path.0, vec!["user", "supervisor", "worker1"]);
        assert_eq!(path.level(), 3);
        assert_eq!(path.key(), "worker1");
    }

    #[test]
    fn parse_strict() {
        assert_eq!(
            ActorPath::parse("/user/worker"),
            Some(ActorPath::user() / "worker")
        );
        assert_eq!(ActorPath::parse("/user/worker/"), Some(ActorPath::from("/user/worker")));
        assert_eq!(ActorPath::parse(""), None);
        assert_eq!(ActorPath::parse("/"), None);
        assert_eq!(ActorPath::parse("user/worker"), None);
        assert_eq!(ActorPath::parse("/user//worker"), None);
        assert_eq!(ActorPath::parse("/user/ /worker"), None);
    }

    #[test]
    fn parse_get_parent() {
        let path = ActorPath::from("/acme/building/room/sensor").parent();
        assert_eq!(path.parent().0, vec!["acme", "building"]);
        assert_eq!(ActorPath::from("/acme").parent().to_string(), "/");
    }

    #[test]
    fn parse_root_to_string() {
        let path = ActorPath::from("/acme/building/room/sensor");
        assert_eq!(path.root().to_string(), "/acme");
        assert_eq!(path.to_string(), "/acme/building/room/sensor");
    }

    #[test]
    fn test_if_parent_child() {
        let path = ActorPath::from("/user/supervisor/worker1");
        let parent = path.parent();
        assert!(parent.is_parent_of(&path));
        assert!(path.is_child_of(&parent));
        assert!(!path.root().is_parent_of(&path));
        assert!(!ActorPath::from("/").is_parent_of(&ActorPath::from("/")));
    }

    #[test]
    fn test_ancestor_uses_segments() {
        let path = ActorPath::from("/user/worker10");
        let almost = ActorPath::from("/user/worker1");
        assert!(!almost.is_ancestor_of(&path));
        assert!(ActorPath::user().is_ancestor_of(&path));
        assert!(path.is_descendant_of(&ActorPath::user()));
        assert!(!path.is_ancestor_of(&path));
    }

    #[test]
    fn test_at_level() {
        let path = ActorPath::from("/acme/building/room/sensor");
        assert_eq!(path.at_level(0), path);
        assert_eq!(path.at_level(1), path.root());
        assert_eq!(path.at_level(2), ActorPath::from("/acme/building"));
        assert_eq!(path.at_level(3), path.parent());
        assert_eq!(path.at_level(5), path);
    }

    #[test]
    fn test_append_never_embeds_separator() {
        let path = ActorPath::user() / "a/b" / "c";
        assert_eq!(path.segments(), ["user", "a", "b", "c"]);
        assert!(path.segments().iter().all(|s| !s.contains(SEPARATOR)));
        let borrowed = &path / "d";
        assert_eq!(borrowed.key(), "d");
    }

    #[test]
    fn test_child_is_strict() {
        let user = ActorPath::user();
        assert_eq!(user.child("worker"), Some(ActorPath::from("/user/worker")));
        assert_eq!(user.child(""), None);
        assert_eq!(user.child("  "), None);
        assert_eq!(user.child("a/b"), None);
        assert_eq!(user.child("/"), None);
    }
}
