//! The cleaned virtual path representation used by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized virtual path: forward slashes, no leading or trailing
/// separator, `.` segments dropped and `..` segments resolved.
///
/// The empty path is the root of the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Creates a new VirtualPath from any slash-separated string, cleaning it.
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(clean(path.as_ref()))
    }

    /// The root of the virtual tree.
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Joins a sub-path onto this path, cleaning the result.
    pub fn join(&self, other: impl AsRef<str>) -> Self {
        let other = other.as_ref();
        if self.0.is_empty() {
            return Self::new(other);
        }
        Self::new(format!("{}/{}", self.0, other))
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments().next()
    }

    /// The final path segment, or "" for the root.
    pub fn base_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// The extension of the final segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let base = self.base_name();
        match base.rfind('.') {
            Some(idx) if idx > 0 => Some(&base[idx + 1..]),
            _ => None,
        }
    }

    /// The parent path. The root has no parent.
    pub fn parent(&self) -> Option<VirtualPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// True if this path equals `prefix` or lives below it.
    /// Segment-aware: "content/blog" is not a prefix of "content/blogging".
    pub fn has_prefix(&self, prefix: &VirtualPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0
            || (self.0.starts_with(&prefix.0)
                && self.0.as_bytes().get(prefix.0.len()) == Some(&b'/'))
    }

    /// The remainder of this path below `prefix`, if `prefix` applies.
    /// Returns the root path when the two are equal.
    pub fn strip_prefix(&self, prefix: &VirtualPath) -> Option<VirtualPath> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        if !self.has_prefix(prefix) {
            return None;
        }
        if self.0.len() == prefix.0.len() {
            return Some(VirtualPath::root());
        }
        Some(VirtualPath(self.0[prefix.0.len() + 1..].to_string()))
    }

    /// All strict ancestors of this path, longest first.
    /// "a/b/c" yields "a/b", then "a", then the root.
    pub fn ancestors(&self) -> impl Iterator<Item = VirtualPath> + '_ {
        let mut current = self.parent();
        std::iter::from_fn(move || {
            let next = current.take()?;
            current = next.parent();
            Some(next)
        })
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for VirtualPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VirtualPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Cleans a slash-separated path: backslashes become slashes, empty and
/// `.` segments are dropped, `..` pops the previous segment.
fn clean(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}
