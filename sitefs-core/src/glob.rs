//! Glob patterns over virtual paths, and the pattern-driven walk.
//!
//! `*` and `?` stop at path separators; `**` crosses them. Matching is
//! case-insensitive: both patterns and candidate paths are normalized to
//! lower case before comparison.

use crate::error::{Result, SiteFsError};
use crate::types::{FileInfo, VirtualPath};
use crate::walk::{WalkControl, Walkway};
use crate::FileSystem;
use regex::RegexBuilder;
use std::sync::Arc;

/// A compiled glob pattern. The empty pattern matches nothing.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    regex: Option<regex::Regex>,
    has_double_star: bool,
    segment_count: usize,
    root: VirtualPath,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let raw = normalize(pattern);
        if raw.is_empty() {
            return Ok(Self {
                raw,
                regex: None,
                has_double_star: false,
                segment_count: 0,
                root: VirtualPath::root(),
            });
        }

        let regex = RegexBuilder::new(&translate(&raw))
            .case_insensitive(true)
            .build()
            .map_err(|err| SiteFsError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            })?;

        let segments: Vec<&str> = raw.split('/').collect();
        let literal_prefix: Vec<&str> = segments
            .iter()
            .take_while(|s| !s.contains(['*', '?', '[', '{']))
            .copied()
            .collect();
        // The last literal segment may still be a file name; the walk
        // root must be a directory, so it only counts when segments
        // remain after it.
        let root = if literal_prefix.len() == segments.len() {
            VirtualPath::new(literal_prefix[..literal_prefix.len() - 1].join("/"))
        } else {
            VirtualPath::new(literal_prefix.join("/"))
        };

        Ok(Self {
            has_double_star: raw.contains("**"),
            segment_count: segments.len(),
            root,
            raw,
            regex: Some(regex),
        })
    }

    /// True for the empty pattern, which matches nothing.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// True when the pattern contains a recursive `**` segment.
    pub fn has_double_star(&self) -> bool {
        self.has_double_star
    }

    /// Number of `/`-separated segments in the pattern.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// The non-wildcard prefix to start a walk from.
    pub fn root(&self) -> &VirtualPath {
        &self.root
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(&normalize(path)),
            None => false,
        }
    }
}

fn normalize(pattern: &str) -> String {
    pattern
        .trim_matches('/')
        .replace('\\', "/")
        .to_lowercase()
}

/// Translates a glob into an anchored regular expression.
fn translate(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() + 8);
    re.push('^');
    let mut chars = glob.chars().peekable();
    let mut brace_depth = 0usize;
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    while chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    re.push_str(".*");
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            '[' => {
                re.push('[');
                if let Some(&n) = chars.peek() {
                    if n == '!' || n == '^' {
                        chars.next();
                        re.push('^');
                    }
                }
                for inner in chars.by_ref() {
                    if inner == ']' {
                        re.push(']');
                        break;
                    }
                    re.push(inner);
                }
            }
            '{' => {
                brace_depth += 1;
                re.push_str("(?:");
            }
            '}' if brace_depth > 0 => {
                brace_depth -= 1;
                re.push(')');
            }
            ',' if brace_depth > 0 => re.push('|'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    re
}

/// Walks the filesystem from the pattern's literal root and invokes
/// `handle` for every file matching the pattern. The handler returns
/// true to stop early; early termination is not an error.
pub fn walk<F>(fs: &Arc<dyn FileSystem>, pattern: &str, mut handle: F) -> Result<()>
where
    F: FnMut(&VirtualPath, &FileInfo) -> Result<bool>,
{
    let pattern = GlobPattern::new(pattern)?;
    if pattern.is_empty() {
        return Ok(());
    }

    let root = pattern.root().clone();
    match fs.stat(&root) {
        Ok(_) => {}
        Err(err) if err.is_not_exist() => return Ok(()),
        Err(err) => return Err(err),
    }

    Walkway::new(Arc::clone(fs), root, |path, fi| {
        if fi.is_dir() {
            if !pattern.has_double_star()
                && !path.is_root()
                && path.segment_count() >= pattern.segment_count()
            {
                return Ok(WalkControl::SkipDir);
            }
            return Ok(WalkControl::Continue);
        }
        if pattern.matches(path.as_str()) && handle(path, fi)? {
            return Ok(WalkControl::Stop);
        }
        Ok(WalkControl::Continue)
    })
    .walk()
}
