//! Mount declarations and the resolved mounts built from them.

use crate::traits::FileSystem;
use crate::types::{Component, FileMeta, VirtualPath};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A mount declaration as supplied by the module/theme resolution
/// collaborator. Paths are absolute by the time they reach this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountDecl {
    /// The physical directory or file to mount.
    pub source: PathBuf,
    /// The virtual path to mount it at. The first segment names the
    /// component ("content/blog", "static", ...).
    pub target: String,
    /// The language this mount supplies, if any.
    #[serde(default)]
    pub lang: Option<String>,
    /// The owning module.
    #[serde(default)]
    pub module: Option<String>,
    /// Ordinal of the owning module in the dependency order.
    #[serde(default)]
    pub module_ordinal: i32,
    /// True when the mount comes from the project itself.
    #[serde(default)]
    pub is_project: bool,
    /// True when the change-watcher should re-scan this mount.
    #[serde(default)]
    pub watch: bool,
    /// Glob patterns restricting which file names the mount exposes.
    #[serde(default)]
    pub include_files: Vec<String>,
    #[serde(default)]
    pub exclude_files: Vec<String>,
}

impl MountDecl {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            lang: None,
            module: None,
            module_ordinal: 0,
            is_project: false,
            watch: false,
            include_files: Vec::new(),
            exclude_files: Vec::new(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>, ordinal: i32) -> Self {
        self.module = Some(module.into());
        self.module_ordinal = ordinal;
        self
    }

    pub fn project(mut self) -> Self {
        self.is_project = true;
        self
    }

    pub fn watched(mut self) -> Self {
        self.watch = true;
        self
    }
}

/// A resolved mount: a virtual prefix mapped onto a physical directory
/// root, with the metadata every descriptor below it inherits.
///
/// Built once at startup and immutable afterward. Single-file mounts are
/// normalized to directory mounts during construction, so `to` always
/// names a directory.
#[derive(Clone)]
pub struct Mount {
    /// The cleaned virtual prefix, e.g. "content/blog".
    pub from: VirtualPath,
    /// The component named by the first segment of `from`.
    pub component: Component,
    /// The physical directory root.
    pub to: PathBuf,
    /// For normalized single-file mounts: the real file name inside `to`.
    pub to_base: Option<String>,
    /// Metadata inherited by every descriptor resolved through this mount.
    pub meta: FileMeta,
    /// The capability-contract view of this mount's physical tree.
    pub(crate) fs: Arc<dyn FileSystem>,
}

impl Mount {
    /// The path inside the component, e.g. "blog" for "content/blog".
    pub fn path_in_component(&self) -> VirtualPath {
        self.from
            .strip_prefix(&VirtualPath::new(self.component.as_str()))
            .unwrap_or_else(VirtualPath::root)
    }
}

impl fmt::Debug for Mount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mount")
            .field("from", &self.from)
            .field("component", &self.component)
            .field("to", &self.to)
            .field("to_base", &self.to_base)
            .field("lang", &self.meta.lang)
            .field("module_ordinal", &self.meta.module_ordinal)
            .finish()
    }
}

/// The result of a reverse lookup: the logical location corresponding to
/// a physical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPath {
    pub component: Component,
    /// The path relative to the component root, e.g. "blog/post.md".
    pub path: VirtualPath,
    pub lang: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_builder() {
        let decl = MountDecl::new("/themes/a/blog", "content/blog")
            .with_lang("sv")
            .with_module("theme-a", 2)
            .watched();
        assert_eq!(decl.lang.as_deref(), Some("sv"));
        assert_eq!(decl.module_ordinal, 2);
        assert!(decl.watch);
        assert!(!decl.is_project);
    }
}
