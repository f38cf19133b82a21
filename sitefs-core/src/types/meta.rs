//! The metadata envelope attached to every file and directory descriptor.

use crate::error::Result;
use crate::glob::GlobPattern;
use crate::traits::VfsFile;
use crate::types::{Component, VirtualPath};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Opens the file or directory a descriptor points at, for lazy re-entry.
pub type FileOpener = Arc<dyn Fn() -> Result<Box<dyn VfsFile>> + Send + Sync>;

/// Content classification of a file inside the content component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// A branch bundle header (`_index.*`).
    Branch,
    /// A leaf bundle header (`index.*`).
    Leaf,
    /// An ordinary content file.
    Content,
    /// Anything else (a resource).
    File,
}

const CONTENT_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdown", "html", "htm", "adoc", "asciidoc", "org", "rst", "txt",
];

impl ContentClass {
    /// Classifies a file by its base name.
    pub fn classify(name: &str) -> ContentClass {
        let (stem, ext) = split_base_ext(name);
        // A language identifier may sit between stem and extension,
        // e.g. "index.sv.md".
        let stem = match stem.rfind('.') {
            Some(idx) => &stem[..idx],
            None => stem,
        };
        if stem == "_index" {
            ContentClass::Branch
        } else if stem == "index" {
            ContentClass::Leaf
        } else if CONTENT_EXTENSIONS.contains(&ext) {
            ContentClass::Content
        } else {
            ContentClass::File
        }
    }

    /// True for the bundle header files that get pulled to the top of a
    /// content directory listing.
    pub fn is_bundle(&self) -> bool {
        matches!(self, ContentClass::Branch | ContentClass::Leaf)
    }
}

fn split_base_ext(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

/// A bidirectional single-name mapping attached to single-file mounts.
///
/// A mount declared as `content/posts/hello.md -> /theme/a.md` becomes a
/// directory mount over `/theme` with a rename rule mapping the virtual
/// name `hello.md` to the real name `a.md` and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    /// The name as seen through the virtual tree.
    pub virtual_name: String,
    /// The name on disk.
    pub real_name: String,
}

impl RenameRule {
    pub fn new(virtual_name: impl Into<String>, real_name: impl Into<String>) -> Self {
        Self {
            virtual_name: virtual_name.into(),
            real_name: real_name.into(),
        }
    }

    /// Maps a virtual name to its on-disk name. Other names pass through.
    pub fn to_real<'a>(&'a self, name: &'a str) -> &'a str {
        if name == self.virtual_name {
            &self.real_name
        } else {
            name
        }
    }

    /// Maps an on-disk name to its virtual name. Other names pass through.
    pub fn to_virtual<'a>(&'a self, name: &'a str) -> &'a str {
        if name == self.real_name {
            &self.virtual_name
        } else {
            name
        }
    }
}

/// Restricts which file names a mount exposes.
///
/// Directories always pass so deeper paths stay navigable; files must
/// match the include patterns (if any) and none of the exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct InclusionFilter {
    include: Vec<GlobPattern>,
    exclude: Vec<GlobPattern>,
    exact: Option<String>,
}

impl InclusionFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<GlobPattern>> {
            patterns.iter().map(|p| GlobPattern::new(p)).collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            exact: None,
        })
    }

    /// A filter admitting exactly one file name, used by single-file mounts.
    pub fn exactly(name: impl Into<String>) -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            exact: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty() && self.exact.is_none()
    }

    pub fn matches(&self, name: &str, is_dir: bool) -> bool {
        if is_dir {
            return true;
        }
        if let Some(exact) = &self.exact {
            return name == exact;
        }
        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(name)) {
            return false;
        }
        !self.exclude.iter().any(|p| p.matches(name))
    }
}

/// The named attributes attached to a descriptor.
///
/// Attributes are set at decoration time and are read-only to downstream
/// consumers, except the weight and language bumps applied once during
/// per-file classification. When a decoration wraps a descriptor that
/// already carries metadata, existing values win and only absent fields
/// are filled in (see [`FileMeta::merge`]).
#[derive(Clone, Default)]
pub struct FileMeta {
    /// The physical filename on disk.
    pub filename: Option<PathBuf>,
    /// The physical filename before symlink resolution.
    pub original_filename: Option<PathBuf>,
    /// The display name, when it differs from the on-disk name.
    pub name: Option<String>,
    /// The logical path within the assembled virtual tree.
    pub path: Option<VirtualPath>,
    /// The language associated with this file, from the filename or the
    /// source mount configuration.
    pub lang: Option<String>,
    /// Precedence weight; higher wins among otherwise-equal entries.
    pub weight: i32,
    /// Ordinal of the owning module in the dependency order.
    pub module_ordinal: i32,
    /// The owning module.
    pub module: Option<String>,
    /// The component this file belongs to.
    pub component: Option<Component>,
    /// True when the file comes from the project itself, not a module.
    pub is_project: bool,
    /// True when the change-watcher should re-scan this mount.
    pub watch: bool,
    /// True when the entry is a symlink.
    pub is_symlink: bool,
    /// Set by hooks to stop descent into a directory.
    pub skip_dir: bool,
    /// Content classification, set for the content component only.
    pub classifier: Option<ContentClass>,
    /// Base filename without extension or language identifiers.
    pub translation_base_name: Option<String>,
    /// Same, with the extension kept.
    pub translation_base_name_with_ext: Option<String>,
    /// Languages of the sibling translations of this file.
    pub translations: Option<Vec<String>>,
    /// Name mapping attached to single-file mounts.
    pub rename: Option<RenameRule>,
    /// File name restriction attached to the owning mount.
    pub inclusion_filter: Option<InclusionFilter>,
    /// The physical root of the owning mount.
    pub source_root: Option<PathBuf>,
    /// Opener for lazy re-entry, set for directories.
    pub opener: Option<FileOpener>,
    /// True when a directory listing is already in its final order.
    pub pre_sorted: bool,
}

impl FileMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills in only the fields this meta does not already carry.
    /// First writer wins; an outer decoration never overwrites inner values.
    pub fn merge(&mut self, from: &FileMeta) {
        if self.filename.is_none() {
            self.filename = from.filename.clone();
        }
        if self.original_filename.is_none() {
            self.original_filename = from.original_filename.clone();
        }
        if self.name.is_none() {
            self.name = from.name.clone();
        }
        if self.path.is_none() {
            self.path = from.path.clone();
        }
        if self.lang.is_none() {
            self.lang = from.lang.clone();
        }
        if self.weight == 0 {
            self.weight = from.weight;
        }
        if self.module_ordinal == 0 {
            self.module_ordinal = from.module_ordinal;
        }
        if self.module.is_none() {
            self.module = from.module.clone();
        }
        if self.component.is_none() {
            self.component = from.component;
        }
        if !self.is_project {
            self.is_project = from.is_project;
        }
        if !self.watch {
            self.watch = from.watch;
        }
        if !self.is_symlink {
            self.is_symlink = from.is_symlink;
        }
        if self.classifier.is_none() {
            self.classifier = from.classifier;
        }
        if self.translation_base_name.is_none() {
            self.translation_base_name = from.translation_base_name.clone();
        }
        if self.translation_base_name_with_ext.is_none() {
            self.translation_base_name_with_ext = from.translation_base_name_with_ext.clone();
        }
        if self.translations.is_none() {
            self.translations = from.translations.clone();
        }
        if self.rename.is_none() {
            self.rename = from.rename.clone();
        }
        if self.inclusion_filter.is_none() {
            self.inclusion_filter = from.inclusion_filter.clone();
        }
        if self.source_root.is_none() {
            self.source_root = from.source_root.clone();
        }
        if self.opener.is_none() {
            self.opener = from.opener.clone();
        }
    }

    /// Opens the underlying file or directory.
    pub fn open(&self) -> Result<Box<dyn VfsFile>> {
        match &self.opener {
            Some(opener) => opener(),
            None => Err(crate::error::unsupported("open: no opener set")),
        }
    }
}

impl fmt::Debug for FileMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMeta")
            .field("filename", &self.filename)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("lang", &self.lang)
            .field("weight", &self.weight)
            .field("module_ordinal", &self.module_ordinal)
            .field("module", &self.module)
            .field("component", &self.component)
            .field("is_project", &self.is_project)
            .field("watch", &self.watch)
            .field("is_symlink", &self.is_symlink)
            .field("classifier", &self.classifier)
            .field("opener", &self.opener.as_ref().map(|_| "..."))
            .finish()
    }
}
