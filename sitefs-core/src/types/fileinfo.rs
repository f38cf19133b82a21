//! File and directory descriptors with attached metadata.

use crate::error::Result;
use crate::traits::VfsFile;
use crate::types::{FileMeta, FileOpener};
use std::path::PathBuf;

/// Whether a descriptor points at a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
}

/// A file or directory descriptor: the unit every layer produces and
/// consumes. Carries the metadata envelope; directories additionally
/// carry an opener for lazy re-entry.
#[derive(Debug, Clone)]
pub struct FileInfo {
    name: String,
    kind: FileKind,
    size: u64,
    meta: FileMeta,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, kind: FileKind, size: u64, meta: FileMeta) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            meta,
        }
    }

    /// A directory-only placeholder descriptor: a navigable ancestor of a
    /// deeper mount that has no physical counterpart itself.
    pub fn dir_name_only(name: impl Into<String>, meta: FileMeta) -> Self {
        Self {
            name: name.into(),
            kind: FileKind::Dir,
            size: 0,
            meta,
        }
    }

    /// The display name: the renamed name when one is set, else the
    /// on-disk name.
    pub fn name(&self) -> &str {
        match &self.meta.name {
            Some(name) => name,
            None => &self.name,
        }
    }

    /// The on-disk name, unaffected by rename rules.
    pub fn real_name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn meta(&self) -> &FileMeta {
        &self.meta
    }

    pub(crate) fn meta_mut(&mut self) -> &mut FileMeta {
        &mut self.meta
    }

    /// Opens the file or directory this descriptor points at.
    pub fn open(&self) -> Result<Box<dyn VfsFile>> {
        self.meta.open()
    }
}

/// Attaches filename and opener to a descriptor and fills in any metadata
/// it does not already carry. Existing metadata always wins.
pub fn decorate_file_info(
    fi: &mut FileInfo,
    filename: Option<PathBuf>,
    opener: Option<FileOpener>,
    in_meta: &FileMeta,
) {
    if let Some(opener) = opener {
        fi.meta.opener = Some(opener);
    }
    if let Some(filename) = filename {
        if fi.meta.filename.is_none() {
            fi.meta.filename = Some(filename);
        }
    }
    fi.meta.merge(in_meta);
}
