//! The capability contract every filesystem layer implements or wraps.
//!
//! Layers compose by wrapping: a decorator, the mount index, the component
//! and language filesystems all present the same small surface and defer
//! to whatever they wrap. Read-oriented composite layers keep the default
//! write surface, which rejects every mutation.

use crate::error::{unsupported, Result};
use crate::types::{FileInfo, VirtualPath};
use std::io;
use std::time::SystemTime;

/// The minimal polymorphic file-access surface.
pub trait FileSystem: Send + Sync {
    /// Returns the descriptor for the given virtual path, following
    /// symlinks.
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo>;

    /// Like [`FileSystem::stat`], but uses lstat when the layer supports
    /// it. The boolean reports whether a true lstat was performed.
    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        self.stat(path).map(|fi| (fi, false))
    }

    /// Opens the file or directory at the given virtual path. The caller
    /// owns the returned handle; it is released on drop.
    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>>;

    /// Reads the full directory listing at the given virtual path.
    fn read_dir(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let mut dir = self.open(path)?;
        dir.read_dir(-1)
    }

    /// Creates (or truncates) a file with the given contents.
    fn create(&self, path: &VirtualPath, _contents: &[u8]) -> Result<()> {
        let _ = path;
        Err(unsupported("create"))
    }

    /// Removes a file or empty directory.
    fn remove(&self, path: &VirtualPath) -> Result<()> {
        let _ = path;
        Err(unsupported("remove"))
    }

    /// Renames a file within the same layer.
    fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        let _ = (from, to);
        Err(unsupported("rename"))
    }

    /// Changes the permission bits of a file.
    fn chmod(&self, path: &VirtualPath, mode: u32) -> Result<()> {
        let _ = (path, mode);
        Err(unsupported("chmod"))
    }

    /// Changes the modification time of a file.
    fn chtimes(&self, path: &VirtualPath, modified: SystemTime) -> Result<()> {
        let _ = (path, modified);
        Err(unsupported("chtimes"))
    }
}

/// An open file or directory handle.
///
/// File handles read bytes through [`io::Read`]; directory handles
/// enumerate entries through [`VfsFile::read_dir`]. Each handle is owned
/// by exactly one caller and released on drop.
pub trait VfsFile: io::Read + Send {
    /// The name the handle was opened under.
    fn name(&self) -> &str;

    /// Reads up to `count` directory entries, continuing where the
    /// previous call left off. A count of zero or less reads everything
    /// remaining. Errors on file handles.
    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let _ = count;
        Err(unsupported("read_dir on a file handle"))
    }
}

/// Paging state shared by the directory handles in this crate: the full
/// listing is computed once, then handed out in `count`-sized slices.
pub(crate) struct DirPager {
    entries: Option<Vec<FileInfo>>,
    pos: usize,
}

impl DirPager {
    pub(crate) fn new() -> Self {
        Self {
            entries: None,
            pos: 0,
        }
    }

    pub(crate) fn next(
        &mut self,
        count: isize,
        fill: impl FnOnce() -> Result<Vec<FileInfo>>,
    ) -> Result<Vec<FileInfo>> {
        if self.entries.is_none() {
            self.entries = Some(fill()?);
        }
        let entries = self.entries.as_deref().unwrap_or_default();
        let remaining = &entries[self.pos.min(entries.len())..];
        let take = if count <= 0 {
            remaining.len()
        } else {
            (count as usize).min(remaining.len())
        };
        let out = remaining[..take].to_vec();
        self.pos += take;
        Ok(out)
    }
}
