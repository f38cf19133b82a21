//! The decorator layer: attaches metadata to descriptors as they pass
//! through, without touching payload.

use crate::error::{Result, SiteFsError};
use crate::traits::{FileSystem, VfsFile};
use crate::types::{FileInfo, FileMeta, VirtualPath};
use std::io;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Runs once per descriptor, after the logical path has been filled in.
pub type DecorateFn = Arc<dyn Fn(&VirtualPath, &mut FileInfo) -> Result<()> + Send + Sync>;

/// Wraps any filesystem and decorates every descriptor it produces:
/// stat results, lstat results, and directory-listing entries alike.
///
/// Existing metadata always wins; the decoration only fills gaps. A
/// hardening variant refuses symlinked entries outright.
pub struct DecoratorFs {
    inner: Arc<dyn FileSystem>,
    decorate: DecorateFn,
    allow_symlinks: bool,
}

impl DecoratorFs {
    pub fn new(inner: Arc<dyn FileSystem>, decorate: DecorateFn) -> Self {
        Self {
            inner,
            decorate,
            allow_symlinks: true,
        }
    }

    /// A decorator that merges one fixed metadata record into every
    /// descriptor.
    pub fn with_meta(inner: Arc<dyn FileSystem>, meta: FileMeta) -> Self {
        Self::new(
            inner,
            Arc::new(move |_path, fi: &mut FileInfo| {
                fi.meta_mut().merge(&meta);
                Ok(())
            }),
        )
    }

    /// Refuse symlinked entries with [`SiteFsError::SymlinkNotAllowed`].
    /// Walks treat that as "entry absent".
    pub fn deny_symlinks(mut self) -> Self {
        self.allow_symlinks = false;
        self
    }

    fn apply(&self, path: &VirtualPath, mut fi: FileInfo) -> Result<FileInfo> {
        if !self.allow_symlinks && fi.meta().is_symlink {
            return Err(SiteFsError::SymlinkNotAllowed {
                filename: path.to_string(),
            });
        }
        if fi.meta().path.is_none() {
            fi.meta_mut().path = Some(path.clone());
        }
        (self.decorate)(path, &mut fi)?;
        Ok(fi)
    }
}

impl FileSystem for DecoratorFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        let fi = self.inner.stat(path)?;
        self.apply(path, fi)
    }

    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        let (fi, true_lstat) = self.inner.lstat_if_possible(path)?;
        Ok((self.apply(path, fi)?, true_lstat))
    }

    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>> {
        let inner = self.inner.open(path)?;
        Ok(Box::new(DecoratedHandle {
            inner,
            path: path.clone(),
            decorate: self.decorate.clone(),
            allow_symlinks: self.allow_symlinks,
        }))
    }

    fn create(&self, path: &VirtualPath, contents: &[u8]) -> Result<()> {
        self.inner.create(path, contents)
    }

    fn remove(&self, path: &VirtualPath) -> Result<()> {
        self.inner.remove(path)
    }

    fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        self.inner.rename(from, to)
    }

    fn chmod(&self, path: &VirtualPath, mode: u32) -> Result<()> {
        self.inner.chmod(path, mode)
    }

    fn chtimes(&self, path: &VirtualPath, modified: SystemTime) -> Result<()> {
        self.inner.chtimes(path, modified)
    }
}

struct DecoratedHandle {
    inner: Box<dyn VfsFile>,
    path: VirtualPath,
    decorate: DecorateFn,
    allow_symlinks: bool,
}

impl io::Read for DecoratedHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl VfsFile for DecoratedHandle {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let raw = self.inner.read_dir(count)?;
        let mut out = Vec::with_capacity(raw.len());
        for mut fi in raw {
            let child = self.path.join(fi.real_name());
            if !self.allow_symlinks && fi.meta().is_symlink {
                debug!(path = %child, "dropping symlinked entry");
                continue;
            }
            if fi.meta().path.is_none() {
                fi.meta_mut().path = Some(child.clone());
            }
            (self.decorate)(&child, &mut fi)?;
            out.push(fi);
        }
        Ok(out)
    }
}
