//! The physical backend: real I/O under a base directory.

use crate::error::Result;
use crate::traits::{DirPager, FileSystem, VfsFile};
use crate::types::{FileInfo, FileKind, FileMeta, VirtualPath};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// A filesystem rooted at a physical base directory. Virtual paths
/// resolve to real paths under the base; no path ever escapes it because
/// `VirtualPath` resolves `..` segments before they get here.
///
/// Symlinked entries are followed: the descriptor reports the target's
/// kind and size, `filename` is the resolved (canonical) path, and
/// `original_filename` keeps the link itself.
#[derive(Debug, Clone)]
pub struct OsFs {
    base: PathBuf,
}

impl OsFs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        // Canonical from the start, so symlink-cycle detection compares
        // like with like.
        let base = fs::canonicalize(&base).unwrap_or(base);
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn real_path(&self, path: &VirtualPath) -> PathBuf {
        let mut real = self.base.clone();
        for seg in path.segments() {
            real.push(seg);
        }
        real
    }

    fn info_at(&self, path: &VirtualPath, name: &str) -> Result<FileInfo> {
        let real = self.real_path(path);
        let link_md = fs::symlink_metadata(&real)?;
        let is_symlink = link_md.file_type().is_symlink();
        let (md, filename, original_filename) = if is_symlink {
            let md = fs::metadata(&real)?;
            (md, fs::canonicalize(&real)?, Some(real))
        } else {
            (link_md, real, None)
        };
        let kind = if md.is_dir() {
            FileKind::Dir
        } else {
            FileKind::File
        };

        let fs = self.clone();
        let at = path.clone();
        let meta = FileMeta {
            filename: Some(filename),
            original_filename,
            is_symlink,
            opener: Some(Arc::new(move || fs.open(&at))),
            ..Default::default()
        };
        Ok(FileInfo::new(name, kind, md.len(), meta))
    }

    fn list_dir(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let real = self.real_path(path);
        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&real)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            match self.info_at(&path.join(&name), &name) {
                Ok(info) => entries.push(info),
                // A dangling symlink or an entry removed mid-listing.
                Err(err) if err.is_not_exist() => {
                    debug!(path = %path, name = %name, "skipping unresolvable entry");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(entries)
    }
}

impl FileSystem for OsFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        self.info_at(path, path.base_name())
    }

    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        let real = self.real_path(path);
        let md = fs::symlink_metadata(&real)?;
        let is_symlink = md.file_type().is_symlink();
        if is_symlink {
            // Report the resolved entry but remember it was a link.
            let mut info = self.info_at(path, path.base_name())?;
            info.meta_mut().is_symlink = true;
            return Ok((info, true));
        }
        Ok((self.info_at(path, path.base_name())?, true))
    }

    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>> {
        let real = self.real_path(path);
        let md = fs::metadata(&real)?;
        let name = path.base_name().to_string();
        if md.is_dir() {
            Ok(Box::new(OsDir {
                name,
                fs: self.clone(),
                path: path.clone(),
                pager: DirPager::new(),
            }))
        } else {
            Ok(Box::new(OsHandle {
                name,
                file: fs::File::open(&real)?,
            }))
        }
    }

    fn create(&self, path: &VirtualPath, contents: &[u8]) -> Result<()> {
        Ok(fs::write(self.real_path(path), contents)?)
    }

    fn remove(&self, path: &VirtualPath) -> Result<()> {
        let real = self.real_path(path);
        if fs::metadata(&real)?.is_dir() {
            Ok(fs::remove_dir(&real)?)
        } else {
            Ok(fs::remove_file(&real)?)
        }
    }

    fn rename(&self, from: &VirtualPath, to: &VirtualPath) -> Result<()> {
        Ok(fs::rename(self.real_path(from), self.real_path(to))?)
    }

    #[cfg(unix)]
    fn chmod(&self, path: &VirtualPath, mode: u32) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        Ok(fs::set_permissions(
            self.real_path(path),
            fs::Permissions::from_mode(mode),
        )?)
    }

    fn chtimes(&self, path: &VirtualPath, modified: SystemTime) -> Result<()> {
        let file = fs::OpenOptions::new()
            .write(true)
            .open(self.real_path(path))?;
        Ok(file.set_modified(modified)?)
    }
}

struct OsHandle {
    name: String,
    file: fs::File,
}

impl io::Read for OsHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl VfsFile for OsHandle {
    fn name(&self) -> &str {
        &self.name
    }
}

struct OsDir {
    name: String,
    fs: OsFs,
    path: VirtualPath,
    pager: DirPager,
}

impl io::Read for OsDir {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "is a directory"))
    }
}

impl VfsFile for OsDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let fs = self.fs.clone();
        let path = self.path.clone();
        self.pager.next(count, move || fs.list_dir(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_stat_open_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/hello.txt"), b"hello").unwrap();

        let osfs = OsFs::new(dir.path());
        let info = osfs.stat(&VirtualPath::new("sub/hello.txt")).unwrap();
        assert!(!info.is_dir());
        assert_eq!(info.name(), "hello.txt");
        assert_eq!(info.size(), 5);
        assert!(info.meta().filename.is_some());

        let mut handle = osfs.open(&VirtualPath::new("sub/hello.txt")).unwrap();
        let mut buf = String::new();
        handle.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn test_read_dir_sorted_with_paging() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), b"").unwrap();
        fs::write(dir.path().join("a.txt"), b"").unwrap();
        fs::write(dir.path().join("c.txt"), b"").unwrap();

        let osfs = OsFs::new(dir.path());
        let mut handle = osfs.open(&VirtualPath::root()).unwrap();
        let first = handle.read_dir(2).unwrap();
        assert_eq!(
            first.iter().map(|e| e.name()).collect::<Vec<_>>(),
            vec!["a.txt", "b.txt"]
        );
        let rest = handle.read_dir(-1).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].name(), "c.txt");
    }

    #[test]
    fn test_missing_path_is_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let osfs = OsFs::new(dir.path());
        let err = osfs.stat(&VirtualPath::new("nope.txt")).unwrap_err();
        assert!(err.is_not_exist());
    }

    #[test]
    fn test_write_surface() {
        let dir = tempfile::tempdir().unwrap();
        let osfs = OsFs::new(dir.path());
        osfs.create(&VirtualPath::new("new.txt"), b"x").unwrap();
        assert!(dir.path().join("new.txt").exists());
        osfs.rename(&VirtualPath::new("new.txt"), &VirtualPath::new("moved.txt"))
            .unwrap();
        osfs.remove(&VirtualPath::new("moved.txt")).unwrap();
        assert!(!dir.path().join("moved.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
            .unwrap();

        let osfs = OsFs::new(dir.path());
        let (info, true_lstat) = osfs.lstat_if_possible(&VirtualPath::new("link.txt")).unwrap();
        assert!(true_lstat);
        assert!(info.meta().is_symlink);
        assert!(info.meta().original_filename.is_some());
    }
}
