//! Merging directory listings that claim the same virtual directory.

use crate::error::{Result, SiteFsError};
use crate::traits::{DirPager, FileSystem, VfsFile};
use crate::types::{FileInfo, VirtualPath};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;

/// Merges ordered listings, highest precedence first, under the plain
/// rule: directories are deduplicated by name, files are never
/// deduplicated, so same-named files from different mounts coexist and
/// are told apart downstream by their metadata.
pub fn merge_dir_entries(listings: Vec<Vec<FileInfo>>) -> Vec<FileInfo> {
    let mut out: Vec<FileInfo> = Vec::new();
    let mut seen_dirs: HashSet<String> = HashSet::new();
    for listing in listings {
        for entry in listing {
            if entry.is_dir() && !seen_dirs.insert(entry.name().to_string()) {
                continue;
            }
            out.push(entry);
        }
    }
    out
}

/// Merges ordered listings under the language rule: identity is
/// (name, language), and a collision keeps the entry with the higher
/// precedence weight.
pub fn merge_language_entries(listings: Vec<Vec<FileInfo>>) -> Vec<FileInfo> {
    let mut out: Vec<FileInfo> = Vec::new();
    let mut by_key: HashMap<(String, Option<String>), usize> = HashMap::new();
    for listing in listings {
        for entry in listing {
            let key = (entry.name().to_string(), entry.meta().lang.clone());
            match by_key.get(&key) {
                Some(&idx) => {
                    if entry.meta().weight > out[idx].meta().weight {
                        out[idx] = entry;
                    }
                }
                None => {
                    by_key.insert(key, out.len());
                    out.push(entry);
                }
            }
        }
    }
    out
}

/// An ordered stack of filesystems presented as one. Stat and open go to
/// the first layer that resolves the path; directory listings are merged
/// across all layers under the plain rule.
pub struct OverlayFs {
    layers: Vec<Arc<dyn FileSystem>>,
}

impl OverlayFs {
    /// Layers are given highest precedence first.
    pub fn new(layers: Vec<Arc<dyn FileSystem>>) -> Self {
        Self { layers }
    }

    fn first_hit(&self, path: &VirtualPath) -> Result<(usize, FileInfo)> {
        for (idx, layer) in self.layers.iter().enumerate() {
            match layer.stat(path) {
                Ok(fi) => return Ok((idx, fi)),
                Err(err) if err.is_not_exist() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(SiteFsError::not_found(path))
    }

    fn list_merged(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let mut listings = Vec::new();
        for layer in &self.layers {
            match layer.read_dir(path) {
                Ok(entries) => listings.push(entries),
                Err(err) if err.is_not_exist() => continue,
                Err(err) => return Err(err),
            }
        }
        if listings.is_empty() {
            return Err(SiteFsError::not_found(path));
        }
        Ok(merge_dir_entries(listings))
    }
}

impl FileSystem for OverlayFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        self.first_hit(path).map(|(_, fi)| fi)
    }

    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        for layer in &self.layers {
            match layer.lstat_if_possible(path) {
                Ok(hit) => return Ok(hit),
                Err(err) if err.is_not_exist() => continue,
                Err(err) => return Err(err),
            }
        }
        Err(SiteFsError::not_found(path))
    }

    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>> {
        let (idx, fi) = self.first_hit(path)?;
        if !fi.is_dir() {
            return self.layers[idx].open(path);
        }
        Ok(Box::new(OverlayDir {
            name: path.base_name().to_string(),
            layers: self.layers.clone(),
            path: path.clone(),
            pager: DirPager::new(),
        }))
    }
}

struct OverlayDir {
    name: String,
    layers: Vec<Arc<dyn FileSystem>>,
    path: VirtualPath,
    pager: DirPager,
}

impl io::Read for OverlayDir {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "is a directory"))
    }
}

impl VfsFile for OverlayDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let overlay = OverlayFs {
            layers: self.layers.clone(),
        };
        let path = self.path.clone();
        self.pager.next(count, move || overlay.list_merged(&path))
    }
}
