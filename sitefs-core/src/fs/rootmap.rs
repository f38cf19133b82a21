//! The mount index: many physical roots assembled into one virtual tree.
//!
//! Mounts are declared in precedence order and indexed both ways: by
//! virtual prefix for resolution and by physical prefix for reverse
//! lookup. The index is immutable after construction; `filter` derives
//! an independent narrowed index over the same mounts.

use crate::error::{Result, SiteFsError};
use crate::fs::os::OsFs;
use crate::fs::overlay::merge_dir_entries;
use crate::traits::{DirPager, FileSystem, VfsFile};
use crate::types::{
    decorate_file_info, Component, ComponentPath, FileInfo, FileKind, FileMeta, FileOpener,
    InclusionFilter, Mount, MountDecl, RenameRule, VirtualPath,
};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct RootMappingFs {
    mounts: Arc<Vec<Mount>>,
    // Active mount indices, declaration order. `filter` narrows this
    // without touching the mounts themselves.
    order: Vec<usize>,
    virt: BTreeMap<String, Vec<usize>>,
    phys: BTreeMap<String, Vec<usize>>,
}

impl fmt::Debug for RootMappingFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootMappingFs")
            .field("mounts", &self.mounts)
            .field("order", &self.order)
            .finish()
    }
}

impl RootMappingFs {
    /// Builds the index from the declared mounts. Mounts whose source
    /// does not exist are skipped; a source that is a file becomes a
    /// directory mount over its parent with a rename rule and an
    /// inclusion filter admitting exactly that file.
    pub fn new(decls: &[MountDecl]) -> Result<Self> {
        let mut mounts = Vec::new();
        for decl in decls {
            if let Some(mount) = build_mount(decl)? {
                mounts.push(mount);
            }
        }
        let order: Vec<usize> = (0..mounts.len()).collect();
        let (virt, phys) = build_indices(&mounts, &order);
        Ok(Self {
            mounts: Arc::new(mounts),
            order,
            virt,
            phys,
        })
    }

    /// Derives an independent index keeping only the mounts the
    /// predicate accepts. A pure projection: filtering twice with the
    /// same predicate equals filtering once.
    pub fn filter(&self, predicate: impl Fn(&Mount) -> bool) -> RootMappingFs {
        let order: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&i| predicate(&self.mounts[i]))
            .collect();
        let (virt, phys) = build_indices(&self.mounts, &order);
        RootMappingFs {
            mounts: Arc::clone(&self.mounts),
            order,
            virt,
            phys,
        }
    }

    /// Descriptors for the roots of every mount in the given component,
    /// declaration order.
    pub fn mounts(&self, component: Component) -> Vec<FileInfo> {
        self.mounts_under(&VirtualPath::new(component.as_str()))
    }

    /// Descriptors for the roots of every mount at or below the given
    /// virtual prefix, declaration order.
    pub fn mounts_under(&self, prefix: &VirtualPath) -> Vec<FileInfo> {
        self.order
            .iter()
            .filter_map(|&i| {
                let mount = &self.mounts[i];
                mount
                    .from
                    .has_prefix(prefix)
                    .then(|| self.mount_root_info(mount, &mount.from))
            })
            .collect()
    }

    /// Maps a physical path back to the logical locations exposing it.
    /// More than one result when several mounts cover the same physical
    /// subtree.
    pub fn reverse_lookup(&self, physical: impl AsRef<Path>) -> Vec<ComponentPath> {
        self.reverse_lookup_filtered(physical.as_ref(), None)
    }

    pub fn reverse_lookup_component(
        &self,
        component: Component,
        physical: impl AsRef<Path>,
    ) -> Vec<ComponentPath> {
        self.reverse_lookup_filtered(physical.as_ref(), Some(component))
    }

    fn reverse_lookup_filtered(
        &self,
        physical: &Path,
        component: Option<Component>,
    ) -> Vec<ComponentPath> {
        let key = phys_key(physical);
        let mut results = Vec::new();
        for (prefix, idxs) in &self.phys {
            if !path_str_has_prefix(&key, prefix) {
                continue;
            }
            let rel = key[prefix.len()..].trim_start_matches('/');
            for &i in idxs {
                let mount = &self.mounts[i];
                if component.is_some_and(|c| mount.component != c) {
                    continue;
                }
                let rel_virtual = match &mount.to_base {
                    // Single-file mounts map only their one file back.
                    Some(base) if rel != base => continue,
                    Some(_) => match &mount.meta.rename {
                        Some(rule) => VirtualPath::new(&rule.virtual_name),
                        None => VirtualPath::new(rel),
                    },
                    None => VirtualPath::new(rel),
                };
                let full = mount.from.join(rel_virtual.as_str());
                let path = full
                    .strip_prefix(&VirtualPath::new(mount.component.as_str()))
                    .unwrap_or_else(VirtualPath::root);
                results.push(ComponentPath {
                    component: mount.component,
                    path,
                    lang: mount.meta.lang.clone(),
                });
            }
        }
        results
    }

    // Resolution per virtual path: exact mounts, then a virtual-only
    // directory if some mount lives deeper, then ancestor resolution.
    // Candidates come back highest precedence first.
    fn resolve(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let mut results: Vec<FileInfo> = Vec::new();

        if let Some(idxs) = self.virt.get(path.as_str()) {
            for &i in idxs {
                results.push(self.mount_root_info(&self.mounts[i], path));
            }
        }

        if results.is_empty() && self.has_mount_below(path) {
            results.push(self.synthetic_dir(path));
        }

        if results.is_empty() && path.segment_count() >= 2 {
            for ancestor in path.ancestors() {
                if ancestor.is_root() {
                    break;
                }
                let Some(idxs) = self.virt.get(ancestor.as_str()) else {
                    continue;
                };
                let Some(rel) = path.strip_prefix(&ancestor) else {
                    continue;
                };
                for &i in idxs {
                    if let Some(fi) = self.stat_in_mount(&self.mounts[i], &rel, path)? {
                        results.push(fi);
                    }
                }
                if !results.is_empty() {
                    break;
                }
            }
        }

        if results.is_empty() {
            return Err(SiteFsError::not_found(path));
        }

        // Directories and files claiming the same virtual path cannot be
        // merged meaningfully; treat the set as unresolvable.
        let dirs = results.iter().filter(|fi| fi.is_dir()).count();
        if dirs != 0 && dirs != results.len() {
            return Err(SiteFsError::not_found(path));
        }
        Ok(results)
    }

    fn has_mount_below(&self, path: &VirtualPath) -> bool {
        if path.is_root() {
            return !self.virt.is_empty();
        }
        let prefix = format!("{}/", path.as_str());
        self.virt
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    fn stat_in_mount(
        &self,
        mount: &Mount,
        rel: &VirtualPath,
        virt: &VirtualPath,
    ) -> Result<Option<FileInfo>> {
        let real_rel = match &mount.meta.rename {
            Some(rule) if rel.segment_count() == 1 => VirtualPath::new(rule.to_real(rel.as_str())),
            _ => rel.clone(),
        };
        match mount.fs.stat(&real_rel) {
            Ok(fi) => {
                if !fi.is_dir() {
                    if let Some(filter) = &mount.meta.inclusion_filter {
                        if !filter.matches(real_rel.base_name(), false) {
                            return Ok(None);
                        }
                    }
                }
                Ok(Some(self.decorate_resolved(mount, virt, fi)))
            }
            Err(err) if err.is_not_exist() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn decorate_resolved(&self, mount: &Mount, virt: &VirtualPath, mut fi: FileInfo) -> FileInfo {
        if fi.name() != virt.base_name() {
            fi.meta_mut().name = Some(virt.base_name().to_string());
        }
        // Directory re-entry must go through the index again so
        // overlapping mounts keep merging at every depth.
        let opener = fi.is_dir().then(|| self.dir_opener(virt));
        fi.meta_mut().path = Some(virt.clone());
        decorate_file_info(&mut fi, None, opener, &mount.meta);
        fi
    }

    fn mount_root_info(&self, mount: &Mount, path: &VirtualPath) -> FileInfo {
        let mut meta = mount.meta.clone();
        meta.filename = Some(mount.to.clone());
        meta.path = Some(path.clone());
        meta.opener = Some(self.dir_opener(path));
        FileInfo::new(path.base_name(), FileKind::Dir, 0, meta)
    }

    fn synthetic_dir(&self, path: &VirtualPath) -> FileInfo {
        let meta = FileMeta {
            path: Some(path.clone()),
            opener: Some(self.dir_opener(path)),
            ..Default::default()
        };
        FileInfo::dir_name_only(path.base_name(), meta)
    }

    fn dir_opener(&self, path: &VirtualPath) -> FileOpener {
        let fs = self.clone();
        let path = path.clone();
        Arc::new(move || {
            Ok(Box::new(RootMappingDir {
                name: path.base_name().to_string(),
                fs: fs.clone(),
                path: path.clone(),
                pager: DirPager::new(),
            }) as Box<dyn VfsFile>)
        })
    }

    // The three listing sources for a virtual directory, first source
    // wins by name: mounts rooted here (files never deduplicated),
    // synthetic first segments of deeper mounts in declaration order,
    // and physical sub-directories of ancestor mounts.
    fn collect_dir_entries(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let mut out: Vec<FileInfo> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if let Some(idxs) = self.virt.get(path.as_str()) {
            let mut listings = Vec::new();
            for &i in idxs {
                listings.push(self.list_mount(&self.mounts[i], &VirtualPath::root(), path)?);
            }
            for entry in merge_dir_entries(listings) {
                seen.insert(entry.name().to_string());
                out.push(entry);
            }
        }

        for &i in &self.order {
            let mount = &self.mounts[i];
            if mount.from == *path || !mount.from.has_prefix(path) {
                continue;
            }
            let rel = mount.from.strip_prefix(path);
            let Some(first) = rel.as_ref().and_then(|r| r.first_segment()) else {
                continue;
            };
            if seen.insert(first.to_string()) {
                out.push(self.synthetic_dir(&path.join(first)));
            }
        }

        for ancestor in path.ancestors() {
            if ancestor.is_root() {
                break;
            }
            let Some(idxs) = self.virt.get(ancestor.as_str()) else {
                continue;
            };
            let Some(rel) = path.strip_prefix(&ancestor) else {
                continue;
            };
            let mut listings = Vec::new();
            for &i in idxs {
                match self.list_mount(&self.mounts[i], &rel, path) {
                    Ok(entries) => listings.push(entries),
                    Err(err) if err.is_not_exist() => continue,
                    Err(err) => return Err(err),
                }
            }
            // Same-named files from sibling mounts coexist; only names
            // claimed by an earlier source are dropped.
            let mut level_names = Vec::new();
            for entry in merge_dir_entries(listings) {
                if seen.contains(entry.name()) {
                    continue;
                }
                level_names.push(entry.name().to_string());
                out.push(entry);
            }
            seen.extend(level_names);
        }

        Ok(out)
    }

    fn list_mount(
        &self,
        mount: &Mount,
        rel: &VirtualPath,
        dir_virtual: &VirtualPath,
    ) -> Result<Vec<FileInfo>> {
        let raw = mount.fs.read_dir(rel)?;
        let mut out = Vec::with_capacity(raw.len());
        for mut fi in raw {
            if !fi.is_dir() {
                if let Some(filter) = &mount.meta.inclusion_filter {
                    if !filter.matches(fi.real_name(), false) {
                        continue;
                    }
                }
            }
            if rel.is_root() {
                if let Some(rule) = &mount.meta.rename {
                    let virtual_name = rule.to_virtual(fi.real_name());
                    if virtual_name != fi.real_name() {
                        let virtual_name = virtual_name.to_string();
                        fi.meta_mut().name = Some(virtual_name);
                    }
                }
            }
            let virt = dir_virtual.join(fi.name());
            out.push(self.decorate_resolved(mount, &virt, fi));
        }
        Ok(out)
    }
}

impl FileSystem for RootMappingFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        let mut results = self.resolve(path)?;
        Ok(results.remove(0))
    }

    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>> {
        self.stat(path)?.open()
    }
}

struct RootMappingDir {
    name: String,
    fs: RootMappingFs,
    path: VirtualPath,
    pager: DirPager,
}

impl io::Read for RootMappingDir {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "is a directory"))
    }
}

impl VfsFile for RootMappingDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let fs = self.fs.clone();
        let path = self.path.clone();
        self.pager.next(count, move || fs.collect_dir_entries(&path))
    }
}

fn build_mount(decl: &MountDecl) -> Result<Option<Mount>> {
    let from = VirtualPath::new(&decl.target);
    let invalid = |reason: &str| SiteFsError::InvalidMount {
        from: decl.target.clone(),
        to: decl.source.display().to_string(),
        reason: reason.to_string(),
    };

    let component_name = from.first_segment().ok_or_else(|| invalid("empty mount target"))?;
    let component: Component = component_name
        .parse()
        .map_err(|_: String| invalid("target does not start with a component"))?;
    if decl.source.as_os_str().len() < 2 {
        return Err(invalid("source path too short"));
    }

    let md = match std::fs::metadata(&decl.source) {
        Ok(md) => md,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(
                source = %decl.source.display(),
                target = %decl.target,
                "skipping mount with missing source"
            );
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let (from, to, to_base, rename, filter) = if md.is_dir() {
        let filter = if decl.include_files.is_empty() && decl.exclude_files.is_empty() {
            None
        } else {
            Some(InclusionFilter::new(
                &decl.include_files,
                &decl.exclude_files,
            )?)
        };
        (from, decl.source.clone(), None, None, filter)
    } else {
        let real_name = decl
            .source
            .file_name()
            .ok_or_else(|| invalid("file mount without a file name"))?
            .to_string_lossy()
            .into_owned();
        let virtual_name = from.base_name().to_string();
        let parent = decl
            .source
            .parent()
            .ok_or_else(|| invalid("file mount without a parent directory"))?
            .to_path_buf();
        let dir_from = from.parent().unwrap_or_else(VirtualPath::root);
        (
            dir_from,
            parent,
            Some(real_name.clone()),
            Some(RenameRule::new(virtual_name, real_name.clone())),
            Some(InclusionFilter::exactly(real_name)),
        )
    };

    let meta = FileMeta {
        lang: decl.lang.clone(),
        module: decl.module.clone(),
        module_ordinal: decl.module_ordinal,
        component: Some(component),
        is_project: decl.is_project,
        watch: decl.watch,
        rename,
        inclusion_filter: filter,
        source_root: Some(to.clone()),
        ..Default::default()
    };
    let fs: Arc<dyn FileSystem> = Arc::new(OsFs::new(&to));
    Ok(Some(Mount {
        from,
        component,
        to,
        to_base,
        meta,
        fs,
    }))
}

fn build_indices(
    mounts: &[Mount],
    order: &[usize],
) -> (BTreeMap<String, Vec<usize>>, BTreeMap<String, Vec<usize>>) {
    let mut virt: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let mut phys: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for &i in order {
        let mount = &mounts[i];
        virt.entry(mount.from.as_str().to_string())
            .or_default()
            .push(i);
        phys.entry(phys_key(&mount.to)).or_default().push(i);
    }
    (virt, phys)
}

fn phys_key(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .trim_end_matches('/')
        .to_string()
}

fn path_str_has_prefix(s: &str, prefix: &str) -> bool {
    s == prefix || (s.starts_with(prefix) && s.as_bytes().get(prefix.len()) == Some(&b'/'))
}
