//! The per-component view: classification and the listing order the
//! content discovery walker depends on.

use crate::error::{Result, SiteFsError};
use crate::fs::language::Languages;
use crate::traits::{DirPager, FileSystem, VfsFile};
use crate::types::{Component, ContentClass, FileInfo, VirtualPath};
use std::cmp::Ordering;
use std::io;
use std::sync::Arc;

/// Sorts a directory listing into the order walks and listings present:
/// directories first, then module ordinal (ascending, but descending for
/// i18n so project files are visited after the themes they override),
/// content bundle headers to the top, extension descending, base name
/// ascending, weight descending, and display name as the final tiebreak.
pub fn sort_file_infos(entries: &mut [FileInfo], component: Option<Component>) {
    entries.sort_by(|a, b| compare_file_infos(a, b, component));
}

fn compare_file_infos(a: &FileInfo, b: &FileInfo, component: Option<Component>) -> Ordering {
    let ord = b.is_dir().cmp(&a.is_dir());
    if ord != Ordering::Equal {
        return ord;
    }

    let (ao, bo) = (a.meta().module_ordinal, b.meta().module_ordinal);
    if ao != bo {
        return if component == Some(Component::I18n) {
            bo.cmp(&ao)
        } else {
            ao.cmp(&bo)
        };
    }

    if component == Some(Component::Content) {
        let a_bundle = a.meta().classifier.map_or(false, |c| c.is_bundle());
        let b_bundle = b.meta().classifier.map_or(false, |c| c.is_bundle());
        if a_bundle != b_bundle {
            return b_bundle.cmp(&a_bundle);
        }
    }

    let ord = file_ext(b.name()).cmp(file_ext(a.name()));
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = sort_base(a).cmp(sort_base(b));
    if ord != Ordering::Equal {
        return ord;
    }

    let ord = b.meta().weight.cmp(&a.meta().weight);
    if ord != Ordering::Equal {
        return ord;
    }

    a.name().cmp(b.name())
}

fn file_ext(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[idx + 1..],
        _ => "",
    }
}

fn sort_base(fi: &FileInfo) -> &str {
    if let Some(base) = &fi.meta().translation_base_name {
        return base;
    }
    let name = fi.name();
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Wraps one top-level component's assembled filesystem. Every
/// descriptor gets the component and, for content files, the bundle
/// classifier; files in disabled languages are invisible; listings come
/// out in final order and are marked pre-sorted for the walker.
#[derive(Clone)]
pub struct ComponentFs {
    component: Component,
    languages: Languages,
    inner: Arc<dyn FileSystem>,
}

impl ComponentFs {
    pub fn new(component: Component, inner: Arc<dyn FileSystem>) -> Self {
        Self {
            component,
            languages: Languages::default(),
            inner,
        }
    }

    pub fn with_languages(mut self, languages: Languages) -> Self {
        self.languages = languages;
        self
    }

    pub fn component(&self) -> Component {
        self.component
    }

    fn classify(&self, fi: &mut FileInfo) {
        let is_dir = fi.is_dir();
        let classifier = if self.component == Component::Content && !is_dir {
            Some(ContentClass::classify(fi.name()))
        } else {
            None
        };
        let meta = fi.meta_mut();
        if meta.component.is_none() {
            meta.component = Some(self.component);
        }
        if meta.classifier.is_none() {
            meta.classifier = classifier;
        }
    }

    fn is_visible(&self, fi: &FileInfo) -> bool {
        match &fi.meta().lang {
            Some(lang) => !self.languages.is_disabled(lang),
            None => true,
        }
    }

    fn list(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let raw = self.inner.read_dir(path)?;
        let mut out = Vec::with_capacity(raw.len());
        for mut fi in raw {
            self.classify(&mut fi);
            if self.is_visible(&fi) {
                out.push(fi);
            }
        }
        sort_file_infos(&mut out, Some(self.component));
        for fi in &mut out {
            fi.meta_mut().pre_sorted = true;
        }
        Ok(out)
    }
}

impl FileSystem for ComponentFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        let mut fi = self.inner.stat(path)?;
        self.classify(&mut fi);
        if !self.is_visible(&fi) {
            return Err(SiteFsError::not_found(path));
        }
        Ok(fi)
    }

    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        let (mut fi, true_lstat) = self.inner.lstat_if_possible(path)?;
        self.classify(&mut fi);
        if !self.is_visible(&fi) {
            return Err(SiteFsError::not_found(path));
        }
        Ok((fi, true_lstat))
    }

    fn open(&self, path: &VirtualPath) -> Result<Box<dyn VfsFile>> {
        let fi = self.stat(path)?;
        if !fi.is_dir() {
            return self.inner.open(path);
        }
        Ok(Box::new(ComponentDir {
            name: path.base_name().to_string(),
            fs: self.clone(),
            path: path.clone(),
            pager: DirPager::new(),
        }))
    }
}

struct ComponentDir {
    name: String,
    fs: ComponentFs,
    path: VirtualPath,
    pager: DirPager,
}

impl io::Read for ComponentDir {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "is a directory"))
    }
}

impl VfsFile for ComponentDir {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_dir(&mut self, count: isize) -> Result<Vec<FileInfo>> {
        let fs = self.fs.clone();
        let path = self.path.clone();
        self.pager.next(count, move || fs.list(&path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FileKind, FileMeta};

    fn entry(name: &str, kind: FileKind, ordinal: i32, weight: i32) -> FileInfo {
        let meta = FileMeta {
            module_ordinal: ordinal,
            weight,
            ..Default::default()
        };
        FileInfo::new(name, kind, 0, meta)
    }

    fn names(entries: &[FileInfo]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    #[test]
    fn test_dirs_before_files() {
        let mut entries = vec![
            entry("z.md", FileKind::File, 0, 0),
            entry("adir", FileKind::Dir, 0, 0),
        ];
        sort_file_infos(&mut entries, None);
        assert_eq!(names(&entries), vec!["adir", "z.md"]);
    }

    #[test]
    fn test_module_ordinal_direction() {
        let mut entries = vec![
            entry("a.toml", FileKind::File, 2, 0),
            entry("b.toml", FileKind::File, 1, 0),
        ];
        sort_file_infos(&mut entries, Some(Component::Data));
        assert_eq!(names(&entries), vec!["b.toml", "a.toml"]);

        // i18n walks the least specific module first so later files
        // can override earlier ones.
        let mut entries = vec![
            entry("a.toml", FileKind::File, 2, 0),
            entry("b.toml", FileKind::File, 1, 0),
        ];
        sort_file_infos(&mut entries, Some(Component::I18n));
        assert_eq!(names(&entries), vec!["a.toml", "b.toml"]);
    }

    #[test]
    fn test_content_bundles_first_and_ext_descending() {
        let mut index = entry("_index.md", FileKind::File, 0, 0);
        index.meta_mut().classifier = Some(ContentClass::classify("_index.md"));
        let mut post_md = entry("post.md", FileKind::File, 0, 0);
        post_md.meta_mut().classifier = Some(ContentClass::classify("post.md"));
        let mut post_html = entry("post.html", FileKind::File, 0, 0);
        post_html.meta_mut().classifier = Some(ContentClass::classify("post.html"));

        let mut entries = vec![post_html, post_md, index];
        sort_file_infos(&mut entries, Some(Component::Content));
        // Bundle header first; then ".md" sorts ahead of ".html".
        assert_eq!(names(&entries), vec!["_index.md", "post.md", "post.html"]);
    }

    #[test]
    fn test_weight_breaks_base_ties() {
        let mut entries = vec![
            entry("post.md", FileKind::File, 0, 1),
            entry("post.md", FileKind::File, 0, 2),
        ];
        sort_file_infos(&mut entries, None);
        assert_eq!(entries[0].meta().weight, 2);
    }

    #[test]
    fn test_listing_is_classified_sorted_and_marked() {
        use crate::fs::os::OsFs;
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blog")).unwrap();
        std::fs::write(dir.path().join("blog/_index.md"), b"").unwrap();
        std::fs::write(dir.path().join("blog/zebra.md"), b"").unwrap();
        std::fs::write(dir.path().join("blog/apple.md"), b"").unwrap();

        let fs = ComponentFs::new(Component::Content, Arc::new(OsFs::new(dir.path())));
        let entries = fs.read_dir(&VirtualPath::new("blog")).unwrap();
        assert_eq!(names(&entries), vec!["_index.md", "apple.md", "zebra.md"]);
        assert!(entries.iter().all(|e| e.meta().pre_sorted));
        assert_eq!(
            entries[0].meta().classifier,
            Some(ContentClass::Branch)
        );
        assert_eq!(entries[0].meta().component, Some(Component::Content));
    }
}
