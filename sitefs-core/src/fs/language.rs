//! Language classification and language-aware filtering.
//!
//! A file name may embed a language between stem and extension
//! ("post.en.md"). When it names a known language it overrides the
//! language inherited from the mount, and bumps the entry's precedence
//! weight so the more specific variant wins overlay collisions.

use crate::error::{Result, SiteFsError};
use crate::fs::overlay::merge_language_entries;
use crate::traits::{DirPager, FileSystem, VfsFile};
use crate::types::{FileInfo, VirtualPath};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::sync::Arc;

/// The configured language set and the globally-disabled subset.
#[derive(Debug, Clone, Default)]
pub struct Languages {
    known: BTreeSet<String>,
    disabled: HashSet<String>,
}

impl Languages {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            disabled: HashSet::new(),
        }
    }

    pub fn disable(mut self, lang: impl Into<String>) -> Self {
        self.disabled.insert(lang.into());
        self
    }

    pub fn is_known(&self, lang: &str) -> bool {
        self.known.contains(lang)
    }

    pub fn is_disabled(&self, lang: &str) -> bool {
        self.disabled.contains(lang)
    }
}

/// Language details extracted from one file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangInfo {
    /// The effective language: from the filename when present, else the
    /// owning filesystem's.
    pub lang: String,
    /// 1 when the filename carries a language, 2 when that language is
    /// also the filesystem's own, 0 otherwise.
    pub weight: i32,
    /// The file stem with extension and language identifier removed.
    pub translation_base_name: String,
    /// Same, with the extension kept.
    pub translation_base_name_with_ext: String,
}

/// Extracts the language embedded in `name`, falling back to `fs_lang`.
/// A file that ends up with no language at all is a configuration error.
pub fn lang_info_from(name: &str, fs_lang: Option<&str>, languages: &Languages) -> Result<LangInfo> {
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    };

    let (base, file_lang) = match stem.rfind('.') {
        Some(idx) if languages.is_known(&stem[idx + 1..]) => {
            (&stem[..idx], Some(stem[idx + 1..].to_string()))
        }
        _ => (stem, None),
    };

    let weight = match &file_lang {
        Some(lang) if Some(lang.as_str()) == fs_lang => 2,
        Some(_) => 1,
        None => 0,
    };

    let lang = match file_lang.or_else(|| fs_lang.map(str::to_string)) {
        Some(lang) => lang,
        None => {
            return Err(SiteFsError::UnknownLanguage {
                filename: name.to_string(),
            })
        }
    };

    let translation_base_name_with_ext = match ext {
        Some(ext) => format!("{base}.{ext}"),
        None => base.to_string(),
    };
    Ok(LangInfo {
        lang,
        weight,
        translation_base_name: base.to_string(),
        translation_base_name_with_ext,
    })
}

/// Records, on every file in the listing, the sorted and deduplicated
/// list of languages its translation group spans.
pub fn attach_translations(entries: &mut [FileInfo]) {
    let mut groups: HashMap<String, BTreeSet<String>> = HashMap::new();
    for entry in entries.iter() {
        if entry.is_dir() {
            continue;
        }
        if let (Some(base), Some(lang)) = (
            entry.meta().translation_base_name.clone(),
            entry.meta().lang.clone(),
        ) {
            groups.entry(base).or_default().insert(lang);
        }
    }
    for entry in entries.iter_mut() {
        if entry.is_dir() {
            continue;
        }
        if let Some(base) = entry.meta().translation_base_name.clone() {
            if let Some(langs) = groups.get(&base) {
                entry.meta_mut().translations = Some(langs.iter().cloned().collect());
            }
        }
    }
}

/// A filesystem bound to one language. Every file descriptor it produces
/// is language-classified; files in disabled languages are invisible.
#[derive(Clone)]
pub struct LanguageFs {
    lang: String,
    languages: Languages,
    inner: Arc<dyn FileSystem>,
}

impl LanguageFs {
    pub fn new(lang: impl Into<String>, languages: Languages, inner: Arc<dyn FileSystem>) -> Self {
        Self {
            lang: lang.into(),
            languages,
            inner,
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    fn classify(&self, fi: &mut FileInfo) -> Result<()> {
        if fi.is_dir() {
            if fi.meta().lang.is_none() {
                fi.meta_mut().lang = Some(self.lang.clone());
            }
            return Ok(());
        }
        // The mount's language, when set, beats the filesystem's own.
        let fallback = fi
            .meta()
            .lang
            .clone()
            .unwrap_or_else(|| self.lang.clone());
        let info = lang_info_from(fi.name(), Some(&fallback), &self.languages)?;
        let meta = fi.meta_mut();
        meta.lang = Some(info.lang);
        if info.weight != 0 {
            meta.weight = info.weight;
        }
        if meta.translation_base_name.is_none() {
            meta.translation_base_name = Some(info.translation_base_name);
            meta.translation_base_name_with_ext = Some(info.translation_base_name_with_ext);
        }
        Ok(())
    }

    fn is_visible(&self, fi: &FileInfo) -> bool {
        match &fi.meta().lang {
            Some(lang) => !self.languages.is_disabled(lang),
            None => true,
        }
    }

    fn list(&self, path: &VirtualPath) -> Result<Vec<FileInfo>> {
        let raw = self.inner.read_dir(path)?;
        let mut classified = Vec::with_capacity(raw.len());
        for mut fi in raw {
            self.classify(&mut fi)?;
            if self.is_visible(&fi) {
                classified.push(fi);
            }
        }
        // Overlapping mounts can supply the same (name, language) twice;
        // the higher-weight variant wins the collision.
        let mut out = merge_language_entries(vec![classified]);
        attach_translations(&mut out);
        Ok(out)
    }
}

impl FileSystem for LanguageFs {
    fn stat(&self, path: &VirtualPath) -> Result<FileInfo> {
        let mut fi = self.inner.stat(path)?;
        self.classify(&mut fi)?;
        if !self.is_visible(&fi) {
            return Err(SiteFsError::not_found(path));
        }
        Ok(fi)
    }

    fn lstat_if_possible(&self, path: &VirtualPath) -> Result<(FileInfo, bool)> {
        let (mut fi, true_lstat) = self.inner.lstat_if_possible(path)?;
        self.classify(&mut fi)?;
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
        Ok(Box::new(LangDir {
            name: path.base_name().to_string(),
            fs: self.clone(),
            path: path.clone(),
            pager: DirPager::new(),
        }))
    }
}

struct LangDir {
    name: String,
    fs: LanguageFs,
    path: VirtualPath,
    pager: DirPager,
}

impl io::Read for LangDir {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "is a directory"))
    }
}

impl VfsFile for LangDir {
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
    use crate::fs::os::OsFs;
    use std::fs;

    fn langs() -> Languages {
        Languages::new(["en", "sv", "no"])
    }

    #[test]
    fn test_filename_lang_overrides_fs_lang() {
        let info = lang_info_from("post.sv.md", Some("en"), &langs()).unwrap();
        assert_eq!(info.lang, "sv");
        assert_eq!(info.weight, 1);
        assert_eq!(info.translation_base_name, "post");
        assert_eq!(info.translation_base_name_with_ext, "post.md");
    }

    #[test]
    fn test_weight_bumps() {
        assert_eq!(lang_info_from("post.en.md", Some("en"), &langs()).unwrap().weight, 2);
        assert_eq!(lang_info_from("post.sv.md", Some("en"), &langs()).unwrap().weight, 1);
        assert_eq!(lang_info_from("post.md", Some("en"), &langs()).unwrap().weight, 0);
    }

    #[test]
    fn test_unknown_segment_is_not_a_lang() {
        let info = lang_info_from("post.draft.md", Some("en"), &langs()).unwrap();
        assert_eq!(info.lang, "en");
        assert_eq!(info.translation_base_name, "post.draft");
    }

    #[test]
    fn test_no_language_fails_fast() {
        let err = lang_info_from("post.md", None, &langs()).unwrap_err();
        assert!(matches!(err, SiteFsError::UnknownLanguage { .. }));
    }

    #[test]
    fn test_listing_classifies_and_attaches_translations() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("post.md"), b"").unwrap();
        fs::write(dir.path().join("post.sv.md"), b"").unwrap();
        fs::write(dir.path().join("about.md"), b"").unwrap();

        let fs = LanguageFs::new("en", langs(), Arc::new(OsFs::new(dir.path())));
        let entries = fs.read_dir(&VirtualPath::root()).unwrap();
        assert_eq!(entries.len(), 3);

        let post_en = entries
            .iter()
            .find(|e| e.name() == "post.md")
            .unwrap();
        assert_eq!(post_en.meta().lang.as_deref(), Some("en"));
        assert_eq!(
            post_en.meta().translations.as_deref(),
            Some(["en".to_string(), "sv".to_string()].as_slice())
        );

        let post_sv = entries
            .iter()
            .find(|e| e.name() == "post.sv.md")
            .unwrap();
        assert_eq!(post_sv.meta().lang.as_deref(), Some("sv"));
        assert_eq!(post_sv.meta().weight, 1);

        let about = entries.iter().find(|e| e.name() == "about.md").unwrap();
        assert_eq!(about.meta().translations.as_deref(), Some(["en".to_string()].as_slice()));
    }

    #[test]
    fn test_same_name_and_language_collapses_to_one() {
        use crate::fs::rootmap::RootMappingFs;
        use crate::types::MountDecl;

        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("project")).unwrap();
        fs::create_dir_all(root.path().join("theme")).unwrap();
        fs::write(root.path().join("project/post.sv.md"), b"projekt").unwrap();
        fs::write(root.path().join("theme/post.sv.md"), b"tema").unwrap();

        let rootmap = RootMappingFs::new(&[
            MountDecl::new(root.path().join("project"), "content"),
            MountDecl::new(root.path().join("theme"), "content"),
        ])
        .unwrap();
        let fs = LanguageFs::new("sv", langs(), Arc::new(rootmap));

        let entries = fs.read_dir(&VirtualPath::new("content")).unwrap();
        let posts: Vec<_> = entries.iter().filter(|e| e.name() == "post.sv.md").collect();
        assert_eq!(posts.len(), 1);
        // First-declared mount wins the tie in weight.
        assert_eq!(posts[0].size(), "projekt".len() as u64);
        assert_eq!(posts[0].meta().weight, 2);
    }

    #[test]
    fn test_disabled_language_is_invisible() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("post.no.md"), b"").unwrap();
        fs::write(dir.path().join("post.md"), b"").unwrap();

        let fs = LanguageFs::new("en", langs().disable("no"), Arc::new(OsFs::new(dir.path())));
        let entries = fs.read_dir(&VirtualPath::root()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["post.md"]);
        assert!(fs
            .stat(&VirtualPath::new("post.no.md"))
            .unwrap_err()
            .is_not_exist());
    }
}
