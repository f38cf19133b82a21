//! End-to-end tests over a realistic project-plus-theme mount set.

use sitefs_core::fs::component::ComponentFs;
use sitefs_core::fs::language::{LanguageFs, Languages};
use sitefs_core::fs::os::OsFs;
use sitefs_core::fs::rootmap::RootMappingFs;
use sitefs_core::glob;
use sitefs_core::types::ContentClass;
use sitefs_core::walk::{WalkControl, Walkway};
use sitefs_core::{Component, FileSystem, MountDecl, VirtualPath};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site_fixture(root: &Path) -> RootMappingFs {
    // Project tree.
    write(root, "project/content/_index.md", "home");
    write(root, "project/content/blog/first.md", "project first");
    write(root, "project/content/blog/first.sv.md", "projekt");
    write(root, "project/static/logo.png", "png");
    // Theme tree.
    write(root, "theme/content/blog/first.md", "theme first");
    write(root, "theme/content/blog/extra.md", "theme extra");
    write(root, "theme/static/theme.css", "css");

    RootMappingFs::new(&[
        MountDecl::new(root.join("project/content"), "content")
            .with_lang("en")
            .project()
            .watched(),
        MountDecl::new(root.join("theme/content"), "content").with_module("theme", 1),
        MountDecl::new(root.join("project/static"), "static").project(),
        MountDecl::new(root.join("theme/static"), "static").with_module("theme", 1),
    ])
    .unwrap()
}

#[test]
fn test_project_and_theme_merge() {
    let root = tempfile::tempdir().unwrap();
    let fs = site_fixture(root.path());

    // The project mount is declared first and wins the exact collision.
    let content = fs.stat(&VirtualPath::new("content")).unwrap();
    assert!(content.is_dir());
    assert!(content.meta().is_project);
    assert!(content.meta().watch);

    // Same-named files from project and theme coexist.
    let entries = fs.read_dir(&VirtualPath::new("content/blog")).unwrap();
    let firsts: Vec<_> = entries.iter().filter(|e| e.name() == "first.md").collect();
    assert_eq!(firsts.len(), 2);
    assert!(firsts[0].meta().is_project);
    assert_eq!(firsts[1].meta().module.as_deref(), Some("theme"));
    assert!(entries.iter().any(|e| e.name() == "extra.md"));

    // Ancestor resolution prefers the first-declared mount.
    let first = fs.stat(&VirtualPath::new("content/blog/first.md")).unwrap();
    assert_eq!(first.size(), "project first".len() as u64);
}

#[test]
fn test_reverse_lookup_on_theme_file() {
    let root = tempfile::tempdir().unwrap();
    let fs = site_fixture(root.path());

    let hits = fs.reverse_lookup(root.path().join("theme/content/blog/extra.md"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].component, Component::Content);
    assert_eq!(hits[0].path.as_str(), "blog/extra.md");

    let forward = VirtualPath::new("content").join(hits[0].path.as_str());
    assert!(fs.stat(&forward).is_ok());
}

#[test]
fn test_project_only_filter() {
    let root = tempfile::tempdir().unwrap();
    let fs = site_fixture(root.path());

    let project = fs.filter(|m| m.meta.is_project);
    let entries = project.read_dir(&VirtualPath::new("content/blog")).unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["first.md", "first.sv.md"]);
}

#[test]
fn test_component_and_language_composition() {
    let root = tempfile::tempdir().unwrap();
    let rootmap = site_fixture(root.path());
    let languages = Languages::new(["en", "sv"]);

    let composed = ComponentFs::new(
        Component::Content,
        Arc::new(LanguageFs::new("en", languages, Arc::new(rootmap))),
    );

    let entries = composed.read_dir(&VirtualPath::new("content")).unwrap();
    // Bundle header first, directories before files overall.
    assert!(entries[0].is_dir());
    assert_eq!(entries[0].name(), "blog");
    let index = entries.iter().find(|e| e.name() == "_index.md").unwrap();
    assert_eq!(index.meta().classifier, Some(ContentClass::Branch));
    assert_eq!(index.meta().lang.as_deref(), Some("en"));

    let blog = composed.read_dir(&VirtualPath::new("content/blog")).unwrap();
    let sv = blog.iter().find(|e| e.name() == "first.sv.md").unwrap();
    assert_eq!(sv.meta().lang.as_deref(), Some("sv"));
    assert_eq!(sv.meta().weight, 1);
    assert_eq!(
        sv.meta().translations.as_deref(),
        Some(["en".to_string(), "sv".to_string()].as_slice())
    );
}

#[test]
fn test_walk_over_assembled_tree() {
    let root = tempfile::tempdir().unwrap();
    let fs: Arc<dyn FileSystem> = Arc::new(site_fixture(root.path()));

    let mut files = Vec::new();
    Walkway::new(fs, VirtualPath::root(), |path, fi| {
        if !fi.is_dir() {
            files.push(path.as_str().to_string());
        }
        Ok(WalkControl::Continue)
    })
    .walk()
    .unwrap();

    assert!(files.contains(&"content/blog/first.md".to_string()));
    assert!(files.contains(&"content/blog/extra.md".to_string()));
    assert!(files.contains(&"static/logo.png".to_string()));
    assert!(files.contains(&"static/theme.css".to_string()));
    // Both mounts' first.md are visited.
    assert_eq!(files.iter().filter(|f| *f == "content/blog/first.md").count(), 2);
}

#[test]
fn test_glob_totals() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "root.json", "");
    write(root.path(), "jsonfiles/d1.json", "");
    write(root.path(), "jsonfiles/d2.json", "");
    write(root.path(), "jsonfiles/sub/d3.json", "");
    write(root.path(), "jsonfiles/d1.xml", "");
    write(root.path(), "a/b/c/e/f.json", "");

    let fs: Arc<dyn FileSystem> = Arc::new(OsFs::new(root.path()));
    let count = |pattern: &str| {
        let mut n = 0;
        glob::walk(&fs, pattern, |_path, _fi| {
            n += 1;
            Ok(false)
        })
        .unwrap();
        n
    };

    assert_eq!(count("**.json"), 5);
    assert_eq!(count("**"), 6);
    assert_eq!(count("jsonfiles/*.json"), 2);
    assert_eq!(count("*.json"), 1);
    assert_eq!(count("**.xml"), 1);
    assert_eq!(count(""), 0);
}

#[test]
fn test_glob_early_termination() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "a.json", "");
    write(root.path(), "b.json", "");
    write(root.path(), "c.json", "");

    let fs: Arc<dyn FileSystem> = Arc::new(OsFs::new(root.path()));
    let mut seen = 0;
    glob::walk(&fs, "*.json", |_path, _fi| {
        seen += 1;
        Ok(seen == 2)
    })
    .unwrap();
    assert_eq!(seen, 2);
}
