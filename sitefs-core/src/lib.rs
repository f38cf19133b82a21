//! # SiteFS Core
//!
//! The virtual-filesystem layer of a static-site build tool: many
//! physical directory trees (the project's own content/layout/asset
//! directories, theme and module trees, per-language override trees)
//! presented as one deterministic logical tree behind a single
//! file-access contract.
//!
//! ## Overview
//!
//! Mount declarations map virtual path prefixes onto physical
//! directories (or single files). The mount index resolves virtual
//! paths across all of them, merges overlapping directory listings
//! deterministically, and answers reverse lookups from physical paths
//! back to logical locations.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use sitefs_core::fs::rootmap::RootMappingFs;
//! use sitefs_core::types::{MountDecl, VirtualPath};
//!
//! let fs = RootMappingFs::new(&[
//!     MountDecl::new("/site/content", "content").project(),
//!     MountDecl::new("/themes/base/content", "content"),
//! ])?;
//!
//! for entry in fs.read_dir(&VirtualPath::new("content"))? {
//!     println!("{}", entry.name());
//! }
//! ```
//!
//! ## Architecture
//!
//! This crate is organized as composable layers:
//!
//! - [`traits`]: the capability contract every layer implements
//! - [`types`]: descriptors, metadata, paths, mounts
//! - [`error`]: error types and handling
//! - [`fs`]: the layers themselves, from the physical backend up to
//!   the mount index and the component/language views
//! - [`walk`]: cycle-safe depth-first traversal
//! - [`glob`]: pattern-driven walks

pub mod error;
pub mod fs;
pub mod glob;
pub mod traits;
pub mod types;
pub mod walk;

pub use error::{Result, SiteFsError};
pub use traits::{FileSystem, VfsFile};
pub use types::{Component, ComponentPath, FileInfo, FileKind, FileMeta, Mount, MountDecl, VirtualPath};
