//! Core types shared by every filesystem layer.

mod component;
mod fileinfo;
mod meta;
mod mount;
mod path;

pub use component::Component;
pub use fileinfo::{decorate_file_info, FileInfo, FileKind};
pub use meta::{ContentClass, FileMeta, FileOpener, InclusionFilter, RenameRule};
pub use mount::{ComponentPath, Mount, MountDecl};
pub use path::VirtualPath;
