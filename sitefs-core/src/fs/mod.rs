//! Filesystem layers, from the physical backend up to the mount index.
//!
//! Layers compose by wrapping. `OsFs` is the only layer that touches
//! disk; everything above it decorates, merges, or reroutes descriptors.

pub mod component;
pub mod decorate;
pub mod language;
pub mod os;
pub mod overlay;
pub mod rootmap;
