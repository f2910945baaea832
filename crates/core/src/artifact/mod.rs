//! Firmware artifacts and how their bytes are loaded.
//!
//! The metadata source yields `ArtifactRecord`s; an `ArtifactLoader` turns a
//! record into bytes, and `PreparedArtifact` pairs both with the content
//! identifier used by the backend.

mod fs_loader;
mod types;

pub use fs_loader::FsArtifactLoader;
pub use types::*;
