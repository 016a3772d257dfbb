//! Ensemble Registry -- packages, scenes and the queries run against them.
//!
//! Content arrives as binary package files. Decoding a package yields its
//! scenes; each scene holds a role template, an arena of stages and a graph
//! over them. Once loaded everything is read-only apart from a scene's
//! `enabled` flag and the runtime adjustment of placement offsets, so scenes
//! are shared as `Arc<Scene>` and queried from any thread.
//!
//! # Modules
//!
//! - [`decode`]: the versioned binary format.
//! - [`scene`]: scenes, stages, placements, furniture and placement planning.
//! - [`graph`]: stage graph classification and path queries.
//! - [`solver`]: actor-to-role assignment with the degendering fallback.
//! - [`legacy`]: sex-letter gender tags and count checks.
//! - [`package`]: a decoded package and its content fingerprint.
//! - [`library`]: the multi-package registry and offset overrides.
//! - [`config`]: library settings.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use ensemble_registry::prelude::*;
//!
//! let mut library = Library::new(RegistryConfig::default());
//! library.load_directory(Path::new("packages")).unwrap();
//!
//! let actors = [("lydia", Fragment::human(Sex::Female)), ("ulfric", Fragment::human(Sex::Male))];
//! for scene in library.find_scenes(&TagQuery::parse("kissing")) {
//!     if let Some(assignment) = scene.assign_actors(&actors, true) {
//!         println!("{}: {:?}", scene.name(), assignment.by_slot());
//!     }
//! }
//! ```

#![deny(unsafe_code)]

use std::path::PathBuf;

pub mod config;
pub mod decode;
pub mod graph;
pub mod legacy;
pub mod library;
pub mod package;
pub mod scene;
pub mod solver;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading packages or registry files.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A file could not be read or written.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A package file is malformed.
    #[error("failed to decode package '{}': {source}", path.display())]
    Decode { path: PathBuf, source: decode::DecodeError },

    /// An in-memory package is malformed.
    #[error("failed to decode package: {0}")]
    Malformed(#[from] decode::DecodeError),

    /// The configuration file is not valid.
    #[error("invalid configuration '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// An offset override file is not valid.
    #[error("invalid offset file '{}': {source}", path.display())]
    Offsets {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The same package content is already loaded.
    #[error("package content already loaded as '{name}' (fingerprint {fingerprint})")]
    DuplicateContent { name: String, fingerprint: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use ensemble_core::prelude::*;

    pub use crate::config::RegistryConfig;
    pub use crate::decode::{DecodeError, Decoder};
    pub use crate::graph::{NodeType, StageGraph, StageIndex};
    pub use crate::library::{Library, LoadSummary, OffsetOverrides};
    pub use crate::package::AnimPackage;
    pub use crate::scene::{
        FurnitureData, FurnitureType, Placement, PlacementInstruction, Scene, Stage, StripFlags,
    };
    pub use crate::solver::{assign, assign_with_fallback, Assignment};
    pub use crate::RegistryError;
}
