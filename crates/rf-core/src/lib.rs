//! rf-core: shared types, IDs, errors, configuration, and the scene store.
//!
//! This crate is the foundational dependency for the other rf-* crates. It
//! owns the scene data model the pipeline reads and patches, the unified
//! error types, application configuration, and the [`SceneStore`] seam
//! through which the pipeline talks to whatever owns the scenes.

pub mod config;
pub mod error;
pub mod ids;
pub mod scene;
pub mod store;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result, StageError};
pub use ids::*;
pub use scene::*;
pub use store::{MemorySceneStore, SceneStore};
