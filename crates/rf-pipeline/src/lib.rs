//! # rf-pipeline
//!
//! Batch production pipeline that drives scenes through the Image, Voice and
//! Render stages.
//!
//! This crate provides:
//!
//! - **Provider traits** ([`ImageProvider`], [`VoiceProvider`],
//!   [`RenderProvider`]) -- the boundary to external generation services.
//! - **[`StageExecutor`]** trait -- one scene through one stage, with
//!   validate / execute semantics. Built-in executors live in [`executors`].
//! - **[`BatchRunner`]** -- runs a list of scenes through one executor,
//!   sequentially, isolating per-scene failures and reporting progress.
//! - **[`PipelineCoordinator`]** -- composes Image, Voice and Render passes,
//!   re-reading the store before each one, and offers retry of failed scenes.

pub mod context;
pub mod coordinator;
pub mod executor;
pub mod executors;
pub mod provider;
pub mod retry;
pub mod runner;

#[cfg(test)]
mod test_fixtures;

// Re-export key types at the crate root.
pub use context::{ProgressReport, ProgressSender};
pub use coordinator::{PipelineCoordinator, PipelineReport};
pub use executor::{StageExecutor, StageOutput};
pub use provider::{
    AudioResult, ImageProvider, ImageRequest, ImageResult, RenderProvider, RenderRequest,
    StageProviders, SubtitleRequest, VideoResult, VoiceProvider, VoiceRequest,
};
pub use retry::retry_targets;
pub use runner::{BatchOptions, BatchRunner, StageFailure, StageResult};
pub use tokio_util::sync::CancellationToken;
