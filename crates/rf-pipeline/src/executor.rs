//! The [`StageExecutor`] trait moves one scene through one stage.
//!
//! An executor validates its setup once before a run, then executes per
//! scene. It never mutates the scene; the batch runner applies the returned
//! [`StageOutput`] through the store.

use async_trait::async_trait;
use rf_core::{SceneItem, ScenePatch, Stage, StageError};

/// The single new reference a stage produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutput {
    Image(String),
    Audio(String),
    Video(String),
}

impl StageOutput {
    pub fn url(&self) -> &str {
        match self {
            StageOutput::Image(url) | StageOutput::Audio(url) | StageOutput::Video(url) => url,
        }
    }

    /// Patch that records this output and ends processing.
    pub fn into_patch(self) -> ScenePatch {
        match self {
            StageOutput::Image(url) => ScenePatch::image(url),
            StageOutput::Audio(url) => ScenePatch::audio(url),
            StageOutput::Video(url) => ScenePatch::video(url),
        }
    }
}

/// One generation step for a single scene.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Which stage this executor implements.
    fn stage(&self) -> Stage;

    /// Check credentials and required selections before any scene is
    /// attempted.
    ///
    /// Failing here aborts the whole run with [`rf_core::Error::Setup`].
    fn validate(&self) -> rf_core::Result<()>;

    /// Produce this stage's output for `scene`.
    async fn execute(&self, scene: &SceneItem) -> Result<StageOutput, StageError>;
}

/// Reject blank URLs coming back from a provider.
pub(crate) fn non_blank_url(provider: &str, url: String) -> Result<String, StageError> {
    if url.trim().is_empty() {
        Err(StageError::Provider(format!(
            "{provider} returned an empty URL"
        )))
    } else {
        Ok(url)
    }
}
