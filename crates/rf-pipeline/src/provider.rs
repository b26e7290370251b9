//! Traits and request types for the external generation providers.
//!
//! Each provider wraps a single external service and turns one request into
//! one URL. Providers never see a [`SceneItem`](rf_core::SceneItem); the stage
//! executors extract the fields a provider needs.

use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::{AspectRatio, KenBurnsConfig, SubtitleConfig, Transition};
use rf_core::StageError;

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImageRequest<'a> {
    pub prompt: &'a str,
    pub aspect_ratio: AspectRatio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub image_url: String,
}

/// Text-to-image service.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Short, lowercase identifier used in logs and messages.
    fn name(&self) -> &'static str;

    /// Returns `false` when the provider cannot serve requests at all
    /// (e.g. no endpoint configured).
    fn is_available(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: &ImageRequest<'_>,
        api_key: &str,
    ) -> Result<ImageResult, StageError>;
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VoiceRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub speed: f32,
    pub emotion: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioResult {
    pub audio_url: String,
}

/// Text-to-speech service.
#[async_trait]
pub trait VoiceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        request: &VoiceRequest<'_>,
        api_key: &str,
    ) -> Result<AudioResult, StageError>;
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SubtitleRequest<'a> {
    pub text: &'a str,
    pub style: &'a SubtitleConfig,
}

#[derive(Debug, Clone)]
pub struct RenderRequest<'a> {
    pub image_url: &'a str,
    pub audio_url: &'a str,
    pub transition: Transition,
    pub transition_ms: u32,
    pub motion: &'a KenBurnsConfig,
    /// `None` when subtitles are disabled.
    pub subtitles: Option<SubtitleRequest<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub video_url: String,
}

/// Still image + narration to video clip.
#[async_trait]
pub trait RenderProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool {
        true
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<VideoResult, StageError>;
}

/// The three providers a pipeline needs, shared across runs.
#[derive(Clone)]
pub struct StageProviders {
    pub image: Arc<dyn ImageProvider>,
    pub voice: Arc<dyn VoiceProvider>,
    pub render: Arc<dyn RenderProvider>,
}

impl std::fmt::Debug for StageProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageProviders")
            .field("image", &self.image.name())
            .field("voice", &self.voice.name())
            .field("render", &self.render.name())
            .finish()
    }
}
