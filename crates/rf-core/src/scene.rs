//! Scene data model and the generation stages that operate on it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::SceneId;

// ---------------------------------------------------------------------------
// SceneItem
// ---------------------------------------------------------------------------

/// Where a scene's image came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    /// No image yet.
    #[default]
    None,
    /// Produced by the image provider.
    Generated,
    /// Supplied by the user.
    Uploaded,
}

/// One unit of content: script text plus the outputs derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneItem {
    pub id: SceneId,
    /// 0-based playback position.
    pub order: u32,
    /// Source text for voice and (absent an explicit prompt) image derivation.
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub image_prompt: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_source: ImageSource,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_generated: bool,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub rendered: bool,

    /// Set only while a stage call for this scene is in flight.
    #[serde(default)]
    pub is_processing: bool,
    /// Last failure message.
    #[serde(default)]
    pub error: Option<String>,
}

impl SceneItem {
    /// Create a fresh scene with no outputs.
    pub fn new(order: u32, script: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(),
            order,
            script: script.into(),
            image_prompt: None,
            image_url: None,
            image_source: ImageSource::None,
            audio_url: None,
            audio_generated: false,
            video_url: None,
            rendered: false,
            is_processing: false,
            error: None,
        }
    }

    /// Builder: set an explicit image prompt.
    pub fn with_image_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.image_prompt = Some(prompt.into());
        self
    }

    /// Builder: attach a user-uploaded image.
    pub fn with_uploaded_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self.image_source = ImageSource::Uploaded;
        self
    }

    /// Human-facing identity used to prefix error messages ("Scene 3").
    pub fn label(&self) -> String {
        format!("Scene {}", u64::from(self.order) + 1)
    }

    pub fn has_image(&self) -> bool {
        present(&self.image_url)
    }

    /// Audio counts only when it was produced by the voice stage.
    pub fn has_generated_audio(&self) -> bool {
        self.audio_generated && present(&self.audio_url)
    }

    pub fn has_video(&self) -> bool {
        self.rendered && present(&self.video_url)
    }

    pub fn has_script(&self) -> bool {
        !self.script.trim().is_empty()
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// ScenePatch
// ---------------------------------------------------------------------------

/// Partial update handed to the store's mutation sink.
///
/// `None` leaves a field untouched. `error` is doubly optional so a patch can
/// clear it (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePatch {
    pub image_url: Option<String>,
    pub image_source: Option<ImageSource>,
    pub audio_url: Option<String>,
    pub audio_generated: Option<bool>,
    pub video_url: Option<String>,
    pub rendered: Option<bool>,
    pub is_processing: Option<bool>,
    pub error: Option<Option<String>>,
}

impl ScenePatch {
    /// Mark a stage call as in flight and clear the previous error.
    pub fn processing() -> Self {
        Self {
            is_processing: Some(true),
            error: Some(None),
            ..Self::default()
        }
    }

    /// Record a failure and end processing.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            is_processing: Some(false),
            error: Some(Some(message.into())),
            ..Self::default()
        }
    }

    /// Clear the error without touching anything else.
    pub fn clear_error() -> Self {
        Self {
            error: Some(None),
            ..Self::default()
        }
    }

    /// Successful image generation.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            image_url: Some(url.into()),
            image_source: Some(ImageSource::Generated),
            ..Self::finished()
        }
    }

    /// Successful voice generation.
    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            audio_url: Some(url.into()),
            audio_generated: Some(true),
            ..Self::finished()
        }
    }

    /// Successful render.
    pub fn video(url: impl Into<String>) -> Self {
        Self {
            video_url: Some(url.into()),
            rendered: Some(true),
            ..Self::finished()
        }
    }

    fn finished() -> Self {
        Self {
            is_processing: Some(false),
            error: Some(None),
            ..Self::default()
        }
    }

    /// Apply every set field to `scene`.
    pub fn apply(&self, scene: &mut SceneItem) {
        if let Some(url) = &self.image_url {
            scene.image_url = Some(url.clone());
        }
        if let Some(source) = self.image_source {
            scene.image_source = source;
        }
        if let Some(url) = &self.audio_url {
            scene.audio_url = Some(url.clone());
        }
        if let Some(generated) = self.audio_generated {
            scene.audio_generated = generated;
        }
        if let Some(url) = &self.video_url {
            scene.video_url = Some(url.clone());
        }
        if let Some(rendered) = self.rendered {
            scene.rendered = rendered;
        }
        if let Some(processing) = self.is_processing {
            scene.is_processing = processing;
        }
        if let Some(error) = &self.error {
            scene.error = error.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One generation step. Pipeline runs always go Image, Voice, Render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Image,
    Voice,
    Render,
}

/// Why a scene is not eligible for a stage. Not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyScript,
    MissingImage,
    MissingAudio,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyScript => f.write_str("script is empty"),
            SkipReason::MissingImage => f.write_str("no image"),
            SkipReason::MissingAudio => f.write_str("no generated audio"),
        }
    }
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 3] = [Stage::Image, Stage::Voice, Stage::Render];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Image => "image",
            Stage::Voice => "voice",
            Stage::Render => "render",
        }
    }

    /// Whether `scene` already carries this stage's output.
    pub fn is_done(&self, scene: &SceneItem) -> bool {
        match self {
            Stage::Image => scene.has_image(),
            Stage::Voice => scene.has_generated_audio(),
            Stage::Render => scene.has_video(),
        }
    }

    /// Whether `scene` has the inputs this stage needs.
    pub fn check_eligible(&self, scene: &SceneItem) -> Result<(), SkipReason> {
        match self {
            Stage::Image => Ok(()),
            Stage::Voice if !scene.has_script() => Err(SkipReason::EmptyScript),
            Stage::Voice => Ok(()),
            Stage::Render if !scene.has_image() => Err(SkipReason::MissingImage),
            Stage::Render if !scene.has_generated_audio() => Err(SkipReason::MissingAudio),
            Stage::Render => Ok(()),
        }
    }

    pub fn is_eligible(&self, scene: &SceneItem) -> bool {
        self.check_eligible(scene).is_ok()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(Stage::Image),
            "voice" => Ok(Stage::Voice),
            "render" => Ok(Stage::Render),
            other => Err(crate::Error::Validation(format!("unknown stage '{other}'"))),
        }
    }
}
