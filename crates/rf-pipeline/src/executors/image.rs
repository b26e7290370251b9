use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::{Credentials, ImageStageConfig};
use rf_core::{SceneItem, Stage, StageError};

use super::non_blank;
use crate::executor::{non_blank_url, StageExecutor, StageOutput};
use crate::provider::{ImageProvider, ImageRequest};

/// Generates a still image from the scene's prompt (or its script).
pub struct ImageExecutor {
    provider: Arc<dyn ImageProvider>,
    api_key: Option<String>,
    config: ImageStageConfig,
}

impl ImageExecutor {
    pub fn new(
        provider: Arc<dyn ImageProvider>,
        credentials: &Credentials,
        config: &ImageStageConfig,
    ) -> Self {
        Self {
            provider,
            api_key: credentials.image_api_key.clone(),
            config: config.clone(),
        }
    }

    fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// Explicit prompt when present, otherwise the script, plus the style
    /// suffix.
    fn prompt_for(&self, scene: &SceneItem) -> Result<String, StageError> {
        let base = non_blank(scene.image_prompt.as_deref())
            .or_else(|| non_blank(Some(scene.script.as_str())))
            .ok_or_else(|| StageError::InvalidInput("text required".into()))?;

        Ok(match non_blank(self.config.style_prompt.as_deref()) {
            Some(style) => format!("{base}, {style}"),
            None => base.to_string(),
        })
    }
}

#[async_trait]
impl StageExecutor for ImageExecutor {
    fn stage(&self) -> Stage {
        Stage::Image
    }

    fn validate(&self) -> rf_core::Result<()> {
        if !self.provider.is_available() {
            return Err(rf_core::Error::setup(format!(
                "image provider '{}' is not configured",
                self.provider.name()
            )));
        }
        if self.api_key().is_none() {
            return Err(rf_core::Error::setup("image API key is missing"));
        }
        Ok(())
    }

    async fn execute(&self, scene: &SceneItem) -> Result<StageOutput, StageError> {
        let api_key = self
            .api_key()
            .ok_or_else(|| StageError::Credentials("image API key is missing".into()))?;
        let prompt = self.prompt_for(scene)?;

        tracing::debug!(scene_id = %scene.id, provider = self.provider.name(), "Generating image");
        let request = ImageRequest {
            prompt: &prompt,
            aspect_ratio: self.config.aspect_ratio,
        };
        let result = self.provider.generate(&request, api_key).await?;
        non_blank_url(self.provider.name(), result.image_url).map(StageOutput::Image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::FakeImages;

    fn executor(fake: &Arc<FakeImages>, key: Option<&str>, style: Option<&str>) -> ImageExecutor {
        let creds = Credentials {
            image_api_key: key.map(String::from),
            voice_api_key: None,
        };
        let config = ImageStageConfig {
            style_prompt: style.map(String::from),
            ..ImageStageConfig::default()
        };
        ImageExecutor::new(fake.clone(), &creds, &config)
    }

    #[test]
    fn missing_key_fails_validation() {
        let fake = Arc::new(FakeImages::default());
        let err = executor(&fake, Some("  "), None).validate().unwrap_err();
        assert!(matches!(err, rf_core::Error::Setup(_)));
        assert!(executor(&fake, Some("k"), None).validate().is_ok());
    }

    #[tokio::test]
    async fn explicit_prompt_wins_over_script() {
        let fake = Arc::new(FakeImages::default());
        let scene = SceneItem::new(0, "the script").with_image_prompt("a red fox");
        let output = executor(&fake, Some("k"), Some("watercolor"))
            .execute(&scene)
            .await
            .unwrap();

        assert_eq!(fake.prompts(), vec!["a red fox, watercolor"]);
        assert!(matches!(output, StageOutput::Image(_)));
    }

    #[tokio::test]
    async fn blank_prompt_falls_back_to_script() {
        let fake = Arc::new(FakeImages::default());
        let scene = SceneItem::new(0, " city at night ").with_image_prompt("   ");
        executor(&fake, Some("k"), None).execute(&scene).await.unwrap();
        assert_eq!(fake.prompts(), vec!["city at night"]);
    }

    #[tokio::test]
    async fn empty_text_never_reaches_provider() {
        let fake = Arc::new(FakeImages::default());
        let err = executor(&fake, Some("k"), None)
            .execute(&SceneItem::new(0, ""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "text required");
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_key_fails_fast_per_scene() {
        let fake = Arc::new(FakeImages::default());
        let err = executor(&fake, None, None)
            .execute(&SceneItem::new(0, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Credentials(_)));
        assert_eq!(fake.call_count(), 0);
    }
}
