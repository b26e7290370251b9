use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::RenderStageConfig;
use rf_core::{SceneItem, Stage, StageError};

use crate::executor::{non_blank_url, StageExecutor, StageOutput};
use crate::provider::{RenderProvider, RenderRequest, SubtitleRequest};

/// Combines the scene's image and narration into a video clip.
pub struct RenderExecutor {
    provider: Arc<dyn RenderProvider>,
    config: RenderStageConfig,
}

impl RenderExecutor {
    pub fn new(provider: Arc<dyn RenderProvider>, config: &RenderStageConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl StageExecutor for RenderExecutor {
    fn stage(&self) -> Stage {
        Stage::Render
    }

    fn validate(&self) -> rf_core::Result<()> {
        if !self.provider.is_available() {
            return Err(rf_core::Error::setup(format!(
                "render provider '{}' is not configured",
                self.provider.name()
            )));
        }
        Ok(())
    }

    async fn execute(&self, scene: &SceneItem) -> Result<StageOutput, StageError> {
        let (Some(image_url), Some(audio_url)) = (
            scene.image_url.as_deref().filter(|_| scene.has_image()),
            scene.audio_url.as_deref().filter(|_| scene.has_generated_audio()),
        ) else {
            return Err(StageError::InvalidInput(
                "image and generated audio are required".into(),
            ));
        };

        let subtitles = self
            .config
            .subtitles
            .enabled
            .then(|| SubtitleRequest {
                text: scene.script.trim(),
                style: &self.config.subtitles,
            })
            .filter(|s| !s.text.is_empty());

        tracing::debug!(scene_id = %scene.id, provider = self.provider.name(), "Rendering clip");
        let request = RenderRequest {
            image_url,
            audio_url,
            transition: self.config.transition,
            transition_ms: self.config.transition_ms,
            motion: &self.config.ken_burns,
            subtitles,
        };
        let result = self.provider.render(&request).await?;
        non_blank_url(self.provider.name(), result.video_url).map(StageOutput::Video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{voiced_scene, FakeRenders};

    #[tokio::test]
    async fn refuses_scene_without_audio() {
        let fake = Arc::new(FakeRenders::default());
        let scene = SceneItem::new(0, "x").with_uploaded_image("i.png");
        let err = RenderExecutor::new(fake.clone(), &RenderStageConfig::default())
            .execute(&scene)
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
        assert_eq!(fake.call_count(), 0);
    }

    #[tokio::test]
    async fn subtitles_follow_config() {
        let fake = Arc::new(FakeRenders::default());
        let scene = voiced_scene(0, "caption me");

        let mut config = RenderStageConfig::default();
        RenderExecutor::new(fake.clone(), &config)
            .execute(&scene)
            .await
            .unwrap();

        config.subtitles.enabled = false;
        RenderExecutor::new(fake.clone(), &config)
            .execute(&scene)
            .await
            .unwrap();

        assert_eq!(
            fake.subtitles(),
            vec![Some("caption me".to_string()), None]
        );
    }
}
