use std::sync::Arc;

use async_trait::async_trait;
use rf_core::config::{Credentials, VoiceStageConfig};
use rf_core::{SceneItem, Stage, StageError};

use super::non_blank;
use crate::executor::{non_blank_url, StageExecutor, StageOutput};
use crate::provider::{VoiceProvider, VoiceRequest};

/// Narrates the scene's script with the selected voice.
pub struct VoiceExecutor {
    provider: Arc<dyn VoiceProvider>,
    api_key: Option<String>,
    config: VoiceStageConfig,
}

impl VoiceExecutor {
    pub fn new(
        provider: Arc<dyn VoiceProvider>,
        credentials: &Credentials,
        config: &VoiceStageConfig,
    ) -> Self {
        Self {
            provider,
            api_key: credentials.voice_api_key.clone(),
            config: config.clone(),
        }
    }

    fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    fn voice_id(&self) -> Option<&str> {
        non_blank(self.config.voice_id.as_deref())
    }
}

#[async_trait]
impl StageExecutor for VoiceExecutor {
    fn stage(&self) -> Stage {
        Stage::Voice
    }

    fn validate(&self) -> rf_core::Result<()> {
        if !self.provider.is_available() {
            return Err(rf_core::Error::setup(format!(
                "voice provider '{}' is not configured",
                self.provider.name()
            )));
        }
        if self.api_key().is_none() {
            return Err(rf_core::Error::setup("voice API key is missing"));
        }
        if self.voice_id().is_none() {
            return Err(rf_core::Error::setup("no voice selected"));
        }
        Ok(())
    }

    async fn execute(&self, scene: &SceneItem) -> Result<StageOutput, StageError> {
        let api_key = self
            .api_key()
            .ok_or_else(|| StageError::Credentials("voice API key is missing".into()))?;
        let voice_id = self
            .voice_id()
            .ok_or_else(|| StageError::InvalidInput("no voice selected".into()))?;
        let text = scene.script.trim();
        if text.is_empty() {
            return Err(StageError::InvalidInput("text required".into()));
        }

        tracing::debug!(
            scene_id = %scene.id,
            provider = self.provider.name(),
            voice_id,
            chars = text.len(),
            "Generating narration"
        );
        let request = VoiceRequest {
            text,
            voice_id,
            speed: self.config.speed,
            emotion: non_blank(self.config.emotion.as_deref()),
        };
        let result = self.provider.generate(&request, api_key).await?;
        non_blank_url(self.provider.name(), result.audio_url).map(StageOutput::Audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::FakeVoices;

    fn executor(fake: &Arc<FakeVoices>, voice_id: Option<&str>) -> VoiceExecutor {
        let creds = Credentials {
            image_api_key: None,
            voice_api_key: Some("vk".into()),
        };
        let config = VoiceStageConfig {
            voice_id: voice_id.map(String::from),
            speed: 1.1,
            emotion: Some("calm".into()),
        };
        VoiceExecutor::new(fake.clone(), &creds, &config)
    }

    #[test]
    fn missing_voice_is_a_setup_error() {
        let fake = Arc::new(FakeVoices::default());
        let err = executor(&fake, None).validate().unwrap_err();
        assert_eq!(err.to_string(), "Setup error: no voice selected");
    }

    #[tokio::test]
    async fn sends_trimmed_script() {
        let fake = Arc::new(FakeVoices::default());
        let output = executor(&fake, Some("narrator"))
            .execute(&SceneItem::new(0, "  Once upon a time.  "))
            .await
            .unwrap();
        assert_eq!(fake.texts(), vec!["Once upon a time."]);
        assert!(matches!(output, StageOutput::Audio(_)));
    }

    #[tokio::test]
    async fn empty_script_is_rejected() {
        let fake = Arc::new(FakeVoices::default());
        let err = executor(&fake, Some("narrator"))
            .execute(&SceneItem::new(0, " "))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
        assert_eq!(fake.call_count(), 0);
    }
}
