//! Text-to-speech over HTTP: `POST {base}/speech`.

use async_trait::async_trait;
use rf_core::config::ProviderConfig;
use rf_core::StageError;
use rf_pipeline::provider::{AudioResult, VoiceProvider, VoiceRequest};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechBody<'a> {
    text: &'a str,
    voice_id: &'a str,
    speed: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<&'a str>,
}

#[derive(Deserialize)]
struct SpeechResponse {
    #[serde(rename = "audioUrl", alias = "audio_url", alias = "url")]
    audio_url: String,
}

pub struct HttpVoiceProvider {
    client: ApiClient,
}

impl HttpVoiceProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: ApiClient::new("voice", config),
        }
    }
}

#[async_trait]
impl VoiceProvider for HttpVoiceProvider {
    fn name(&self) -> &'static str {
        self.client.provider()
    }

    fn is_available(&self) -> bool {
        self.client.is_configured()
    }

    async fn generate(
        &self,
        request: &VoiceRequest<'_>,
        api_key: &str,
    ) -> Result<AudioResult, StageError> {
        let body = SpeechBody {
            text: request.text,
            voice_id: request.voice_id,
            speed: request.speed,
            emotion: request.emotion,
        };
        let resp: SpeechResponse = self.client.post_json("/speech", &body, Some(api_key)).await?;
        Ok(AudioResult {
            audio_url: resp.audio_url,
        })
    }
}
