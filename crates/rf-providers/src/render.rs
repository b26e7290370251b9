//! Image + narration to video over HTTP: `POST {base}/render`.
//!
//! The render service is usually self-hosted, so the API key (if any) comes
//! from the provider config rather than from per-run credentials.

use async_trait::async_trait;
use rf_core::config::{PanDirection, ProviderConfig, SubtitlePosition, Transition};
use rf_core::StageError;
use rf_pipeline::provider::{RenderProvider, RenderRequest, VideoResult};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderBody<'a> {
    image_url: &'a str,
    audio_url: &'a str,
    transition: TransitionBody,
    motion: MotionBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtitles: Option<SubtitleBody<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionBody {
    #[serde(rename = "type")]
    kind: Transition,
    duration_ms: u32,
}

#[derive(Serialize)]
struct MotionBody {
    enabled: bool,
    zoom: f32,
    direction: PanDirection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubtitleBody<'a> {
    text: &'a str,
    font_size: u32,
    position: SubtitlePosition,
    color: &'a str,
}

#[derive(Deserialize)]
struct RenderResponse {
    #[serde(rename = "videoUrl", alias = "video_url", alias = "url")]
    video_url: String,
}

impl<'a> From<&RenderRequest<'a>> for RenderBody<'a> {
    fn from(request: &RenderRequest<'a>) -> Self {
        Self {
            image_url: request.image_url,
            audio_url: request.audio_url,
            transition: TransitionBody {
                kind: request.transition,
                duration_ms: request.transition_ms,
            },
            motion: MotionBody {
                enabled: request.motion.enabled,
                zoom: request.motion.zoom,
                direction: request.motion.direction,
            },
            subtitles: request.subtitles.as_ref().map(|s| SubtitleBody {
                text: s.text,
                font_size: s.style.font_size,
                position: s.style.position,
                color: &s.style.color,
            }),
        }
    }
}

pub struct HttpRenderProvider {
    client: ApiClient,
}

impl HttpRenderProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: ApiClient::new("render", config),
        }
    }
}

#[async_trait]
impl RenderProvider for HttpRenderProvider {
    fn name(&self) -> &'static str {
        self.client.provider()
    }

    fn is_available(&self) -> bool {
        self.client.is_configured()
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<VideoResult, StageError> {
        let body = RenderBody::from(request);
        let resp: RenderResponse = self.client.post_json("/render", &body, None).await?;
        Ok(VideoResult {
            video_url: resp.video_url,
        })
    }
}
