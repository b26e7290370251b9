//! Text-to-image over HTTP: `POST {base}/images`.

use async_trait::async_trait;
use rf_core::config::{AspectRatio, ProviderConfig};
use rf_core::StageError;
use rf_pipeline::provider::{ImageProvider, ImageRequest, ImageResult};
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    prompt: &'a str,
    aspect_ratio: AspectRatio,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(rename = "imageUrl", alias = "image_url", alias = "url")]
    image_url: String,
}

pub struct HttpImageProvider {
    client: ApiClient,
}

impl HttpImageProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: ApiClient::new("image", config),
        }
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    fn name(&self) -> &'static str {
        self.client.provider()
    }

    fn is_available(&self) -> bool {
        self.client.is_configured()
    }

    async fn generate(
        &self,
        request: &ImageRequest<'_>,
        api_key: &str,
    ) -> Result<ImageResult, StageError> {
        let body = GenerateBody {
            prompt: request.prompt,
            aspect_ratio: request.aspect_ratio,
        };
        let resp: GenerateResponse = self.client.post_json("/images", &body, Some(api_key)).await?;
        Ok(ImageResult {
            image_url: resp.image_url,
        })
    }
}
