//! rf-providers: HTTP implementations of the generation provider traits.
//!
//! Each provider posts a JSON request to one endpoint and reads back a single
//! URL. The shared [`ApiClient`] handles timeouts, client-side rate limiting,
//! HTTP 429 back-off, and mapping failures onto [`rf_core::StageError`].

pub mod client;
pub mod image;
pub mod render;
pub mod voice;

use std::sync::Arc;

use rf_core::config::ProvidersConfig;
use rf_pipeline::StageProviders;

pub use client::ApiClient;
pub use image::HttpImageProvider;
pub use render::HttpRenderProvider;
pub use voice::HttpVoiceProvider;

/// Build the three HTTP providers from configuration.
pub fn http_providers(config: &ProvidersConfig) -> StageProviders {
    StageProviders {
        image: Arc::new(HttpImageProvider::new(&config.image)),
        voice: Arc::new(HttpVoiceProvider::new(&config.voice)),
        render: Arc::new(HttpRenderProvider::new(&config.render)),
    }
}
