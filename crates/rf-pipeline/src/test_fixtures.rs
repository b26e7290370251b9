//! Fake providers and scene builders shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rf_core::config::{Config, Credentials};
use rf_core::{SceneItem, ScenePatch, StageError};

use crate::provider::{
    AudioResult, ImageProvider, ImageRequest, ImageResult, RenderProvider, RenderRequest,
    StageProviders, VideoResult, VoiceProvider, VoiceRequest,
};

type Hook = Box<dyn Fn(&str) + Send + Sync>;

/// `count` fresh scenes with scripts "scene 1", "scene 2", ...
pub fn fresh_scenes(count: u32) -> Vec<SceneItem> {
    (0..count)
        .map(|i| SceneItem::new(i, format!("scene {}", i + 1)))
        .collect()
}

/// A scene with an uploaded image and generated narration.
pub fn voiced_scene(order: u32, script: &str) -> SceneItem {
    let mut scene =
        SceneItem::new(order, script).with_uploaded_image(format!("https://img.test/up-{order}.png"));
    ScenePatch::audio(format!("https://audio.test/{order}.mp3")).apply(&mut scene);
    scene
}

pub fn credentials() -> Credentials {
    Credentials {
        image_api_key: Some("image-key".into()),
        voice_api_key: Some("voice-key".into()),
    }
}

/// Config with a voice selected and no inter-item delay.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.voice.voice_id = Some("narrator".into());
    config.pipeline.inter_item_delay_ms = 0;
    config
}

/// Records every call and fails for inputs registered with `failing`.
#[derive(Default)]
struct Script {
    calls: Mutex<Vec<String>>,
    failures: HashMap<String, StageError>,
    delay: Option<Duration>,
    hook: Option<Hook>,
}

impl Script {
    async fn call(&self, input: &str) -> Result<usize, StageError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.to_string());
            calls.len()
        };
        if let Some(hook) = &self.hook {
            hook(input);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(input) {
            Some(error) => Err(error.clone()),
            None => Ok(n),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeImages(Script);

impl FakeImages {
    pub fn failing(mut self, prompt: &str, error: StageError) -> Self {
        self.0.failures.insert(prompt.into(), error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.0.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.0.calls()
    }

    pub fn call_count(&self) -> usize {
        self.0.calls().len()
    }
}

#[async_trait]
impl ImageProvider for FakeImages {
    fn name(&self) -> &'static str {
        "fake-images"
    }

    async fn generate(
        &self,
        request: &ImageRequest<'_>,
        _api_key: &str,
    ) -> Result<ImageResult, StageError> {
        let n = self.0.call(request.prompt).await?;
        Ok(ImageResult {
            image_url: format!("https://img.test/{n}.png"),
        })
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeVoices(Script);

impl FakeVoices {
    pub fn failing(mut self, text: &str, error: StageError) -> Self {
        self.0.failures.insert(text.into(), error);
        self
    }

    /// Run `hook` with the text of every call, before it resolves.
    pub fn with_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.0.hook = Some(Box::new(hook));
        self
    }

    pub fn texts(&self) -> Vec<String> {
        self.0.calls()
    }

    pub fn call_count(&self) -> usize {
        self.0.calls().len()
    }
}

#[async_trait]
impl VoiceProvider for FakeVoices {
    fn name(&self) -> &'static str {
        "fake-voices"
    }

    async fn generate(
        &self,
        request: &VoiceRequest<'_>,
        _api_key: &str,
    ) -> Result<AudioResult, StageError> {
        let n = self.0.call(request.text).await?;
        Ok(AudioResult {
            audio_url: format!("https://audio.test/{n}.mp3"),
        })
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRenders {
    script: Script,
    subtitles: Mutex<Vec<Option<String>>>,
}

impl FakeRenders {
    pub fn failing(mut self, image_url: &str, error: StageError) -> Self {
        self.script.failures.insert(image_url.into(), error);
        self
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.script.calls()
    }

    pub fn subtitles(&self) -> Vec<Option<String>> {
        self.subtitles.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.calls().len()
    }
}

#[async_trait]
impl RenderProvider for FakeRenders {
    fn name(&self) -> &'static str {
        "fake-renders"
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<VideoResult, StageError> {
        self.subtitles
            .lock()
            .unwrap()
            .push(request.subtitles.as_ref().map(|s| s.text.to_string()));
        let n = self.script.call(request.image_url).await?;
        Ok(VideoResult {
            video_url: format!("https://video.test/{n}.mp4"),
        })
    }
}

/// Bundle fakes into the provider set a coordinator takes.
pub fn providers(
    images: &Arc<FakeImages>,
    voices: &Arc<FakeVoices>,
    renders: &Arc<FakeRenders>,
) -> StageProviders {
    StageProviders {
        image: images.clone(),
        voice: voices.clone(),
        render: renders.clone(),
    }
}
