//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! batch settings, per-stage generation settings, and provider endpoints.
//! Every section defaults sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable overriding the image provider API key.
pub const IMAGE_API_KEY_ENV: &str = "REELFORGE_IMAGE_API_KEY";
/// Environment variable overriding the voice provider API key.
pub const VOICE_API_KEY_ENV: &str = "REELFORGE_VOICE_API_KEY";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub image: ImageStageConfig,
    pub voice: VoiceStageConfig,
    pub render: RenderStageConfig,
    pub providers: ProvidersConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.pipeline.inter_item_delay_ms == 0 {
            warnings.push(
                "pipeline.inter_item_delay_ms is 0; providers may rate-limit the batch".into(),
            );
        }
        if self.pipeline.call_timeout_secs == Some(0) {
            warnings.push("pipeline.call_timeout_secs is 0; every call will time out".into());
        }

        if !(0.5..=2.0).contains(&self.voice.speed) {
            warnings.push(format!(
                "voice.speed {} is outside the supported range 0.5-2.0",
                self.voice.speed
            ));
        }
        if self.voice.voice_id.as_deref().map_or(true, |v| v.trim().is_empty()) {
            warnings.push("voice.voice_id is not set; the voice stage will refuse to run".into());
        }

        if self.render.ken_burns.enabled && self.render.ken_burns.zoom < 1.0 {
            warnings.push(format!(
                "render.ken_burns.zoom {} is below 1.0",
                self.render.ken_burns.zoom
            ));
        }

        for (name, provider) in [
            ("image", &self.providers.image),
            ("voice", &self.providers.voice),
            ("render", &self.providers.render),
        ] {
            if provider.base_url.trim().is_empty() {
                warnings.push(format!("providers.{name}.base_url is empty"));
            }
            if provider.requests_per_second == Some(0) {
                warnings.push(format!(
                    "providers.{name}.requests_per_second is 0; rate limiting disabled"
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Batch settings
// ---------------------------------------------------------------------------

/// Settings applied to every batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between provider calls, to respect provider rate limits.
    #[serde(default = "default_inter_item_delay")]
    pub inter_item_delay_ms: u64,
    /// Skip scenes whose stage output already exists.
    #[serde(default = "default_true")]
    pub skip_if_done: bool,
    /// Upper bound for a single provider call. `null` disables the bound.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: Option<u64>,
}

fn default_inter_item_delay() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_call_timeout() -> Option<u64> {
    Some(300)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_item_delay_ms: default_inter_item_delay(),
            skip_if_done: true,
            call_timeout_secs: default_call_timeout(),
        }
    }
}

impl PipelineConfig {
    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// Stage settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Standard => "4:3",
            AspectRatio::StandardPortrait => "3:4",
        }
    }
}

/// Image stage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStageConfig {
    pub aspect_ratio: AspectRatio,
    /// Appended to every prompt, e.g. "cinematic lighting, 35mm".
    pub style_prompt: Option<String>,
}

/// Voice stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceStageConfig {
    pub voice_id: Option<String>,
    #[serde(default = "default_speed")]
    pub speed: f32,
    pub emotion: Option<String>,
}

fn default_speed() -> f32 {
    1.0
}

impl Default for VoiceStageConfig {
    fn default() -> Self {
        Self {
            voice_id: None,
            speed: default_speed(),
            emotion: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    None,
    #[default]
    Fade,
    Slide,
    Zoom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    #[default]
    In,
    Out,
    Left,
    Right,
}

/// Slow pan/zoom applied to the still image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KenBurnsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    pub direction: PanDirection,
}

fn default_zoom() -> f32 {
    1.15
}

impl Default for KenBurnsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zoom: default_zoom(),
            direction: PanDirection::In,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitlePosition {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Burned-in subtitle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    pub position: SubtitlePosition,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_font_size() -> u32 {
    48
}
fn default_color() -> String {
    "#FFFFFF".into()
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size: default_font_size(),
            position: SubtitlePosition::Bottom,
            color: default_color(),
        }
    }
}

/// Render stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStageConfig {
    pub transition: Transition,
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u32,
    pub ken_burns: KenBurnsConfig,
    pub subtitles: SubtitleConfig,
}

fn default_transition_ms() -> u32 {
    500
}

impl Default for RenderStageConfig {
    fn default() -> Self {
        Self {
            transition: Transition::Fade,
            transition_ms: default_transition_ms(),
            ken_burns: KenBurnsConfig::default(),
            subtitles: SubtitleConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Endpoint settings for one HTTP provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Token-bucket quota; `None` means no client-side limiting.
    pub requests_per_second: Option<u32>,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_provider_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            requests_per_second: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub image: ProviderConfig,
    pub voice: ProviderConfig,
    pub render: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            image: ProviderConfig {
                base_url: "https://api.example-images.dev/v1".into(),
                requests_per_second: Some(2),
                ..ProviderConfig::default()
            },
            voice: ProviderConfig {
                base_url: "https://api.example-voice.dev/v1".into(),
                requests_per_second: Some(2),
                ..ProviderConfig::default()
            },
            render: ProviderConfig {
                base_url: "http://127.0.0.1:8700".into(),
                timeout_secs: 600,
                ..ProviderConfig::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Provider API keys for one run. Read-only input to the pipeline.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub image_api_key: Option<String>,
    pub voice_api_key: Option<String>,
}

impl Credentials {
    /// Keys as written in the config file.
    pub fn from_config(config: &Config) -> Self {
        Self {
            image_api_key: config.providers.image.api_key.clone(),
            voice_api_key: config.providers.voice.api_key.clone(),
        }
    }

    /// Replace keys with the environment values where those are set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(IMAGE_API_KEY_ENV) {
            self.image_api_key = Some(key);
        }
        if let Ok(key) = std::env::var(VOICE_API_KEY_ENV) {
            self.voice_api_key = Some(key);
        }
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("image_api_key", &redact(&self.image_api_key))
            .field("voice_api_key", &redact(&self.voice_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn configured() -> Config {
        let mut cfg = Config::default();
        cfg.voice.voice_id = Some("narrator".into());
        cfg
    }

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.pipeline.inter_item_delay_ms, 1000);
        assert!(cfg.pipeline.skip_if_done);
        assert_eq!(cfg.pipeline.call_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(cfg.image.aspect_ratio, AspectRatio::Portrait);
        assert_eq!(cfg.render.transition, Transition::Fade);
        assert!((cfg.render.ken_burns.zoom - 1.15).abs() < f32::EPSILON);
    }

    #[test]
    fn configured_defaults_have_no_warnings() {
        let warnings = configured().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn missing_voice_warns() {
        let warnings = Config::default().validate();
        assert!(warnings.iter().any(|w| w.contains("voice_id")));
    }

    #[test]
    fn out_of_range_speed_warns() {
        let mut cfg = configured();
        cfg.voice.speed = 3.0;
        assert!(cfg.validate().iter().any(|w| w.contains("voice.speed")));
    }

    #[test]
    fn empty_base_url_warns() {
        let mut cfg = configured();
        cfg.providers.render.base_url.clear();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.contains("providers.render.base_url")));
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{
            "pipeline": {"inter_item_delay_ms": 250, "call_timeout_secs": null},
            "image": {"aspect_ratio": "16:9"},
            "render": {"transition": "slide", "subtitles": {"position": "top"}}
        }"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.pipeline.inter_item_delay(), Duration::from_millis(250));
        assert_eq!(cfg.pipeline.call_timeout(), None);
        assert!(cfg.pipeline.skip_if_done);
        assert_eq!(cfg.image.aspect_ratio, AspectRatio::Landscape);
        assert_eq!(cfg.render.transition, Transition::Slide);
        assert_eq!(cfg.render.subtitles.position, SubtitlePosition::Top);
        assert_eq!(cfg.render.subtitles.font_size, 48);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.pipeline.inter_item_delay_ms, 1000);
        assert_eq!(cfg.providers.render.timeout_secs, 600);
    }

    #[test]
    fn invalid_json_is_a_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/reelforge.json")));
        assert_eq!(cfg.pipeline.inter_item_delay_ms, 1000);
    }

    #[test]
    fn load_or_default_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"voice": {{"voice_id": "alloy", "speed": 1.25}}}}"#).unwrap();
        let cfg = Config::load_or_default(Some(file.path()));
        assert_eq!(cfg.voice.voice_id.as_deref(), Some("alloy"));
        assert!((cfg.voice.speed - 1.25).abs() < f32::EPSILON);
    }

    #[test]
    fn credentials_debug_redacts_keys() {
        let creds = Credentials {
            image_api_key: Some("sk-secret".into()),
            voice_api_key: None,
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("sk-secret"));
        assert!(shown.contains("<redacted>"));
    }
}
