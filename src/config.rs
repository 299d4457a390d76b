//! Configuration types for PDF-to-video generation.
//!
//! All generator behaviour is controlled through [`GeneratorConfig`], built
//! via its [`GeneratorConfigBuilder`]. Values are layered, lowest precedence
//! first:
//!
//! 1. built-in defaults ([`GeneratorConfig::default`])
//! 2. environment variables ([`ConfigOverrides::from_env`])
//! 3. a JSON config file ([`ConfigOverrides::from_json_file`])
//! 4. explicit builder calls (the CLI maps its flags onto these)
//!
//! [`GeneratorConfig::load`] performs steps 1–3.

use crate::captions::CaptionStyle;
use crate::error::ReelError;
use crate::platform::Platform;
use crate::progress::ProgressCallback;
use crate::timing::{SpeakingRate, DEFAULT_WORDS_PER_MINUTE};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default hosted chat model.
pub const DEFAULT_HOSTED_MODEL: &str = "gpt-4o-mini";
/// Default model served by the local Ollama instance.
pub const DEFAULT_LOCAL_MODEL: &str = "llama2";
/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Which family of external services the pipeline talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OpenAI chat completions + OpenAI text-to-speech.
    #[default]
    Hosted,
    /// Local Ollama model + the `espeak` speech engine.
    Local,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Hosted => "hosted",
            Backend::Local => "local",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hosted" | "openai" => Ok(Backend::Hosted),
            "local" | "ollama" | "espeak" => Ok(Backend::Local),
            other => Err(ReelError::InvalidConfig(format!(
                "unknown TTS service / backend '{other}' (expected openai or local)"
            ))),
        }
    }
}

/// Narration voices offered by the hosted speech API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    #[default]
    Nova,
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Voice::Alloy => "Neutral, balanced tone",
            Voice::Echo => "Warm, conversational",
            Voice::Fable => "Expressive, energetic",
            Voice::Onyx => "Deep, authoritative",
            Voice::Nova => "Friendly, upbeat (recommended)",
            Voice::Shimmer => "Soft, gentle",
        }
    }

    /// Parse a voice name, falling back to [`Voice::Nova`] with a warning.
    pub fn parse_or_default(name: &str) -> Voice {
        name.parse().unwrap_or_else(|_| {
            warn!("Invalid voice '{}', using nova", name);
            Voice::Nova
        })
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("unknown voice '{s}'"))
    }
}

/// Configuration for a generator run.
///
/// # Example
/// ```rust
/// use pdf2reel::{GeneratorConfig, Platform};
///
/// let config = GeneratorConfig::builder()
///     .platform(Some(Platform::YouTube))
///     .words_per_caption(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.words_per_caption, 4);
/// ```
#[derive(Clone)]
pub struct GeneratorConfig {
    /// Hosted (OpenAI) or local (Ollama + espeak) services. Default: hosted.
    pub backend: Backend,

    /// Chat model for the hosted backend. Default: `gpt-4o-mini`.
    pub model: String,

    /// Model name served by Ollama for the local backend. Default: `llama2`.
    pub local_model: String,

    /// Pre-constructed LLM provider. Takes precedence over `backend` when
    /// resolving the script writer's provider.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// API key for OpenAI text-to-speech. Read from `OPENAI_API_KEY`.
    pub openai_api_key: Option<String>,

    /// Sampling temperature for script generation. Default: 0.8.
    pub temperature: f32,

    /// Maximum tokens for one script completion. Default: 1000.
    pub max_tokens: usize,

    /// Attempts at the summarization call, first try included. Default: 3.
    pub max_attempts: u32,

    /// First retry delay in milliseconds; doubles per attempt. Default: 4000.
    pub retry_backoff_ms: u64,

    /// Upper bound on a single retry delay. Default: 10000.
    pub retry_backoff_max_ms: u64,

    /// Characters of paper text sent to the model. Default: 8000.
    pub max_input_chars: usize,

    /// Narration voice. Default: nova.
    pub voice: Voice,

    /// TTS speed multiplier, 0.25–4.0. Default: 1.0.
    pub voice_speed: f32,

    /// Hosted TTS model. Default: `tts-1-hd`.
    pub tts_model: String,

    /// Hosted TTS endpoint.
    pub tts_endpoint: String,

    /// Length the script writer aims for, in seconds. Default: 180.
    pub max_duration_secs: u32,

    /// Words shown per caption. Default: 5.
    pub words_per_caption: usize,

    /// Platform whose duration budget the script is trimmed to.
    /// `None` leaves the script untouched. Default: TikTok.
    pub platform: Option<Platform>,

    /// Speaking rate shared by captions, truncation and duration estimates.
    pub speaking_rate: SpeakingRate,

    /// Caption look.
    pub caption_style: CaptionStyle,

    /// Library of background clips. Default: `backgrounds`.
    pub backgrounds_dir: PathBuf,

    /// Scratch directory for audio and caption tracks. Default: `temp`.
    pub work_dir: PathBuf,

    /// Where videos and sidecars are written. Default: `output`.
    pub output_dir: PathBuf,

    /// Pages read from each PDF. Default: 50.
    pub max_pdf_pages: usize,

    /// Largest accepted PDF in megabytes. Default: 50.
    pub max_pdf_size_mb: u64,

    /// Timeout for each hosted HTTP request in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: DEFAULT_HOSTED_MODEL.to_string(),
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            provider: None,
            openai_api_key: None,
            temperature: 0.8,
            max_tokens: 1000,
            max_attempts: 3,
            retry_backoff_ms: 4000,
            retry_backoff_max_ms: 10_000,
            max_input_chars: 8000,
            voice: Voice::default(),
            voice_speed: 1.0,
            tts_model: "tts-1-hd".to_string(),
            tts_endpoint: "https://api.openai.com/v1/audio/speech".to_string(),
            max_duration_secs: 180,
            words_per_caption: 5,
            platform: Some(Platform::default()),
            speaking_rate: SpeakingRate::default(),
            caption_style: CaptionStyle::default(),
            backgrounds_dir: PathBuf::from("backgrounds"),
            work_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("output"),
            max_pdf_pages: 50,
            max_pdf_size_mb: 50,
            api_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("local_model", &self.local_model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_attempts", &self.max_attempts)
            .field("voice", &self.voice)
            .field("voice_speed", &self.voice_speed)
            .field("max_duration_secs", &self.max_duration_secs)
            .field("words_per_caption", &self.words_per_caption)
            .field("platform", &self.platform)
            .field("speaking_rate", &self.speaking_rate)
            .field("backgrounds_dir", &self.backgrounds_dir)
            .field("work_dir", &self.work_dir)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, then environment variables, then the JSON file at
    /// `config_path` (or `./config.json` when it exists).
    pub fn load(config_path: Option<&Path>) -> Result<Self, ReelError> {
        let mut overrides = ConfigOverrides::from_env()?;

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = match config_path {
            Some(p) => Some(p),
            None if default_path.exists() => Some(default_path),
            None => None,
        };
        if let Some(path) = path {
            debug!("Loading config file {}", path.display());
            overrides = overrides.merge(ConfigOverrides::from_json_file(path)?);
        }

        let mut config = overrides.apply(Self::builder())?.build()?;
        config.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        Ok(config)
    }

    /// Builder pre-populated with this config's values.
    pub fn to_builder(&self) -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: self.clone(),
        }
    }
}

/// Builder for [`GeneratorConfig`].
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl fmt::Debug for GeneratorConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GeneratorConfigBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn local_model(mut self, model: impl Into<String>) -> Self {
        self.config.local_model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn retry_backoff_max_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_max_ms = ms;
        self
    }

    pub fn voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    /// Clamped to the 0.25–4.0 range the speech API accepts.
    pub fn voice_speed(mut self, speed: f32) -> Self {
        let clamped = speed.clamp(0.25, 4.0);
        if clamped != speed {
            warn!("Speed adjusted to {}", clamped);
        }
        self.config.voice_speed = clamped;
        self
    }

    pub fn max_duration_secs(mut self, secs: u32) -> Self {
        self.config.max_duration_secs = secs;
        self
    }

    pub fn words_per_caption(mut self, n: usize) -> Self {
        self.config.words_per_caption = n.max(1);
        self
    }

    pub fn platform(mut self, platform: Option<Platform>) -> Self {
        self.config.platform = platform;
        self
    }

    pub fn speaking_rate(mut self, rate: SpeakingRate) -> Self {
        self.config.speaking_rate = rate;
        self
    }

    pub fn caption_style(mut self, style: CaptionStyle) -> Self {
        self.config.caption_style = style;
        self
    }

    pub fn backgrounds_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.backgrounds_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn max_pdf_pages(mut self, n: usize) -> Self {
        self.config.max_pdf_pages = n.max(1);
        self
    }

    pub fn tts_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.tts_endpoint = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, ReelError> {
        let c = &self.config;
        if c.max_duration_secs == 0 {
            return Err(ReelError::InvalidConfig(
                "max_duration must be at least 1 second".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ReelError::InvalidConfig("model must not be empty".into()));
        }
        if c.retry_backoff_max_ms < c.retry_backoff_ms {
            return Err(ReelError::InvalidConfig(format!(
                "retry backoff cap ({}ms) is below the initial delay ({}ms)",
                c.retry_backoff_max_ms, c.retry_backoff_ms
            )));
        }
        Ok(self.config)
    }
}

// ── Overrides (env + JSON) ───────────────────────────────────────────────

/// Partial configuration read from the environment or a JSON file.
///
/// Every field is optional; [`ConfigOverrides::merge`] lets a later layer
/// replace only the keys it actually sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub openai_model: Option<String>,
    pub local_model: Option<String>,
    /// `openai` selects the hosted backend, `local` the local one.
    pub tts_service: Option<String>,
    pub voice: Option<String>,
    pub voice_speed: Option<f32>,
    pub max_duration: Option<u32>,
    pub words_per_caption: Option<usize>,
    pub platform: Option<String>,
    pub words_per_minute: Option<f64>,
    pub backgrounds_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ReelError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, so tests need not touch the real
    /// environment. Empty values are ignored.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ReelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            openai_model: get("OPENAI_MODEL"),
            local_model: get("LOCAL_MODEL"),
            tts_service: get("TTS_SERVICE"),
            voice: get("TTS_VOICE"),
            voice_speed: parse_env(&get, "TTS_SPEED")?,
            max_duration: parse_env(&get, "MAX_DURATION")?,
            words_per_caption: parse_env(&get, "WORDS_PER_CAPTION")?,
            platform: get("PLATFORM"),
            words_per_minute: parse_env(&get, "WORDS_PER_MINUTE")?,
            backgrounds_dir: get("BACKGROUNDS_DIR").map(PathBuf::from),
            work_dir: get("WORK_DIR").map(PathBuf::from),
            output_dir: get("OUTPUT_DIR").map(PathBuf::from),
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ReelError> {
        serde_json::from_str(raw)
            .map_err(|e| ReelError::InvalidConfig(format!("config JSON: {e}")))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ReelError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReelError::InvalidConfig(format!("cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Combine two layers; keys set in `higher` win.
    pub fn merge(self, higher: ConfigOverrides) -> ConfigOverrides {
        ConfigOverrides {
            openai_model: higher.openai_model.or(self.openai_model),
            local_model: higher.local_model.or(self.local_model),
            tts_service: higher.tts_service.or(self.tts_service),
            voice: higher.voice.or(self.voice),
            voice_speed: higher.voice_speed.or(self.voice_speed),
            max_duration: higher.max_duration.or(self.max_duration),
            words_per_caption: higher.words_per_caption.or(self.words_per_caption),
            platform: higher.platform.or(self.platform),
            words_per_minute: higher.words_per_minute.or(self.words_per_minute),
            backgrounds_dir: higher.backgrounds_dir.or(self.backgrounds_dir),
            work_dir: higher.work_dir.or(self.work_dir),
            output_dir: higher.output_dir.or(self.output_dir),
        }
    }

    /// Apply the keys that are set onto `builder`.
    ///
    /// An unknown platform name disables platform trimming (with a warning)
    /// rather than failing, matching how the optimizer treats unknown names.
    pub fn apply(&self, mut builder: GeneratorConfigBuilder) -> Result<GeneratorConfigBuilder, ReelError> {
        if let Some(ref m) = self.openai_model {
            builder = builder.model(m.clone());
        }
        if let Some(ref m) = self.local_model {
            builder = builder.local_model(m.clone());
        }
        if let Some(ref s) = self.tts_service {
            builder = builder.backend(s.parse()?);
        }
        if let Some(ref v) = self.voice {
            builder = builder.voice(Voice::parse_or_default(v));
        }
        if let Some(speed) = self.voice_speed {
            builder = builder.voice_speed(speed);
        }
        if let Some(secs) = self.max_duration {
            builder = builder.max_duration_secs(secs);
        }
        if let Some(n) = self.words_per_caption {
            builder = builder.words_per_caption(n);
        }
        if let Some(ref p) = self.platform {
            let platform = match p.parse::<Platform>() {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!("{e}; script will not be trimmed to a platform budget");
                    None
                }
            };
            builder = builder.platform(platform);
        }
        if let Some(wpm) = self.words_per_minute {
            if wpm <= 0.0 || !wpm.is_finite() {
                return Err(ReelError::InvalidConfig(format!(
                    "words_per_minute must be positive, got {wpm} (default {DEFAULT_WORDS_PER_MINUTE})"
                )));
            }
            builder = builder.speaking_rate(SpeakingRate::new(wpm));
        }
        if let Some(ref d) = self.backgrounds_dir {
            builder = builder.backgrounds_dir(d.clone());
        }
        if let Some(ref d) = self.work_dir {
            builder = builder.work_dir(d.clone());
        }
        if let Some(ref d) = self.output_dir {
            builder = builder.output_dir(d.clone());
        }
        Ok(builder)
    }
}

fn parse_env<T, F>(get: &F, key: &str) -> Result<Option<T>, ReelError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ReelError::InvalidConfig(format!("{key}='{raw}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = GeneratorConfig::default();
        assert_eq!(c.model, "gpt-4o-mini");
        assert_eq!(c.voice, Voice::Nova);
        assert_eq!(c.voice_speed, 1.0);
        assert_eq!(c.max_duration_secs, 180);
        assert_eq!(c.words_per_caption, 5);
        assert_eq!(c.platform, Some(Platform::TikTok));
        assert_eq!(c.speaking_rate.words_per_minute(), 150.0);
        assert_eq!(c.max_attempts, 3);
    }

    #[test]
    fn env_overrides_parse() {
        let o = ConfigOverrides::from_env_with(env(&[
            ("OPENAI_MODEL", "gpt-4o"),
            ("TTS_SPEED", "1.25"),
            ("MAX_DURATION", "60"),
            ("WORDS_PER_CAPTION", "3"),
            ("PLATFORM", "youtube"),
            ("TTS_VOICE", ""),
        ]))
        .unwrap();
        assert_eq!(o.openai_model.as_deref(), Some("gpt-4o"));
        assert_eq!(o.voice_speed, Some(1.25));
        assert_eq!(o.max_duration, Some(60));
        assert_eq!(o.words_per_caption, Some(3));
        assert_eq!(o.voice, None, "empty values are ignored");
    }

    #[test]
    fn malformed_env_value_is_rejected() {
        let err = ConfigOverrides::from_env_with(env(&[("MAX_DURATION", "three minutes")]))
            .unwrap_err();
        assert!(matches!(err, ReelError::InvalidConfig(ref m) if m.contains("MAX_DURATION")));
    }

    #[test]
    fn json_layer_wins_over_env() {
        let from_env = ConfigOverrides::from_env_with(env(&[
            ("TTS_VOICE", "onyx"),
            ("PLATFORM", "tiktok"),
        ]))
        .unwrap();
        let from_file =
            ConfigOverrides::from_json_str(r#"{"platform": "instagram", "max_duration": 90}"#)
                .unwrap();
        let merged = from_env.merge(from_file);
        let config = merged.apply(GeneratorConfig::builder()).unwrap().build().unwrap();
        assert_eq!(config.voice, Voice::Onyx);
        assert_eq!(config.platform, Some(Platform::Instagram));
        assert_eq!(config.max_duration_secs, 90);
    }

    #[test]
    fn unknown_platform_disables_trimming() {
        let o = ConfigOverrides::from_json_str(r#"{"platform": "myspace"}"#).unwrap();
        let config = o.apply(GeneratorConfig::builder()).unwrap().build().unwrap();
        assert_eq!(config.platform, None);
    }

    #[test]
    fn tts_service_selects_backend() {
        let o = ConfigOverrides::from_json_str(r#"{"tts_service": "local"}"#).unwrap();
        let config = o.apply(GeneratorConfig::builder()).unwrap().build().unwrap();
        assert_eq!(config.backend, Backend::Local);

        let bad = ConfigOverrides::from_json_str(r#"{"tts_service": "elevenlabs"}"#).unwrap();
        assert!(bad.apply(GeneratorConfig::builder()).is_err());
    }

    #[test]
    fn invalid_voice_falls_back_to_nova() {
        assert_eq!(Voice::parse_or_default("Shimmer"), Voice::Shimmer);
        assert_eq!(Voice::parse_or_default("gandalf"), Voice::Nova);
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = GeneratorConfig::builder()
            .voice_speed(9.0)
            .words_per_caption(0)
            .build()
            .unwrap();
        assert_eq!(c.voice_speed, 4.0);
        assert_eq!(c.words_per_caption, 1);

        assert!(GeneratorConfig::builder().max_duration_secs(0).build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = GeneratorConfig::builder()
            .openai_api_key("sk-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
