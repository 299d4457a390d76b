//! Narration audio.
//!
//! Speech is produced by the first strategy in a chain that succeeds:
//!
//! ```text
//! hosted:  OpenAI TTS ─┐
//!                      ├─▶ silent track (ffmpeg) ─▶ minimal WAV (hound)
//! local:   espeak ─────┘
//! ```
//!
//! The silent fallbacks keep the video stage alive when no voice is
//! available. Their length is the estimated narration duration, so captions
//! still line up with the picture.

use crate::config::{Backend, GeneratorConfig, Voice};
use crate::error::ReelError;
use crate::pipeline::media::MediaTool;
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Longest input the hosted speech endpoint accepts.
pub const MAX_TTS_CHARS: usize = 4096;

const SAMPLE_RATE: u32 = 44_100;

/// What to say and how.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Voice,
    pub speed: f32,
    /// Expected narration length; sizes the silent fallbacks.
    pub estimated_secs: f64,
}

/// Audio produced for a job.
#[derive(Debug, Clone)]
pub struct SpeechOutput {
    pub path: PathBuf,
    /// Name of the strategy that succeeded.
    pub strategy: &'static str,
    /// `"<strategy>: <error>"` for every strategy that failed first.
    pub failures: Vec<String>,
}

impl SpeechOutput {
    pub fn degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extension of the audio this strategy writes.
    fn extension(&self) -> &'static str;

    async fn synthesize(&self, request: &SpeechRequest, out: &Path) -> Result<(), ReelError>;
}

/// Voices with a one-line description, for `--help` style listings.
pub fn voice_options() -> Vec<(Voice, &'static str)> {
    Voice::ALL.iter().map(|v| (*v, v.description())).collect()
}

/// The strategy chain for `config.backend`.
pub fn speech_chain_for(
    config: &GeneratorConfig,
    media: Arc<dyn MediaTool>,
) -> Result<Vec<Box<dyn SpeechSynthesizer>>, ReelError> {
    let primary: Box<dyn SpeechSynthesizer> = match config.backend {
        Backend::Hosted => Box::new(OpenAiSpeech::new(config)?),
        Backend::Local => Box::new(EspeakSpeech::new(config.speaking_rate.words_per_minute())),
    };
    Ok(vec![
        primary,
        Box::new(SilentTrack::new(media)),
        Box::new(MinimalWav),
    ])
}

/// Try each strategy in order, writing `<work_dir>/<stem>.<ext>`.
pub async fn synthesize_with_fallback(
    chain: &[Box<dyn SpeechSynthesizer>],
    request: &SpeechRequest,
    work_dir: &Path,
    stem: &str,
) -> Result<SpeechOutput, ReelError> {
    tokio::fs::create_dir_all(work_dir)
        .await
        .map_err(|e| ReelError::OutputWriteFailed {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

    let mut failures = Vec::new();
    for strategy in chain {
        let out = work_dir.join(format!("{stem}.{}", strategy.extension()));
        match strategy.synthesize(request, &out).await {
            Ok(()) => {
                if !failures.is_empty() {
                    warn!(
                        "Speech degraded to '{}' after: {}",
                        strategy.name(),
                        failures.join("; ")
                    );
                }
                info!("Audio generated with {}: {}", strategy.name(), out.display());
                return Ok(SpeechOutput {
                    path: out,
                    strategy: strategy.name(),
                    failures,
                });
            }
            Err(e) => {
                warn!("Speech strategy '{}' failed: {}", strategy.name(), e);
                failures.push(format!("{}: {}", strategy.name(), e));
                // leave nothing half-written for the next strategy to trip on
                let _ = tokio::fs::remove_file(&out).await;
            }
        }
    }

    Err(ReelError::SpeechFailed {
        strategy: "all".into(),
        detail: failures.join("; "),
    })
}

// ── OpenAI ───────────────────────────────────────────────────────────────

/// Hosted text-to-speech over HTTP.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiSpeech {
    pub fn new(config: &GeneratorConfig) -> Result<Self, ReelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ReelError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: config.tts_endpoint.clone(),
            model: config.tts_model.clone(),
            api_key: config.openai_api_key.clone(),
        })
    }

    fn fail(&self, detail: impl Into<String>) -> ReelError {
        ReelError::SpeechFailed {
            strategy: self.name().into(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    async fn synthesize(&self, request: &SpeechRequest, out: &Path) -> Result<(), ReelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| self.fail("OPENAI_API_KEY is not set"))?;

        let text = truncate_at_word(&request.text, MAX_TTS_CHARS);
        if text.len() < request.text.len() {
            warn!(
                "Text truncated to {} characters for TTS",
                text.chars().count()
            );
        }

        let body = json!({
            "model": self.model,
            "input": text,
            "voice": request.voice.as_str(),
            "speed": request.speed.clamp(0.25, 4.0),
            "response_format": "mp3",
        });

        debug!("POST {} ({} chars, voice {})", self.endpoint, text.len(), request.voice);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.fail(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.fail(format!("HTTP {status}: {}", detail.trim())));
        }

        let bytes = response.bytes().await.map_err(|e| self.fail(e.to_string()))?;
        if bytes.is_empty() {
            return Err(self.fail("empty audio response"));
        }
        tokio::fs::write(out, &bytes)
            .await
            .map_err(|e| ReelError::OutputWriteFailed {
                path: out.to_path_buf(),
                source: e,
            })
    }
}

/// Cut `text` to at most `max_chars` characters, backing off to the last
/// whitespace so no word is split.
pub fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(ws) if ws > 0 => head[..ws].trim_end(),
        _ => head,
    }
}

// ── espeak ───────────────────────────────────────────────────────────────

/// Local speech through the `espeak` executable.
pub struct EspeakSpeech {
    executable: PathBuf,
    words_per_minute: f64,
}

impl EspeakSpeech {
    pub fn new(words_per_minute: f64) -> Self {
        Self {
            executable: PathBuf::from("espeak"),
            words_per_minute,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSpeech {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, request: &SpeechRequest, out: &Path) -> Result<(), ReelError> {
        let text = clean_tts_text(&request.text);
        if text.is_empty() {
            return Err(ReelError::SpeechFailed {
                strategy: self.name().into(),
                detail: "nothing speakable after cleaning".into(),
            });
        }

        let wpm = (self.words_per_minute * request.speed.clamp(0.25, 4.0) as f64).round() as u32;
        let output = Command::new(&self.executable)
            .arg("-s")
            .arg(wpm.to_string())
            .arg("-w")
            .arg(out)
            .arg(&text)
            .output()
            .await
            .map_err(|e| ReelError::SpeechFailed {
                strategy: self.name().into(),
                detail: format!("cannot run {}: {e}", self.executable.display()),
            })?;

        if !output.status.success() {
            return Err(ReelError::SpeechFailed {
                strategy: self.name().into(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Make script text safe for a plain TTS engine: emoji become words and
/// everything except letters, digits, whitespace and `.,!?` is dropped.
pub fn clean_tts_text(text: &str) -> String {
    const EMOJI_WORDS: [(&str, &str); 12] = [
        ("🧠", " brain "),
        ("🔥", " fire "),
        ("🤯", " mind blown "),
        ("💀", " skull "),
        ("🚀", " rocket "),
        ("📊", " chart "),
        ("📈", " chart "),
        ("🔬", " microscope "),
        ("🧪", " test tube "),
        ("🌟", " star "),
        ("✨", " sparkles "),
        ("💥", " boom "),
    ];

    let mut s = text.to_string();
    for (emoji, word) in EMOJI_WORDS {
        s = s.replace(emoji, word);
    }
    let kept: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ".,!?".contains(*c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Silent fallbacks ─────────────────────────────────────────────────────

/// Silent stereo track rendered by ffmpeg's `anullsrc`.
pub struct SilentTrack {
    media: Arc<dyn MediaTool>,
}

impl SilentTrack {
    pub fn new(media: Arc<dyn MediaTool>) -> Self {
        Self { media }
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentTrack {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, request: &SpeechRequest, out: &Path) -> Result<(), ReelError> {
        let secs = silent_length(request.estimated_secs);
        let args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("anullsrc=channel_layout=stereo:sample_rate={SAMPLE_RATE}"),
            "-t".into(),
            format!("{secs:.3}"),
            "-c:a".into(),
            "pcm_s16le".into(),
            out.to_string_lossy().into_owned(),
        ];
        self.media.run_ffmpeg(&args).await
    }
}

/// Silent 16-bit stereo WAV written directly, with no external tools.
pub struct MinimalWav;

#[async_trait]
impl SpeechSynthesizer for MinimalWav {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, request: &SpeechRequest, out: &Path) -> Result<(), ReelError> {
        let secs = silent_length(request.estimated_secs);
        let path = out.to_path_buf();
        tokio::task::spawn_blocking(move || write_silent_wav(&path, secs))
            .await
            .map_err(|e| ReelError::Internal(format!("WAV task panicked: {e}")))?
    }
}

fn write_silent_wav(path: &Path, secs: f64) -> Result<(), ReelError> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let fail = |e: hound::Error| ReelError::SpeechFailed {
        strategy: "wav".into(),
        detail: e.to_string(),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(fail)?;
    let frames = (secs * SAMPLE_RATE as f64).round() as u64;
    for _ in 0..frames {
        writer.write_sample(0i16).map_err(fail)?;
        writer.write_sample(0i16).map_err(fail)?;
    }
    writer.finalize().map_err(fail)
}

/// At least one second, so ffmpeg always has something to mux.
fn silent_length(estimated_secs: f64) -> f64 {
    if estimated_secs.is_finite() {
        estimated_secs.max(1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Failing(&'static str);

    #[async_trait]
    impl SpeechSynthesizer for Failing {
        fn name(&self) -> &'static str {
            self.0
        }
        fn extension(&self) -> &'static str {
            "mp3"
        }
        async fn synthesize(&self, _: &SpeechRequest, _: &Path) -> Result<(), ReelError> {
            Err(ReelError::SpeechFailed {
                strategy: self.0.into(),
                detail: "HTTP 401".into(),
            })
        }
    }

    fn request(secs: f64) -> SpeechRequest {
        SpeechRequest {
            text: "hello there".into(),
            voice: Voice::Nova,
            speed: 1.0,
            estimated_secs: secs,
        }
    }

    #[test]
    fn cleaning_replaces_emoji_and_strips_symbols() {
        let out = clean_tts_text("🧠 BRAIN-ROT 🔥 time: 100% real?! #science");
        assert_eq!(out, "brain BRAINROT fire time 100 real?! science");
    }

    #[test]
    fn truncation_stops_at_word_boundary() {
        assert_eq!(truncate_at_word("alpha beta gamma", 100), "alpha beta gamma");
        assert_eq!(truncate_at_word("alpha beta gamma", 12), "alpha beta");
        assert_eq!(truncate_at_word("supercalifragilistic", 5), "super");
    }

    #[test]
    fn voice_options_cover_all_voices() {
        let opts = voice_options();
        assert_eq!(opts.len(), 6);
        assert!(opts.iter().any(|(v, d)| *v == Voice::Nova && d.contains("recommended")));
    }

    #[tokio::test]
    async fn minimal_wav_has_expected_format_and_length() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("n.wav");
        MinimalWav.synthesize(&request(2.0), &out).await.unwrap();

        let reader = hound::WavReader::open(&out).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44_100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.duration(), 88_200);
    }

    #[tokio::test]
    async fn chain_falls_through_to_working_strategy() {
        let dir = TempDir::new().unwrap();
        let chain: Vec<Box<dyn SpeechSynthesizer>> =
            vec![Box::new(Failing("openai")), Box::new(MinimalWav)];

        let out = synthesize_with_fallback(&chain, &request(0.2), dir.path(), "job")
            .await
            .unwrap();
        assert_eq!(out.strategy, "wav");
        assert!(out.degraded());
        assert!(out.failures[0].starts_with("openai:"));
        assert_eq!(out.path, dir.path().join("job.wav"));
        assert!(out.path.exists());
    }

    #[tokio::test]
    async fn chain_reports_every_failure() {
        let dir = TempDir::new().unwrap();
        let chain: Vec<Box<dyn SpeechSynthesizer>> =
            vec![Box::new(Failing("a")), Box::new(Failing("b"))];
        let err = synthesize_with_fallback(&chain, &request(1.0), dir.path(), "job")
            .await
            .unwrap_err();
        match err {
            ReelError::SpeechFailed { strategy, detail } => {
                assert_eq!(strategy, "all");
                assert!(detail.contains("a:") && detail.contains("b:"));
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[tokio::test]
    async fn openai_without_key_fails_fast() {
        let config = GeneratorConfig::default();
        let tts = OpenAiSpeech::new(&config).unwrap();
        let dir = TempDir::new().unwrap();
        let err = tts
            .synthesize(&request(1.0), &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
