//! Script generation: turn extracted paper text into a narration script.
//!
//! Two writers implement [`ScriptWriter`]:
//!
//! * [`HostedScriptWriter`] asks a chat model for a JSON script and retries
//!   with exponential backoff. This is the only retried call in the pipeline.
//! * [`LocalScriptWriter`] asks a local model for a short analysis (falling
//!   back to a rule-based one) and pours it into a fixed template.
//!
//! ## Retry Strategy
//!
//! Delay before retry `n` is `retry_backoff_ms * 2^(n-1)`, capped at
//! `retry_backoff_max_ms`. With the defaults (3 attempts, 4 s base, 10 s cap)
//! the waits are 4 s then 8 s.

use crate::config::{Backend, GeneratorConfig};
use crate::error::ReelError;
use crate::output::VideoScript;
use crate::pipeline::pdf::PaperContent;
use crate::prompts::{
    analysis_prompt, script_user_prompt, simple_analysis, template_script, ScriptParts,
    SCRIPT_SYSTEM_PROMPT, TEMPLATE_DURATION_SECS, TEMPLATE_STYLE, TEMPLATE_VISUAL_CUES,
};
use crate::timing::SpeakingRate;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Style tag attached to scripts from the hosted writer.
pub const HOSTED_STYLE: &str = "viral_explainer";

/// Produces a [`VideoScript`] from a paper.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Short name recorded in logs.
    fn name(&self) -> &'static str;

    async fn write_script(&self, paper: &PaperContent) -> Result<VideoScript, ReelError>;
}

/// Build the writer for `config.backend`.
///
/// A pre-built `config.provider` is used as-is by either writer. Otherwise
/// the hosted writer requires an OpenAI provider, while the local writer
/// tolerates a missing Ollama and falls back to rule-based analysis.
pub fn script_writer_for(config: &GeneratorConfig) -> Result<Box<dyn ScriptWriter>, ReelError> {
    match config.backend {
        Backend::Hosted => {
            let provider = match config.provider {
                Some(ref p) => Arc::clone(p),
                None => create_provider("openai", &config.model)?,
            };
            Ok(Box::new(HostedScriptWriter::new(provider, config)))
        }
        Backend::Local => {
            let provider = match config.provider {
                Some(ref p) => Some(Arc::clone(p)),
                None => match create_provider("ollama", &config.local_model) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!("Local model unavailable, using rule-based analysis: {}", e);
                        None
                    }
                },
            };
            Ok(Box::new(LocalScriptWriter::new(provider)))
        }
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReelError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReelError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

// ── Retry ────────────────────────────────────────────────────────────────

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff_ms: config.retry_backoff_ms,
            max_backoff_ms: config.retry_backoff_max_ms,
        }
    }

    /// Delay before the `retry`-th retry (1-based).
    pub fn backoff_ms(&self, retry: u32) -> u64 {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms)
    }
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// `op` receives the 1-based attempt number. On exhaustion the last error is
/// returned as [`ReelError::SummarizationFailed`].
pub async fn retry_with_backoff<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, ReelError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut last_err = String::from("no attempt made");

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            let backoff = policy.backoff_ms(attempt - 1);
            warn!(
                "Script generation: retry {}/{} after {}ms",
                attempt - 1,
                policy.max_attempts - 1,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Script generation: attempt {} failed: {}", attempt, e);
                last_err = e;
            }
        }
    }

    Err(ReelError::SummarizationFailed {
        attempts: policy.max_attempts,
        detail: last_err,
    })
}

// ── Hosted writer ────────────────────────────────────────────────────────

/// JSON-mode script writer backed by a chat model.
pub struct HostedScriptWriter {
    provider: Arc<dyn LLMProvider>,
    policy: RetryPolicy,
    options: CompletionOptions,
    max_input_chars: usize,
    max_duration_secs: u32,
    rate: SpeakingRate,
}

impl HostedScriptWriter {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GeneratorConfig) -> Self {
        Self {
            provider,
            policy: RetryPolicy::from_config(config),
            options: CompletionOptions {
                temperature: Some(config.temperature),
                max_tokens: Some(config.max_tokens),
                ..Default::default()
            },
            max_input_chars: config.max_input_chars,
            max_duration_secs: config.max_duration_secs,
            rate: config.speaking_rate,
        }
    }

    /// Word count the prompt asks for.
    pub fn target_words(&self) -> usize {
        self.rate.words_for_secs(self.max_duration_secs as f64)
    }
}

#[async_trait]
impl ScriptWriter for HostedScriptWriter {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn write_script(&self, paper: &PaperContent) -> Result<VideoScript, ReelError> {
        let text = truncate_chars(&paper.full_text, self.max_input_chars);
        let messages = vec![
            ChatMessage::system(SCRIPT_SYSTEM_PROMPT),
            ChatMessage::user(script_user_prompt(
                text,
                self.target_words(),
                self.max_duration_secs,
            )),
        ];

        let provider = &self.provider;
        let options = &self.options;
        let messages = &messages;
        let duration_secs = self.max_duration_secs;

        let script = retry_with_backoff(self.policy, move |_attempt| async move {
            let response = provider
                .chat(messages, Some(options))
                .await
                .map_err(|e| e.to_string())?;
            debug!(
                "Script response: {} input tokens, {} output tokens",
                response.prompt_tokens, response.completion_tokens
            );
            parse_script_response(&response.content, duration_secs)
        })
        .await?;

        info!(
            "Generated script with {} words",
            script.script.split_whitespace().count()
        );
        Ok(script)
    }
}

/// Parse a model reply into a [`VideoScript`].
///
/// Tolerates markdown fences and chatter around the JSON object. `title` and
/// `script` must be present and non-empty. `hashtags` may be a list or a
/// single space- or comma-separated string.
pub fn parse_script_response(raw: &str, duration_secs: u32) -> Result<VideoScript, String> {
    let start = raw.find('{').ok_or("response contains no JSON object")?;
    let end = raw.rfind('}').ok_or("response contains no JSON object")?;
    if end < start {
        return Err("response contains no JSON object".into());
    }

    let value: Value =
        serde_json::from_str(&raw[start..=end]).map_err(|e| format!("invalid JSON: {e}"))?;

    let field = |key: &str| -> Option<String> {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let title = field("title").ok_or("missing required field 'title'")?;
    let script = field("script").ok_or("missing required field 'script'")?;
    let hook = field("hook").unwrap_or_default();

    let hashtags = match value.get("hashtags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(VideoScript {
        title,
        hook,
        script,
        hashtags,
        duration_secs,
        visual_cues: Vec::new(),
        style: HOSTED_STYLE.to_string(),
    })
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Local writer ─────────────────────────────────────────────────────────

/// Template script writer; the model only contributes an analysis.
pub struct LocalScriptWriter {
    provider: Option<Arc<dyn LLMProvider>>,
}

impl LocalScriptWriter {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>) -> Self {
        Self { provider }
    }

    async fn analyze(&self, paper: &PaperContent) -> String {
        let Some(ref provider) = self.provider else {
            return simple_analysis(&paper.title);
        };

        let messages = vec![ChatMessage::user(analysis_prompt(
            &paper.title,
            &paper.abstract_text,
        ))];
        match provider.chat(&messages, None).await {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => {
                warn!("Local model returned an empty analysis, using rule-based analysis");
                simple_analysis(&paper.title)
            }
            Err(e) => {
                warn!("Local model analysis failed, using rule-based analysis: {}", e);
                simple_analysis(&paper.title)
            }
        }
    }
}

#[async_trait]
impl ScriptWriter for LocalScriptWriter {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn write_script(&self, paper: &PaperContent) -> Result<VideoScript, ReelError> {
        let analysis = self.analyze(paper).await;
        Ok(template_video_script(&paper.title, &analysis))
    }
}

/// The local writer's output for a given title and analysis.
pub fn template_video_script(title: &str, analysis: &str) -> VideoScript {
    let parts = ScriptParts::from_analysis(title, analysis);
    let script = template_script(title, &parts);
    let hook = script.split("\n\n").next().unwrap_or_default().to_string();

    VideoScript {
        title: title.to_string(),
        hook,
        script,
        hashtags: Vec::new(),
        duration_secs: TEMPLATE_DURATION_SECS,
        visual_cues: TEMPLATE_VISUAL_CUES.iter().map(|c| c.to_string()).collect(),
        style: TEMPLATE_STYLE.to_string(),
    }
}
