//! Result types produced by a generation job.

use crate::captions::CaptionSegment;
use crate::error::ReelError;
use crate::pipeline::background::BackgroundClip;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Narration script plus the metadata a script writer attaches to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoScript {
    pub title: String,
    /// Opening line meant to stop the scroll.
    #[serde(default)]
    pub hook: String,
    /// The narration itself. This is what gets spoken and captioned.
    pub script: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Intended length in seconds as declared by the writer.
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub visual_cues: Vec<String>,
    #[serde(default)]
    pub style: String,
}

/// Inputs for one compositing run.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub audio_path: PathBuf,
    /// Length of the narration track in seconds; the background is cut to it.
    pub audio_duration: f64,
    pub captions: Vec<CaptionSegment>,
    pub output_path: PathBuf,
    pub background: Option<BackgroundClip>,
}

/// What a job actually produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Artifact {
    /// The encoded MP4.
    Video(PathBuf),
    /// Text-script fallback written when encoding could not complete.
    Transcript(PathBuf),
}

impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Artifact::Video(p) | Artifact::Transcript(p) => p,
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Artifact::Video(_))
    }

    /// Strategy name recorded in the sidecar.
    pub fn strategy(&self) -> &'static str {
        match self {
            Artifact::Video(_) => "ffmpeg",
            Artifact::Transcript(_) => "transcript",
        }
    }
}

/// Sidecar JSON written next to every artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub source_pdf: PathBuf,
    pub title: String,
    pub script: String,
    pub hashtags: Vec<String>,
    /// Platform name, or `"none"` when no budget was applied.
    pub platform: String,
    pub voice: String,
    /// Narration length in seconds.
    pub duration: f64,
    pub backend: String,
    /// Speech strategy that produced the audio (`openai`, `espeak`, `silent`, `wav`).
    pub speech_strategy: String,
    /// `ffmpeg` or `transcript`.
    pub video_strategy: String,
    /// Background clip used, absent when none was resolved.
    pub background: Option<PathBuf>,
    pub artifact: Artifact,
    /// Human-readable notes about every fallback taken.
    #[serde(default)]
    pub degradations: Vec<String>,
    pub created_at: DateTime<Local>,
}

/// Returned by [`crate::Generator::process_pdf`].
#[derive(Debug, Clone)]
pub struct JobOutput {
    pub artifact: Artifact,
    pub metadata_path: PathBuf,
    pub metadata: JobMetadata,
}

/// Outcome of [`crate::Generator::batch_process`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outputs: Vec<JobOutput>,
    /// Inputs that failed, with the error message.
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outputs.len()
    }
}

/// Write `contents` to `path` via a sibling temp file and a rename, creating
/// parent directories as needed.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReelError> {
    let fail = |e: std::io::Error| ReelError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(fail)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(fail)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(fail)
}
