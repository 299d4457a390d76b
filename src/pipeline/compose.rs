//! Final assembly: background + burnt-in captions + narration → MP4.
//!
//! Layering (bottom to top):
//!
//! ```text
//! z=1  captions   ASS track, one event per segment, visible [start, end)
//! z=0  background crop → 1080×1920, looped with -stream_loop, cut with -t
//! ──── audio      narration, muxed with -shortest
//! ```
//!
//! When encoding fails, or there was no background to encode, the job still
//! produces something: a plain-text script next to where the video would
//! have been.

use crate::captions::{to_ass, CaptionStyle};
use crate::error::ReelError;
use crate::output::{write_atomic, Artifact, VideoJob, VideoScript};
use crate::pipeline::background::{prepare, PreparedBackground, OUTPUT_HEIGHT, OUTPUT_WIDTH};
use crate::pipeline::media::MediaTool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const FRAME_RATE: u32 = 30;
pub const VIDEO_BITRATE: &str = "8000k";
pub const X264_PRESET: &str = "medium";

const TRANSCRIPT_HEADER: &str = "🧠 BRAINROT RESEARCH VIDEO SCRIPT 🧠";
const TRANSCRIPT_RULE_WIDTH: usize = 50;
const TRANSCRIPT_DEFAULT_STYLE: &str = "brainrot";

/// Result of [`Compositor::compose_reporting`].
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub artifact: Artifact,
    /// Why the video was replaced by a transcript, if it was.
    pub fallback_reason: Option<String>,
}

pub struct Compositor {
    media: Arc<dyn MediaTool>,
    style: CaptionStyle,
    work_dir: PathBuf,
}

impl Compositor {
    /// Caption tracks are written into `work_dir`.
    pub fn new(media: Arc<dyn MediaTool>, style: CaptionStyle, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            media,
            style,
            work_dir: work_dir.into(),
        }
    }

    /// Encode `job`, falling back to a transcript of `script`.
    pub async fn compose(&self, job: &VideoJob, script: &VideoScript) -> Result<Artifact, ReelError> {
        self.compose_reporting(job, script).await.map(|c| c.artifact)
    }

    /// Like [`Compositor::compose`], also reporting why a fallback happened.
    ///
    /// Encoding and missing-resource errors degrade to the transcript; any
    /// other error is returned.
    pub async fn compose_reporting(
        &self,
        job: &VideoJob,
        script: &VideoScript,
    ) -> Result<Composition, ReelError> {
        let attempt = match job.background {
            Some(ref clip) => {
                let plan = prepare(clip, job.audio_duration);
                self.encode(job, &plan).await
            }
            None => Err(ReelError::NoBackgroundAvailable {
                detail: "no background clip was resolved".into(),
            }),
        };

        match attempt {
            Ok(()) => {
                info!("Video created: {}", job.output_path.display());
                Ok(Composition {
                    artifact: Artifact::Video(job.output_path.clone()),
                    fallback_reason: None,
                })
            }
            Err(e) if e.degrades_to_transcript() => {
                warn!("Video generation failed, writing script instead: {}", e);
                let path = write_transcript(&job.output_path, script, job.audio_duration).await?;
                info!("Created detailed script file: {}", path.display());
                Ok(Composition {
                    artifact: Artifact::Transcript(path),
                    fallback_reason: Some(e.to_string()),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn encode(&self, job: &VideoJob, plan: &PreparedBackground) -> Result<(), ReelError> {
        // scratch-space failures count as encoding failures
        let scratch = |path: &Path, e: std::io::Error| ReelError::EncodingFailed {
            detail: format!("cannot prepare {}: {e}", path.display()),
        };

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| scratch(self.work_dir.as_path(), e))?;
        if let Some(parent) = job.output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| scratch(parent, e))?;
        }

        let stem = job
            .output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "captions".to_string());
        let ass_path = self.work_dir.join(format!("{stem}.ass"));
        let ass = to_ass(&job.captions, &self.style, OUTPUT_WIDTH, OUTPUT_HEIGHT);
        tokio::fs::write(&ass_path, ass)
            .await
            .map_err(|e| scratch(ass_path.as_path(), e))?;

        let args = encode_args(plan, &job.audio_path, &ass_path, &job.output_path);
        let result = self.media.run_ffmpeg(&args).await;

        if let Err(e) = tokio::fs::remove_file(&ass_path).await {
            warn!("Could not remove caption track {}: {}", ass_path.display(), e);
        }
        result
    }
}

/// ffmpeg arguments for the final encode.
pub fn encode_args(
    plan: &PreparedBackground,
    audio: &Path,
    captions: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into()];

    let extra_loops = plan.stream_loop_count();
    if extra_loops > 0 {
        args.push("-stream_loop".into());
        args.push(extra_loops.to_string());
    }

    let filter = format!(
        "[0:v]{},subtitles='{}'[v]",
        plan.filter_chain(),
        escape_filter_path(captions)
    );

    let source = plan.clip.source_path.to_string_lossy().into_owned();
    let audio = audio.to_string_lossy().into_owned();
    let duration = format!("{:.3}", plan.target_duration);
    let rate = FRAME_RATE.to_string();
    let output = output.to_string_lossy().into_owned();

    args.extend(
        [
            "-i",
            source.as_str(),
            "-i",
            audio.as_str(),
            "-filter_complex",
            filter.as_str(),
            "-map",
            "[v]",
            "-map",
            "1:a",
            "-t",
            duration.as_str(),
            "-r",
            rate.as_str(),
            "-c:v",
            "libx264",
            "-preset",
            X264_PRESET,
            "-b:v",
            VIDEO_BITRATE,
            "-c:a",
            "aac",
            "-pix_fmt",
            "yuv420p",
            "-shortest",
            output.as_str(),
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    args
}

/// Escape a path for use inside a quoted filtergraph option value.
fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "'\\''")
}

/// `<dir>/<stem>_detailed_script.txt` for an intended video path.
pub fn transcript_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    video_path.with_file_name(format!("{stem}_detailed_script.txt"))
}

/// Plain-text stand-in for a video.
///
/// The duration is the script's declared length, or the narration length
/// when the writer declared none.
pub fn render_transcript(script: &VideoScript, narration_secs: f64) -> String {
    let rule = "=".repeat(TRANSCRIPT_RULE_WIDTH);
    let duration = if script.duration_secs > 0 {
        script.duration_secs as u64
    } else {
        narration_secs.max(0.0).round() as u64
    };
    let style = if script.style.is_empty() {
        TRANSCRIPT_DEFAULT_STYLE
    } else {
        &script.style
    };

    let mut out = String::new();
    out.push_str(TRANSCRIPT_HEADER);
    out.push('\n');
    out.push_str(&rule);
    out.push_str("\n\n");
    out.push_str(&script.script);
    out.push_str("\n\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Duration: {duration} seconds\n"));
    out.push_str(&format!("Style: {style}\n"));
    out.push_str("\nVisual Cues:\n");
    for (i, cue) in script.visual_cues.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, cue));
    }
    out
}

async fn write_transcript(
    video_path: &Path,
    script: &VideoScript,
    narration_secs: f64,
) -> Result<PathBuf, ReelError> {
    let path = transcript_path(video_path);
    write_atomic(&path, render_transcript(script, narration_secs).as_bytes()).await?;
    Ok(path)
}
