//! The end-to-end generator: one PDF in, one video (or transcript) out.

use crate::captions::segment;
use crate::config::{GeneratorConfig, Voice};
use crate::error::ReelError;
use crate::output::{write_atomic, BatchSummary, JobMetadata, JobOutput, VideoJob};
use crate::pipeline::background::{BackgroundLibrary, BackgroundSource};
use crate::pipeline::compose::Compositor;
use crate::pipeline::media::{MediaTool, SystemMediaTool};
use crate::pipeline::pdf::{self, PaperContent};
use crate::pipeline::script::{script_writer_for, ScriptWriter};
use crate::pipeline::speech::{
    speech_chain_for, synthesize_with_fallback, SpeechRequest, SpeechSynthesizer,
};
use crate::platform::{optimize, Platform};
use crate::progress::{NoopProgressCallback, ProgressCallback, Stage};
use crate::timing::{estimate_narration_secs, SpeakingRate};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Per-job overrides of the generator's configuration.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Output file name without directory; `.mp4` is added when missing.
    pub output_name: Option<String>,
    /// Background clip to use instead of a random library pick.
    pub background: Option<PathBuf>,
    pub voice: Option<Voice>,
    pub platform: Option<Platform>,
}

/// Owns the configured stages and runs jobs through them.
pub struct Generator {
    config: GeneratorConfig,
    writer: Box<dyn ScriptWriter>,
    speech: Vec<Box<dyn SpeechSynthesizer>>,
    media: Arc<dyn MediaTool>,
    library: BackgroundLibrary,
    compositor: Compositor,
    progress: ProgressCallback,
}

impl Generator {
    /// Build a generator with the stages `config.backend` calls for, using the
    /// system `ffmpeg`/`ffprobe`.
    pub fn new(config: GeneratorConfig) -> Result<Self, ReelError> {
        let media: Arc<dyn MediaTool> = Arc::new(SystemMediaTool::default());
        let writer = script_writer_for(&config)?;
        let speech = speech_chain_for(&config, Arc::clone(&media))?;
        Self::with_components(config, writer, speech, media)
    }

    /// Build a generator from explicit stages.
    pub fn with_components(
        config: GeneratorConfig,
        writer: Box<dyn ScriptWriter>,
        speech: Vec<Box<dyn SpeechSynthesizer>>,
        media: Arc<dyn MediaTool>,
    ) -> Result<Self, ReelError> {
        for dir in [
            config.backgrounds_dir.clone(),
            config.work_dir.join("audio"),
            config.work_dir.join("video"),
            config.output_dir.clone(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| ReelError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        let library = BackgroundLibrary::new(&config.backgrounds_dir);
        let compositor = Compositor::new(
            Arc::clone(&media),
            config.caption_style.clone(),
            config.work_dir.join("video"),
        );
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback) as ProgressCallback);

        info!(
            "Generator ready: backend={}, script writer={}, speech chain=[{}]",
            config.backend,
            writer.name(),
            speech.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );

        Ok(Self {
            config,
            writer,
            speech,
            media,
            library,
            compositor,
            progress,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Turn one PDF into a video, or a transcript when encoding is impossible.
    ///
    /// Input validation and service failures abort the job. Media failures
    /// degrade and are recorded in the returned metadata.
    pub async fn process_pdf(&self, input: &Path, options: &JobOptions) -> Result<JobOutput, ReelError> {
        self.progress.on_job_start(input);
        let start = Instant::now();

        let result: Result<JobOutput, ReelError> = async {
            self.progress.on_stage_start(Stage::Extract);
            let paper = pdf::extract(input, &self.config).await?;
            self.progress.on_stage_complete(Stage::Extract);
            self.run_job(input, &paper, options).await
        }
        .await;
        self.report(input, start, result)
    }

    /// Like [`Generator::process_pdf`] for text that was already extracted.
    ///
    /// `source` names the default output file and is recorded in the sidecar.
    pub async fn process_paper(
        &self,
        source: &Path,
        paper: &PaperContent,
        options: &JobOptions,
    ) -> Result<JobOutput, ReelError> {
        self.progress.on_job_start(source);
        let start = Instant::now();
        let result = self.run_job(source, paper, options).await;
        self.report(source, start, result)
    }

    fn report(
        &self,
        input: &Path,
        start: Instant,
        result: Result<JobOutput, ReelError>,
    ) -> Result<JobOutput, ReelError> {
        match result {
            Ok(ref out) => {
                info!(
                    "Finished {} in {:.1}s -> {}",
                    input.display(),
                    start.elapsed().as_secs_f64(),
                    out.artifact.path().display()
                );
                self.progress.on_job_complete(input, Some(out.artifact.path()));
            }
            Err(ref e) => {
                error!("Failed to process {}: {}", input.display(), e);
                self.progress.on_job_complete(input, None);
            }
        }
        result
    }

    async fn run_job(
        &self,
        input: &Path,
        paper: &PaperContent,
        options: &JobOptions,
    ) -> Result<JobOutput, ReelError> {
        let config = &self.config;
        let mut degradations = Vec::new();

        // ── 1. Script ──
        self.progress.on_stage_start(Stage::Script);
        let mut script = self.writer.write_script(paper).await?;
        let platform = options.platform.or(config.platform);
        if let Some(p) = platform {
            let before = script.script.split_whitespace().count();
            script.script = optimize(&script.script, p, config.speaking_rate);
            let after = script.script.split_whitespace().count();
            if after < before {
                info!("Script trimmed for {}: {} -> {} words", p, before, after);
                let optimal = p.budget().optimal_secs.round() as u32;
                script.duration_secs = script.duration_secs.min(optimal);
            }
        }
        self.progress.on_stage_complete(Stage::Script);

        let output_path = self.output_path(input, options)?;
        let stem = file_stem(&output_path);

        // ── 2. Speech ──
        self.progress.on_stage_start(Stage::Speech);
        let voice = options.voice.unwrap_or(config.voice);
        let speed = config.voice_speed;
        let request = SpeechRequest {
            text: script.script.clone(),
            voice,
            speed,
            estimated_secs: estimate_narration_secs(&script.script, config.speaking_rate, speed),
        };
        let audio = synthesize_with_fallback(
            &self.speech,
            &request,
            &config.work_dir.join("audio"),
            &stem,
        )
        .await?;

        // Everything written to the work dir from here on is removed on every
        // exit path.
        let mut temps = vec![audio.path.clone()];

        let result: Result<JobOutput, ReelError> = async {
            if audio.degraded() {
                let reason = audio.failures.join("; ");
                self.progress
                    .on_stage_degraded(Stage::Speech, audio.strategy, &reason);
                degradations.push(format!("speech fell back to '{}': {}", audio.strategy, reason));
            }

            let audio_duration = match self.media.probe_duration(&audio.path).await {
                Ok(d) => d,
                Err(e) => {
                    warn!(
                        "Could not measure narration length, using the estimate: {}",
                        e
                    );
                    request.estimated_secs.max(1.0)
                }
            };
            self.progress.on_stage_complete(Stage::Speech);

            // ── 3. Video ──
            self.progress.on_stage_start(Stage::Video);
            let narration_rate =
                SpeakingRate::new(config.speaking_rate.words_per_minute() * speed as f64);
            let captions = segment(&script.script, config.words_per_caption, narration_rate);

            let background = match self
                .library
                .resolve(
                    options.background.as_deref(),
                    self.media.as_ref(),
                    &config.work_dir.join("video"),
                    audio_duration,
                )
                .await
            {
                Ok((clip, source)) => {
                    if source == BackgroundSource::Placeholder {
                        degradations.push("background: generated placeholder".to_string());
                        temps.push(clip.source_path.clone());
                    }
                    Some((clip, source))
                }
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            };

            let job = VideoJob {
                audio_path: audio.path.clone(),
                audio_duration,
                captions,
                output_path: output_path.clone(),
                background: background.as_ref().map(|(clip, _)| clip.clone()),
            };
            let composition = self.compositor.compose_reporting(&job, &script).await?;
            if let Some(ref reason) = composition.fallback_reason {
                self.progress.on_stage_degraded(
                    Stage::Video,
                    composition.artifact.strategy(),
                    reason,
                );
                degradations.push(format!("video fell back to transcript: {reason}"));
            }
            self.progress.on_stage_complete(Stage::Video);

            // ── 4. Sidecar ──
            let metadata = JobMetadata {
                source_pdf: input.to_path_buf(),
                title: script.title.clone(),
                script: script.script.clone(),
                hashtags: script.hashtags.clone(),
                platform: platform.map(|p| p.to_string()).unwrap_or_else(|| "none".into()),
                voice: voice.to_string(),
                duration: audio_duration,
                backend: config.backend.to_string(),
                speech_strategy: audio.strategy.to_string(),
                video_strategy: composition.artifact.strategy().to_string(),
                background: match background {
                    Some((clip, BackgroundSource::Explicit | BackgroundSource::Library)) => {
                        Some(clip.source_path)
                    }
                    _ => None,
                },
                artifact: composition.artifact.clone(),
                degradations: std::mem::take(&mut degradations),
                created_at: Local::now(),
            };

            let metadata_path = output_path.with_extension("json");
            let json = serde_json::to_vec_pretty(&metadata)
                .map_err(|e| ReelError::Internal(format!("metadata serialization: {e}")))?;
            write_atomic(&metadata_path, &json).await?;

            Ok(JobOutput {
                artifact: composition.artifact,
                metadata_path,
                metadata,
            })
        }
        .await;

        // ── 5. Cleanup ──
        for path in &temps {
            remove_temp(path).await;
        }
        result
    }

    /// Process `inputs` one after another; a failed input does not stop the
    /// batch. `options.output_name` is ignored so outputs don't collide.
    pub async fn batch_process(&self, inputs: &[PathBuf], options: &JobOptions) -> BatchSummary {
        let per_job = JobOptions {
            output_name: None,
            ..options.clone()
        };

        let mut summary = BatchSummary::default();
        for (i, input) in inputs.iter().enumerate() {
            info!("Processing {}/{}: {}", i + 1, inputs.len(), input.display());
            match self.process_pdf(input, &per_job).await {
                Ok(out) => summary.outputs.push(out),
                Err(e) => summary.failures.push((input.clone(), e.to_string())),
            }
        }

        info!(
            "Batch processing complete: {}/{} successful",
            summary.succeeded(),
            summary.total()
        );
        summary
    }

    /// Copy clips into the background library; returns how many were added.
    pub async fn add_background_videos(&self, files: &[PathBuf]) -> Result<usize, ReelError> {
        self.library.add(files).await
    }

    /// File names in the background library.
    pub fn list_backgrounds(&self) -> Result<Vec<String>, ReelError> {
        Ok(self
            .library
            .available()?
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect())
    }

    /// `<output_dir>/<name>.mp4`, defaulting the name to
    /// `<pdf stem>_<YYYYmmdd_HHMMSS>`. A caller-supplied name must be a plain
    /// file name.
    fn output_path(&self, input: &Path, options: &JobOptions) -> Result<PathBuf, ReelError> {
        let name = match options.output_name {
            Some(ref n) if !n.trim().is_empty() => {
                let n = n.trim();
                check_output_name(n)?;
                n.strip_suffix(".mp4").unwrap_or(n).to_string()
            }
            _ => format!(
                "{}_{}",
                file_stem(input),
                Local::now().format("%Y%m%d_%H%M%S")
            ),
        };
        Ok(self.config.output_dir.join(format!("{name}.mp4")))
    }
}

/// Reject names that would leave the output directory.
fn check_output_name(name: &str) -> Result<(), ReelError> {
    let plain = Path::new(name)
        .file_name()
        .is_some_and(|f| f == std::ffi::OsStr::new(name));
    if !plain || name.contains(['/', '\\']) {
        return Err(ReelError::InvalidConfig(format!(
            "output name '{name}' must be a file name without directories"
        )));
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to clean up temp file {}: {}", path.display(), e);
    }
}
