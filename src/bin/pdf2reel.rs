//! CLI binary for pdf2reel.
//!
//! Maps flags onto the layered `GeneratorConfig` and drives a `Generator`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2reel::pipeline::speech::voice_options;
use pdf2reel::{
    Backend, GenerationProgressCallback, Generator, GeneratorConfig, JobOptions, Platform,
    ProgressCallback, Stage, Voice,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "pdf2reel.log";

// ── ANSI colour helpers ─────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_job_start(&self, input: &Path) {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        self.bar.set_prefix(name);
        self.bar.reset_elapsed();
    }

    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.label()));
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar
            .println(format!("  {} {}", green("✓"), stage.label()));
    }

    fn on_stage_degraded(&self, stage: Stage, strategy: &str, reason: &str) {
        let reason = if reason.chars().count() > 100 {
            let cut: String = reason.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} {}: using {}  {}",
            yellow("⚠"),
            stage.label(),
            bold(strategy),
            dim(&reason)
        ));
    }

    fn on_job_complete(&self, input: &Path, artifact: Option<&Path>) {
        match artifact {
            Some(path) => self.bar.println(format!(
                "{} {}  →  {}",
                green("✔"),
                input.display(),
                bold(&path.display().to_string())
            )),
            None => self
                .bar
                .println(format!("{} {}", red("✘"), input.display())),
        }
    }
}

fn after_help() -> String {
    let mut voices = String::new();
    for (voice, description) in voice_options() {
        voices.push_str(&format!("  {:<9} {}\n", voice.as_str(), description));
    }

    format!(
        r#"EXAMPLES:
  # Minimal
  pdf2reel paper.pdf

  # Named output, YouTube Shorts budget, deep voice
  pdf2reel paper.pdf -o attention_reel -p youtube -v onyx

  # Everything local (Ollama + espeak)
  pdf2reel --backend local paper.pdf

  # Several papers in one go
  pdf2reel --batch a.pdf b.pdf c.pdf

  # Manage background clips
  pdf2reel --add-backgrounds gameplay1.mp4 gameplay2.mp4
  pdf2reel --list-backgrounds

VOICES:
{voices}
ENVIRONMENT VARIABLES:
  OPENAI_API_KEY     OpenAI API key (hosted backend)
  OPENAI_MODEL       Chat model for scripts (default gpt-4o-mini)
  LOCAL_MODEL        Ollama model for the local backend (default llama2)
  TTS_SERVICE        openai | local
  TTS_VOICE          Default voice
  TTS_SPEED          Speech speed, 0.25-4.0
  MAX_DURATION       Target script length in seconds
  WORDS_PER_CAPTION  Words per caption
  PLATFORM           tiktok | instagram | youtube
  WORDS_PER_MINUTE   Speaking rate used for timing
  PDFIUM_LIB_PATH    Directory or file of the pdfium library
  RUST_LOG           Log filter, overrides --verbose/--quiet

Settings are layered: defaults, then environment, then the JSON config file
(--config, else ./config.json), then flags.
"#
    )
}

/// Turn research papers into narrated short-form vertical videos.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2reel",
    version,
    about = "Turn research papers (PDF) into narrated short-form vertical videos",
    color = clap::ColorChoice::Auto,
    after_long_help = after_help()
)]
struct Cli {
    /// PDF to process.
    #[arg(conflicts_with = "input_file")]
    input: Option<PathBuf>,

    /// PDF to process (alternative to the positional argument).
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Output file name, without directory.
    #[arg(short, long)]
    output: Option<String>,

    /// Narration voice: alloy, echo, fable, onyx, nova, shimmer.
    #[arg(short, long)]
    voice: Option<String>,

    /// Target platform: tiktok, instagram, youtube, or none.
    #[arg(short, long)]
    platform: Option<String>,

    /// Background clip to use instead of a random library pick.
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Process several PDFs in sequence.
    #[arg(long, num_args = 1.., value_name = "FILES")]
    batch: Vec<PathBuf>,

    /// Copy video clips into the background library.
    #[arg(long, num_args = 1.., value_name = "FILES")]
    add_backgrounds: Vec<PathBuf>,

    /// List the clips in the background library.
    #[arg(long)]
    list_backgrounds: bool,

    /// Service backend: hosted (OpenAI) or local (Ollama + espeak).
    #[arg(long)]
    backend: Option<String>,

    /// Script model for the selected backend.
    #[arg(long)]
    model: Option<String>,

    /// JSON config file (default: ./config.json when present).
    #[arg(long, env = "PDF2REEL_CONFIG")]
    config: Option<PathBuf>,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2REEL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(long, env = "PDF2REEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2REEL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GeneratorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    init_logging(&cli, &config.work_dir);

    let show_progress = !cli.quiet && !cli.no_progress;
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let config = apply_flags(
        &cli,
        config,
        progress.clone().map(|p| p as ProgressCallback),
    )?;

    if config.backend == Backend::Hosted && config.openai_api_key.is_none() {
        bail!(
            "OPENAI_API_KEY is not set.\n\
             Export it (export OPENAI_API_KEY=sk-...) or use --backend local."
        );
    }

    let generator = Generator::new(config).context("Failed to initialize generator")?;

    let result = run(&cli, &generator).await;
    if let Some(p) = progress {
        p.finish();
    }
    result
}

async fn run(cli: &Cli, generator: &Generator) -> Result<()> {
    // ── Library management ───────────────────────────────────────────────
    if !cli.add_backgrounds.is_empty() {
        let added = generator
            .add_background_videos(&cli.add_backgrounds)
            .await
            .context("Failed to add background videos")?;
        if !cli.quiet {
            eprintln!("{} Added {} background video(s)", green("✔"), added);
        }
        return Ok(());
    }

    if cli.list_backgrounds {
        let clips = generator
            .list_backgrounds()
            .context("Failed to list background videos")?;
        if clips.is_empty() {
            eprintln!(
                "No background videos in {}",
                generator.config().backgrounds_dir.display()
            );
        } else {
            for clip in clips {
                println!("{clip}");
            }
        }
        return Ok(());
    }

    let options = JobOptions {
        output_name: cli.output.clone(),
        background: cli.background.clone(),
        ..Default::default()
    };

    // ── Batch ────────────────────────────────────────────────────────────
    if !cli.batch.is_empty() {
        let summary = generator.batch_process(&cli.batch, &options).await;
        for out in &summary.outputs {
            println!("{}", out.artifact.path().display());
        }
        for (input, error) in &summary.failures {
            eprintln!("{} {}: {}", red("✘"), input.display(), error);
        }
        if !cli.quiet {
            eprintln!(
                "Batch processing complete: {}/{} successful",
                bold(&summary.succeeded().to_string()),
                summary.total()
            );
        }
        if summary.succeeded() == 0 {
            bail!("No input produced an artifact");
        }
        return Ok(());
    }

    // ── Single input ─────────────────────────────────────────────────────
    let Some(input) = cli.input.as_ref().or(cli.input_file.as_ref()) else {
        bail!("No input PDF given. Run `pdf2reel --help` for usage.");
    };

    let out = generator
        .process_pdf(input, &options)
        .await
        .with_context(|| format!("Failed to process {}", input.display()))?;

    println!("{}", out.artifact.path().display());
    if !cli.quiet {
        if out.artifact.is_video() {
            eprintln!("{} Video: {}", green("✔"), bold(&out.artifact.path().display().to_string()));
        } else {
            eprintln!(
                "{} Video encoding was not possible; wrote the script to {}",
                yellow("⚠"),
                bold(&out.artifact.path().display().to_string())
            );
        }
        eprintln!(
            "   {}  {:.1}s narration  {}",
            dim(&out.metadata.title),
            out.metadata.duration,
            dim(&out.metadata_path.display().to_string())
        );
    }
    Ok(())
}

/// stderr at the level picked by the flags, plus a plain-text copy in the
/// work directory.
fn init_logging(cli: &Cli, work_dir: &Path) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if !cli.no_progress {
        // the spinner carries the per-stage feedback
        "warn"
    } else {
        "info"
    };
    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stderr_filter);

    let file_layer = std::fs::create_dir_all(work_dir)
        .and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(work_dir.join(LOG_FILE))
        })
        .map_err(|e| eprintln!("Could not open log file in {}: {e}", work_dir.display()))
        .ok()
        .map(|file| {
            let file_level = if cli.verbose { "debug" } else { "info" };
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(file_level))
        });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// CLI flags are the highest-precedence configuration layer.
fn apply_flags(
    cli: &Cli,
    config: GeneratorConfig,
    progress: Option<ProgressCallback>,
) -> Result<GeneratorConfig> {
    let mut builder = config.to_builder();
    let mut backend = config.backend;

    if let Some(ref name) = cli.backend {
        backend = name.parse::<Backend>().context("Invalid --backend")?;
        builder = builder.backend(backend);
    }
    if let Some(ref model) = cli.model {
        builder = match backend {
            Backend::Hosted => builder.model(model.as_str()),
            Backend::Local => builder.local_model(model.as_str()),
        };
    }
    if let Some(ref voice) = cli.voice {
        builder = builder.voice(Voice::parse_or_default(voice));
    }
    if let Some(ref platform) = cli.platform {
        let platform = if platform.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(
                platform
                    .parse::<Platform>()
                    .map_err(anyhow::Error::msg)
                    .context("Invalid --platform")?,
            )
        };
        builder = builder.platform(platform);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
