//! # pdf2reel
//!
//! Turn research papers (PDF) into narrated, captioned vertical videos for
//! short-form platforms.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract  validate the file, pull text via pdfium (spawn_blocking)
//!  ├─ 2. Script   hosted LLM (JSON, retried) or local template writer
//!  ├─ 3. Trim     cut the script to the platform's duration budget
//!  ├─ 4. Speech   OpenAI TTS / espeak → silent track → minimal WAV
//!  ├─ 5. Video    background crop/loop + burnt-in captions via ffmpeg
//!  └─ 6. Output   MP4 (or a text transcript) + JSON sidecar
//! ```
//!
//! Steps 4 and 5 never fail a job on their own: when a strategy fails the
//! next one is tried, and the fallback is recorded in the sidecar.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2reel::{Generator, GeneratorConfig, JobOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Environment, then ./config.json, then defaults.
//!     let config = GeneratorConfig::load(None)?;
//!     let generator = Generator::new(config)?;
//!     let out = generator
//!         .process_pdf(Path::new("paper.pdf"), &JobOptions::default())
//!         .await?;
//!     println!("{}", out.artifact.path().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2reel` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External tools
//!
//! `ffmpeg` and `ffprobe` must be on `PATH` for video output; without them
//! every job ends in a transcript. The local backend also wants `espeak`
//! and an Ollama server. pdfium is located via `PDFIUM_LIB_PATH` or the
//! system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod captions;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod prompts;
pub mod timing;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use captions::{CaptionSegment, CaptionStyle};
pub use config::{Backend, ConfigOverrides, GeneratorConfig, GeneratorConfigBuilder, Voice};
pub use error::{ErrorKind, ReelError};
pub use generate::{Generator, JobOptions};
pub use output::{Artifact, BatchSummary, JobMetadata, JobOutput, VideoScript};
pub use platform::Platform;
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use timing::SpeakingRate;
