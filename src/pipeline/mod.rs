//! Pipeline stages for PDF-to-video generation.
//!
//! Each submodule implements one step. Steps that talk to the outside world
//! sit behind a trait so they can be swapped per backend or faked in tests.
//!
//! ## Data Flow
//!
//! ```text
//! pdf ──▶ script ──▶ speech ──▶ compose
//!                                  ▲
//!              background ─────────┘
//! ```
//!
//! 1. [`pdf`]: validate the file and extract text; pdfium runs in
//!    `spawn_blocking`
//! 2. [`script`]: [`script::ScriptWriter`], hosted JSON writer with
//!    retry, or the local template writer
//! 3. [`speech`]: [`speech::SpeechSynthesizer`] chain ending in silent
//!    fallbacks
//! 4. [`background`]: library lookup, placeholder generation, crop/loop plan
//! 5. [`compose`]: caption track + ffmpeg encode, or a transcript
//!
//! [`media`] is the ffmpeg/ffprobe seam shared by stages 3–5.

pub mod background;
pub mod compose;
pub mod media;
pub mod pdf;
pub mod script;
pub mod speech;
