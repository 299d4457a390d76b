//! Error types for the pdf2reel library.
//!
//! [`ReelError`] is the single fatal error type returned by every stage.
//! [`ReelError::kind`] folds the variants into the four policy classes the
//! generator acts on:
//!
//! * [`ErrorKind::InputValidation`]: abort the job immediately.
//! * [`ErrorKind::ExternalService`]: retried where the stage allows it, then
//!   abort this job only (batch mode carries on with the next input).
//! * [`ErrorKind::Encoding`]: degrade to the text-script fallback.
//! * [`ErrorKind::ResourceMissing`]: no background could be found or made;
//!   also degrades to the text-script fallback.
//!
//! Degradations are never silent: each one is logged and recorded in the
//! job's sidecar metadata.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification used to decide how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    ExternalService,
    Encoding,
    ResourceMissing,
    Internal,
}

/// All fatal errors returned by the pdf2reel library.
#[derive(Debug, Error)]
pub enum ReelError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The file exists but is not a PDF (wrong extension or magic bytes).
    #[error("File is not a PDF: '{path}' ({reason})")]
    NotAPdf { path: PathBuf, reason: String },

    /// The PDF exceeds the configured size limit.
    #[error("File too large: '{path}' ({size_mb:.1}MB > {limit_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: f64,
        limit_mb: u64,
    },

    /// The document has no pages.
    #[error("PDF '{path}' has no pages")]
    EmptyPdf { path: PathBuf },

    /// No text layer, typically a scanned (image-only) document.
    #[error("PDF '{path}' appears to be image-only or has no extractable text")]
    NoExtractableText { path: PathBuf },

    /// pdfium could not parse the document.
    #[error("PDF '{path}' is corrupt or encrypted: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── External services ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Script generation failed after all retries.
    #[error("Script generation failed after {attempts} attempt(s): {detail}")]
    SummarizationFailed { attempts: u32, detail: String },

    /// Every speech strategy in the chain failed.
    #[error("Speech synthesis failed ({strategy}): {detail}")]
    SpeechFailed { strategy: String, detail: String },

    // ── Media ─────────────────────────────────────────────────────────────
    /// ffmpeg returned a non-zero status or produced no output.
    #[error("Video encoding failed: {detail}")]
    EncodingFailed { detail: String },

    /// An external media tool could not be launched.
    #[error("'{tool}' is not available: {detail}\nInstall it and make sure it is on PATH.")]
    ToolUnavailable { tool: String, detail: String },

    /// ffprobe could not read the media file.
    #[error("Could not probe '{path}': {detail}")]
    ProbeFailed { path: PathBuf, detail: String },

    /// No background was given, the library is empty and no placeholder
    /// could be generated.
    #[error("No background video available: {detail}\nAdd some with --add-backgrounds.")]
    NoBackgroundAvailable { detail: String },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder or config-file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReelError {
    pub fn kind(&self) -> ErrorKind {
        use ReelError::*;
        match self {
            FileNotFound { .. }
            | NotAPdf { .. }
            | FileTooLarge { .. }
            | EmptyPdf { .. }
            | NoExtractableText { .. }
            | CorruptPdf { .. } => ErrorKind::InputValidation,
            ProviderNotConfigured { .. } | SummarizationFailed { .. } | SpeechFailed { .. } => {
                ErrorKind::ExternalService
            }
            EncodingFailed { .. } | ToolUnavailable { .. } | ProbeFailed { .. } => {
                ErrorKind::Encoding
            }
            NoBackgroundAvailable { .. } => ErrorKind::ResourceMissing,
            OutputWriteFailed { .. } | InvalidConfig(_) | PdfiumBindingFailed(_) | Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the video stage should fall back to a text transcript.
    pub fn degrades_to_transcript(&self) -> bool {
        matches!(self.kind(), ErrorKind::Encoding | ErrorKind::ResourceMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = ReelError::FileTooLarge {
            path: "big.pdf".into(),
            size_mb: 73.31,
            limit_mb: 50,
        };
        let msg = e.to_string();
        assert!(msg.contains("73.3MB > 50MB"), "got: {msg}");
    }

    #[test]
    fn summarization_failed_display() {
        let e = ReelError::SummarizationFailed {
            attempts: 3,
            detail: "HTTP 503".into(),
        };
        assert!(e.to_string().contains("3 attempt(s)"));
        assert!(e.to_string().contains("HTTP 503"));
    }

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(
            ReelError::NoExtractableText { path: "a.pdf".into() }.kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            ReelError::SpeechFailed {
                strategy: "openai".into(),
                detail: "401".into()
            }
            .kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            ReelError::EncodingFailed { detail: "x".into() }.kind(),
            ErrorKind::Encoding
        );
        assert_eq!(
            ReelError::NoBackgroundAvailable { detail: "x".into() }.kind(),
            ErrorKind::ResourceMissing
        );
    }

    #[test]
    fn only_media_failures_degrade() {
        assert!(ReelError::EncodingFailed { detail: "x".into() }.degrades_to_transcript());
        assert!(ReelError::NoBackgroundAvailable { detail: "x".into() }.degrades_to_transcript());
        assert!(!ReelError::InvalidConfig("x".into()).degrades_to_transcript());
        assert!(!ReelError::FileNotFound { path: "x".into() }.degrades_to_transcript());
    }
}
