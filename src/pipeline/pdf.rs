//! PDF validation and text extraction via pdfium.
//!
//! Extraction runs inside `spawn_blocking`: pdfium is a C++ library with
//! thread-local state and must not be driven from an async worker thread.
//!
//! The file-level checks ([`check_file`]) and the text heuristics
//! ([`clean_text`], [`PaperContent::from_text`]) are pure so they can be
//! tested without a pdfium binary.

use crate::config::GeneratorConfig;
use crate::error::ReelError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Minimum characters of text the first page must carry.
pub const MIN_FIRST_PAGE_CHARS: usize = 10;

/// Lines taken after the "abstract" marker.
const ABSTRACT_LINES: usize = 9;

const FALLBACK_TITLE: &str = "Research Paper";

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static EXCESS_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Text and rough structure pulled out of a paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperContent {
    pub title: String,
    pub abstract_text: String,
    pub full_text: String,
    pub word_count: usize,
    pub page_count: usize,
}

impl PaperContent {
    /// Derive title and abstract from already-cleaned text.
    ///
    /// Title is the first non-empty line. The abstract is the nine lines
    /// following the first line that mentions "abstract", joined by spaces.
    pub fn from_text(full_text: String, page_count: usize) -> Self {
        let lines: Vec<&str> = full_text.lines().collect();

        let title = lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or(FALLBACK_TITLE)
            .to_string();

        let abstract_text = lines
            .iter()
            .position(|l| l.to_lowercase().contains("abstract"))
            .map(|i| {
                lines
                    .iter()
                    .skip(i + 1)
                    .take(ABSTRACT_LINES)
                    .map(|l| l.trim())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim()
                    .to_string()
            })
            .unwrap_or_default();

        let word_count = full_text.split_whitespace().count();

        Self {
            title,
            abstract_text,
            full_text,
            word_count,
            page_count,
        }
    }
}

/// Collapse 3+ newlines to a blank line, runs of spaces to one, and trim.
pub fn clean_text(raw: &str) -> String {
    let text = EXCESS_NEWLINES.replace_all(raw, "\n\n");
    let text = EXCESS_SPACES.replace_all(&text, " ");
    text.trim().to_string()
}

/// Checks that need no PDF parser: existence, extension, magic bytes, size.
pub fn check_file(path: &Path, max_size_mb: u64) -> Result<(), ReelError> {
    if !path.exists() {
        return Err(ReelError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let is_pdf_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf_ext {
        return Err(ReelError::NotAPdf {
            path: path.to_path_buf(),
            reason: "extension is not .pdf".into(),
        });
    }

    let mut file = std::fs::File::open(path).map_err(|_| ReelError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() || &magic != b"%PDF" {
        return Err(ReelError::NotAPdf {
            path: path.to_path_buf(),
            reason: "missing %PDF header".into(),
        });
    }

    let size = file
        .metadata()
        .map_err(|e| ReelError::Internal(format!("stat {}: {e}", path.display())))?
        .len();
    let size_mb = size as f64 / (1024.0 * 1024.0);
    if size_mb > max_size_mb as f64 {
        return Err(ReelError::FileTooLarge {
            path: path.to_path_buf(),
            size_mb,
            limit_mb: max_size_mb,
        });
    }

    Ok(())
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` (file or directory) first, then the
/// system library search path.
pub fn bind_pdfium() -> Result<Pdfium, ReelError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let p = PathBuf::from(p);
            let lib = if p.is_dir() {
                p.join(Pdfium::pdfium_platform_library_name())
            } else {
                p
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ReelError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Validate `path` and extract its text.
pub async fn extract(path: &Path, config: &GeneratorConfig) -> Result<PaperContent, ReelError> {
    check_file(path, config.max_pdf_size_mb)?;

    let owned = path.to_path_buf();
    let max_pages = config.max_pdf_pages;

    let (pages, page_count) =
        tokio::task::spawn_blocking(move || extract_pages_blocking(&owned, max_pages))
            .await
            .map_err(|e| ReelError::Internal(format!("Extraction task panicked: {e}")))??;

    let joined = pages.join("\n\n");
    let full_text = clean_text(&joined);
    if full_text.is_empty() {
        return Err(ReelError::NoExtractableText {
            path: path.to_path_buf(),
        });
    }

    let content = PaperContent::from_text(full_text, page_count);
    info!(
        "Extracted {} characters ({} words) from {} page(s)",
        content.full_text.len(),
        content.word_count,
        page_count
    );
    Ok(content)
}

/// Returns the non-empty page texts (first `max_pages` pages) and the total
/// page count.
fn extract_pages_blocking(path: &Path, max_pages: usize) -> Result<(Vec<String>, usize), ReelError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ReelError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let page_count = pages.len() as usize;
    if page_count == 0 {
        return Err(ReelError::EmptyPdf {
            path: path.to_path_buf(),
        });
    }
    info!("PDF loaded: {} pages", page_count);

    let mut texts = Vec::new();
    for (i, page) in pages.iter().enumerate().take(max_pages) {
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                warn!("Failed to extract text from page {}: {:?}", i + 1, e);
                String::new()
            }
        };

        if i == 0 && text.trim().chars().count() < MIN_FIRST_PAGE_CHARS {
            return Err(ReelError::NoExtractableText {
                path: path.to_path_buf(),
            });
        }

        if !text.trim().is_empty() {
            debug!("Extracted text from page {}", i + 1);
            texts.push(text);
        }
    }

    Ok((texts, page_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn clean_text_collapses_whitespace() {
        let raw = "  Title\n\n\n\nBody   text  here\n\n\nEnd  ";
        assert_eq!(clean_text(raw), "Title\n\nBody text here\n\nEnd");
    }

    #[test]
    fn title_and_abstract_heuristic() {
        let text = "\n  Attention Is All You Need  \nA. Author\nAbstract\n\
                    l1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\nl9\nl10\nIntroduction";
        let paper = PaperContent::from_text(text.to_string(), 11);
        assert_eq!(paper.title, "Attention Is All You Need");
        assert_eq!(paper.abstract_text, "l1 l2 l3 l4 l5 l6 l7 l8 l9");
        assert_eq!(paper.page_count, 11);
    }

    #[test]
    fn missing_abstract_and_title_fall_back() {
        let paper = PaperContent::from_text(String::new(), 1);
        assert_eq!(paper.title, "Research Paper");
        assert_eq!(paper.abstract_text, "");
        assert_eq!(paper.word_count, 0);
    }

    #[test]
    fn check_file_rejects_missing_and_wrong_type() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("nope.pdf");
        assert!(matches!(
            check_file(&missing, 50),
            Err(ReelError::FileNotFound { .. })
        ));

        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "%PDF-1.7 but a txt").unwrap();
        assert!(matches!(check_file(&txt, 50), Err(ReelError::NotAPdf { .. })));

        let fake = dir.path().join("fake.pdf");
        std::fs::write(&fake, "<html>not a pdf</html>").unwrap();
        assert!(matches!(check_file(&fake, 50), Err(ReelError::NotAPdf { .. })));
    }

    #[test]
    fn check_file_enforces_size_limit() {
        let dir = TempDir::new().unwrap();
        let big = dir.path().join("big.PDF");
        let mut f = std::fs::File::create(&big).unwrap();
        f.write_all(b"%PDF-1.4\n").unwrap();
        f.write_all(&vec![b' '; 2 * 1024 * 1024]).unwrap();
        drop(f);

        assert!(matches!(
            check_file(&big, 1),
            Err(ReelError::FileTooLarge { limit_mb: 1, .. })
        ));
        assert!(check_file(&big, 50).is_ok());
    }
}
