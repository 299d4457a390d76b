//! The `ffmpeg` / `ffprobe` seam.
//!
//! Every stage that encodes, generates or probes media goes through
//! [`MediaTool`], so the compositor and background logic can be exercised in
//! tests with a scripted fake instead of real executables.

use crate::error::ReelError;
use crate::pipeline::background::BackgroundClip;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Lines of ffmpeg stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 8;

#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Run ffmpeg with `args`; non-zero exit is an error.
    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), ReelError>;

    /// Container duration in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64, ReelError>;

    /// Width and height of the first video stream.
    async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), ReelError>;

    /// Probe everything the background preparer needs.
    async fn probe_clip(&self, path: &Path) -> Result<BackgroundClip, ReelError> {
        let (native_width, native_height) = self.probe_dimensions(path).await?;
        let native_duration = self.probe_duration(path).await?;
        Ok(BackgroundClip {
            source_path: path.to_path_buf(),
            native_width,
            native_height,
            native_duration,
        })
    }
}

/// Runs the `ffmpeg` and `ffprobe` executables found on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemMediaTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for SystemMediaTool {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl SystemMediaTool {
    /// Use explicit executable paths instead of `PATH` lookup.
    pub fn with_executables(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn ffprobe(&self, path: &Path, args: &[&str]) -> Result<String, ReelError> {
        let output = Command::new(&self.ffprobe)
            .args(args)
            .arg(path)
            .output()
            .await
            .map_err(|e| ReelError::ToolUnavailable {
                tool: self.ffprobe.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ReelError::ProbeFailed {
                path: path.to_path_buf(),
                detail: format!(
                    "ffprobe exited with status {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaTool for SystemMediaTool {
    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), ReelError> {
        debug!("ffmpeg {}", args.join(" "));
        let output = Command::new(&self.ffmpeg)
            .args(args)
            .output()
            .await
            .map_err(|e| ReelError::ToolUnavailable {
                tool: self.ffmpeg.display().to_string(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelError::EncodingFailed {
                detail: format!(
                    "ffmpeg exited with status {:?}: {}",
                    output.status.code(),
                    stderr_tail(&stderr, STDERR_TAIL_LINES)
                ),
            });
        }
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, ReelError> {
        let stdout = self
            .ffprobe(
                path,
                &[
                    "-v",
                    "error",
                    "-show_entries",
                    "format=duration",
                    "-of",
                    "default=noprint_wrappers=1:nokey=1",
                ],
            )
            .await?;
        parse_duration(&stdout).map_err(|detail| ReelError::ProbeFailed {
            path: path.to_path_buf(),
            detail,
        })
    }

    async fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), ReelError> {
        let stdout = self
            .ffprobe(
                path,
                &[
                    "-v",
                    "error",
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream=width,height",
                    "-of",
                    "csv=s=x:p=0",
                ],
            )
            .await?;
        parse_dimensions(&stdout).map_err(|detail| ReelError::ProbeFailed {
            path: path.to_path_buf(),
            detail,
        })
    }
}

/// Parse ffprobe's bare `format=duration` output.
pub fn parse_duration(stdout: &str) -> Result<f64, String> {
    let value = stdout.trim();
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("unparseable duration '{value}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("non-positive duration {secs}"));
    }
    Ok(secs)
}

/// Parse ffprobe's `WIDTHxHEIGHT` csv output.
pub fn parse_dimensions(stdout: &str) -> Result<(u32, u32), String> {
    let value = stdout.lines().next().unwrap_or_default().trim();
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("unexpected dimensions '{value}'"))?;
    let width: u32 = w
        .trim()
        .parse()
        .map_err(|_| format!("unparseable width '{w}'"))?;
    let height: u32 = h
        .trim()
        .trim_end_matches('x')
        .parse()
        .map_err(|_| format!("unparseable height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("zero-sized video {width}x{height}"));
    }
    Ok((width, height))
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration("12.480000\n"), Ok(12.48));
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("0").is_err());
    }

    #[test]
    fn dimension_parsing() {
        assert_eq!(parse_dimensions("1920x1080\n"), Ok((1920, 1080)));
        // some builds print a trailing separator
        assert_eq!(parse_dimensions("720x1280x\n"), Ok((720, 1280)));
        assert!(parse_dimensions("").is_err());
        assert!(parse_dimensions("0x0").is_err());
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let s = "a\n\nb\nc\nd\n";
        assert_eq!(stderr_tail(s, 2), "c\nd");
        assert_eq!(stderr_tail(s, 10), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn missing_executable_is_tool_unavailable() {
        let tool = SystemMediaTool::with_executables(
            "/nonexistent/ffmpeg-for-tests",
            "/nonexistent/ffprobe-for-tests",
        );
        let err = tool.run_ffmpeg(&["-version".to_string()]).await.unwrap_err();
        assert!(matches!(err, ReelError::ToolUnavailable { .. }));
        let err = tool.probe_duration(Path::new("x.mp4")).await.unwrap_err();
        assert!(matches!(err, ReelError::ToolUnavailable { .. }));
    }
}
