//! Background clips: the library on disk and the crop/loop plan.
//!
//! ## Preparation
//!
//! A clip of any shape becomes a 1080×1920 track of exactly the narration's
//! length:
//!
//! ```text
//! 1920×1080 source (wider than 9:16)     crop 607×1080 at x=656     scale
//! ┌───────────────────────────┐          ┌─────┐                   ┌───┐
//! │          ┌─────┐          │    ──▶   │     │        ──▶        │   │ 1920
//! │          │     │          │          │     │                   │   │
//! └──────────┴─────┴──────────┘          └─────┘                   └───┘ 1080
//! ```
//!
//! Short clips are played back-to-back `ceil(target / native)` times with
//! hard cuts, then the whole thing is cut at `target`.

use crate::error::ReelError;
use crate::pipeline::media::MediaTool;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const OUTPUT_WIDTH: u32 = 1080;
pub const OUTPUT_HEIGHT: u32 = 1920;

/// File extensions accepted into the background library.
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "webm"];

/// Source clip as probed from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundClip {
    pub source_path: PathBuf,
    pub native_width: u32,
    pub native_height: u32,
    /// Seconds.
    pub native_duration: f64,
}

/// Crop window in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Deterministic preparation plan for one clip and one target duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedBackground {
    pub clip: BackgroundClip,
    pub crop: CropRect,
    pub output_width: u32,
    pub output_height: u32,
    /// Total plays of the source, 1 when no looping is needed.
    pub loops: u32,
    /// Seconds; the prepared track is cut to exactly this.
    pub target_duration: f64,
}

impl PreparedBackground {
    /// Value for ffmpeg's `-stream_loop`, which counts extra plays.
    pub fn stream_loop_count(&self) -> u32 {
        self.loops.saturating_sub(1)
    }

    /// ffmpeg video filter: crop, scale, square pixels.
    pub fn filter_chain(&self) -> String {
        format!(
            "crop={}:{}:{}:{},scale={}:{},setsar=1",
            self.crop.width,
            self.crop.height,
            self.crop.x,
            self.crop.y,
            self.output_width,
            self.output_height
        )
    }

    /// Seconds of source material the loop plan provides before trimming.
    pub fn looped_duration(&self) -> f64 {
        self.clip.native_duration * self.loops as f64
    }
}

/// Plan how to turn `clip` into a vertical track of `target_duration` seconds.
pub fn prepare(clip: &BackgroundClip, target_duration: f64) -> PreparedBackground {
    let w = clip.native_width;
    let h = clip.native_height;

    // w/h > 9/16, compared without floating point
    let crop = if (w as u64) * 16 > (h as u64) * 9 {
        let width = ((h as u64 * 9) / 16) as u32;
        CropRect {
            x: (w - width) / 2,
            y: 0,
            width,
            height: h,
        }
    } else {
        let height = ((w as u64 * 16) / 9) as u32;
        CropRect {
            x: 0,
            y: (h - height) / 2,
            width: w,
            height,
        }
    };

    let target = target_duration.max(0.0);
    let loops = if clip.native_duration > 0.0 && clip.native_duration < target {
        (target / clip.native_duration).ceil() as u32
    } else {
        1
    };

    PreparedBackground {
        clip: clip.clone(),
        crop,
        output_width: OUTPUT_WIDTH,
        output_height: OUTPUT_HEIGHT,
        loops,
        target_duration: target,
    }
}

// ── Library ──────────────────────────────────────────────────────────────

/// How the background for a job was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    /// Passed in by the caller.
    Explicit,
    /// Picked at random from the library.
    Library,
    /// Generated because nothing else was usable.
    Placeholder,
}

/// Directory of reusable background clips.
#[derive(Debug, Clone)]
pub struct BackgroundLibrary {
    dir: PathBuf,
}

impl BackgroundLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Video files in the library, sorted by name. A missing directory is
    /// an empty library.
    pub fn available(&self) -> Result<Vec<PathBuf>, ReelError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ReelError::Internal(format!(
                    "cannot read {}: {e}",
                    self.dir.display()
                )))
            }
        };

        let mut videos: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_video_file(p))
            .collect();
        videos.sort();
        Ok(videos)
    }

    /// Copy `files` into the library. Missing and non-video files are
    /// skipped with a warning; returns how many were added.
    pub async fn add(&self, files: &[PathBuf]) -> Result<usize, ReelError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ReelError::OutputWriteFailed {
                path: self.dir.clone(),
                source: e,
            })?;

        let mut added = 0;
        for file in files {
            if !file.is_file() {
                warn!("File not found: {}", file.display());
                continue;
            }
            let Some(name) = file.file_name() else {
                warn!("Skipping path without a file name: {}", file.display());
                continue;
            };
            if !is_video_file(file) {
                warn!(
                    "Skipping {}: not a video file ({})",
                    file.display(),
                    VIDEO_EXTENSIONS.join(", ")
                );
                continue;
            }
            let dest = self.dir.join(name);
            tokio::fs::copy(file, &dest)
                .await
                .map_err(|e| ReelError::OutputWriteFailed {
                    path: dest.clone(),
                    source: e,
                })?;
            info!("Added background video: {}", name.to_string_lossy());
            added += 1;
        }
        Ok(added)
    }

    /// A random clip from the library, if it has any.
    pub fn select_random(&self) -> Result<Option<PathBuf>, ReelError> {
        let videos = self.available()?;
        Ok(videos.choose(&mut rand::thread_rng()).cloned())
    }

    /// Find a usable clip: `explicit` if given and probeable, else a random
    /// library clip, else a generated placeholder of `target_duration`
    /// seconds written into `work_dir`.
    pub async fn resolve(
        &self,
        explicit: Option<&Path>,
        media: &dyn MediaTool,
        work_dir: &Path,
        target_duration: f64,
    ) -> Result<(BackgroundClip, BackgroundSource), ReelError> {
        if let Some(path) = explicit {
            if path.is_file() {
                match media.probe_clip(path).await {
                    Ok(clip) => return Ok((clip, BackgroundSource::Explicit)),
                    Err(e) => warn!("Background {} is unusable: {}", path.display(), e),
                }
            } else {
                warn!("Background {} not found, picking another", path.display());
            }
        }

        if let Some(path) = self.select_random()? {
            debug!("Selected background {}", path.display());
            match media.probe_clip(&path).await {
                Ok(clip) => return Ok((clip, BackgroundSource::Library)),
                Err(e) => warn!("Background {} is unusable: {}", path.display(), e),
            }
        }

        warn!("No usable background video, generating a placeholder");
        let clip = generate_placeholder(media, work_dir, target_duration).await?;
        Ok((clip, BackgroundSource::Placeholder))
    }
}

/// Render a vertical placeholder clip: an animated gradient, or a solid
/// colour when the ffmpeg build lacks the `gradients` source.
pub async fn generate_placeholder(
    media: &dyn MediaTool,
    work_dir: &Path,
    duration: f64,
) -> Result<BackgroundClip, ReelError> {
    tokio::fs::create_dir_all(work_dir)
        .await
        .map_err(|e| ReelError::OutputWriteFailed {
            path: work_dir.to_path_buf(),
            source: e,
        })?;

    let out = work_dir.join("placeholder_background.mp4");
    let duration = duration.max(1.0);
    let size = format!("{OUTPUT_WIDTH}x{OUTPUT_HEIGHT}");
    let sources = [
        format!("gradients=s={size}:d={duration:.3}:speed=0.02:c0=0x1a1a2e:c1=0x6c2bd9"),
        format!("color=c=0x1a1a2e:s={size}:d={duration:.3}"),
    ];

    let mut last_err = String::new();
    for source in &sources {
        let args: Vec<String> = [
            "-y", "-f", "lavfi", "-i", source.as_str(), "-c:v", "libx264", "-preset", "ultrafast",
            "-pix_fmt", "yuv420p", "-r", "30",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(out.to_string_lossy().into_owned()))
        .collect();

        match media.run_ffmpeg(&args).await {
            Ok(()) => {
                return Ok(BackgroundClip {
                    source_path: out,
                    native_width: OUTPUT_WIDTH,
                    native_height: OUTPUT_HEIGHT,
                    native_duration: duration,
                })
            }
            Err(e) => {
                debug!("Placeholder source '{}' failed: {}", source, e);
                last_err = e.to_string();
            }
        }
    }

    Err(ReelError::NoBackgroundAvailable {
        detail: format!("library is empty and placeholder generation failed: {last_err}"),
    })
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(w: u32, h: u32, secs: f64) -> BackgroundClip {
        BackgroundClip {
            source_path: PathBuf::from("bg.mp4"),
            native_width: w,
            native_height: h,
            native_duration: secs,
        }
    }

    #[test]
    fn landscape_is_cropped_horizontally() {
        let plan = prepare(&clip(1920, 1080, 30.0), 20.0);
        assert_eq!(
            plan.crop,
            CropRect {
                x: 656,
                y: 0,
                width: 607,
                height: 1080
            }
        );
        assert_eq!(plan.loops, 1);
        assert_eq!(plan.filter_chain(), "crop=607:1080:656:0,scale=1080:1920,setsar=1");
    }

    #[test]
    fn tall_clip_is_cropped_vertically() {
        let plan = prepare(&clip(720, 1600, 10.0), 5.0);
        assert_eq!(plan.crop.width, 720);
        assert_eq!(plan.crop.height, 1280);
        assert_eq!(plan.crop.y, 160);
    }

    #[test]
    fn exact_ratio_keeps_full_frame() {
        let plan = prepare(&clip(1080, 1920, 10.0), 5.0);
        assert_eq!(
            plan.crop,
            CropRect {
                x: 0,
                y: 0,
                width: 1080,
                height: 1920
            }
        );
    }

    #[test]
    fn short_clip_loops_whole_copies() {
        let plan = prepare(&clip(1920, 1080, 7.0), 30.0);
        assert_eq!(plan.loops, 5);
        assert_eq!(plan.stream_loop_count(), 4);
        assert!(plan.looped_duration() >= plan.target_duration);
        assert_eq!(plan.target_duration, 30.0);
    }

    #[test]
    fn video_extensions_are_case_insensitive() {
        assert!(is_video_file(Path::new("a.MP4")));
        assert!(is_video_file(Path::new("b.webm")));
        assert!(!is_video_file(Path::new("c.gif")));
        assert!(!is_video_file(Path::new("noext")));
    }
}
