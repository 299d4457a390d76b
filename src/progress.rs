//! Progress-callback trait for per-stage generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GeneratorConfigBuilder::progress_callback`] to follow a job
//! through its stages. The CLI uses this to drive its spinner.
//!
//! # Example
//!
//! ```rust
//! use pdf2reel::{GenerationProgressCallback, GeneratorConfig, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl GenerationProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("-> {}", stage.label());
//!     }
//! }
//!
//! let config = GeneratorConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Script,
    Speech,
    Video,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Extract, Stage::Script, Stage::Speech, Stage::Video];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Extract => "Extracting text from PDF",
            Stage::Script => "Generating script",
            Stage::Speech => "Generating speech",
            Stage::Video => "Creating video",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the generator as a job moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once per input before extraction begins.
    fn on_job_start(&self, input: &Path) {
        let _ = input;
    }

    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    fn on_stage_complete(&self, stage: Stage) {
        let _ = stage;
    }

    /// A stage fell back to a weaker strategy.
    ///
    /// # Arguments
    /// * `stage`   : the stage that degraded
    /// * `strategy`: name of the strategy that was used instead
    /// * `reason`  : why the preferred strategy failed
    fn on_stage_degraded(&self, stage: Stage, strategy: &str, reason: &str) {
        let _ = (stage, strategy, reason);
    }

    /// Called once per input; `artifact` is `None` when the job failed.
    fn on_job_complete(&self, input: &Path, artifact: Option<&Path>) {
        let _ = (input, artifact);
    }
}

/// Default when no callback is configured.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GeneratorConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl GenerationProgressCallback for Recorder {
        fn on_stage_start(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start {stage:?}"));
        }

        fn on_stage_degraded(&self, stage: Stage, strategy: &str, _reason: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("degraded {stage:?} {strategy}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_job_start(Path::new("a.pdf"));
        for stage in Stage::ALL {
            cb.on_stage_start(stage);
            cb.on_stage_complete(stage);
        }
        cb.on_stage_degraded(Stage::Speech, "silent", "401");
        cb.on_job_complete(Path::new("a.pdf"), None);
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();
        cb.on_stage_start(Stage::Script);
        cb.on_stage_complete(Stage::Script);
        cb.on_stage_degraded(Stage::Video, "transcript", "ffmpeg missing");

        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec!["start Script".to_string(), "degraded Video transcript".to_string()]
        );
    }
}
