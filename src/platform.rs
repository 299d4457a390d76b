//! Target platforms and their narration length budgets.

use crate::timing::{word_count, SpeakingRate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token appended when a script is cut short.
pub const ELLIPSIS_MARKER: &str = "...";

/// Short-form video platform a script is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    TikTok,
    Instagram,
    YouTube,
}

/// `(max, optimal)` narration length in seconds for a platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBudget {
    pub max_secs: f64,
    pub optimal_secs: f64,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::TikTok, Platform::Instagram, Platform::YouTube];

    /// Illustrative defaults, not validated against platform guidelines.
    pub fn budget(&self) -> DurationBudget {
        match self {
            Platform::TikTok => DurationBudget {
                max_secs: 180.0,
                optimal_secs: 60.0,
            },
            Platform::Instagram => DurationBudget {
                max_secs: 90.0,
                optimal_secs: 30.0,
            },
            Platform::YouTube => DurationBudget {
                max_secs: 60.0,
                optimal_secs: 45.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::TikTok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::YouTube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiktok" => Ok(Platform::TikTok),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::YouTube),
            other => Err(format!(
                "unknown platform '{other}' (expected tiktok, instagram or youtube)"
            )),
        }
    }
}

/// Fit `script` into the platform's optimal duration.
///
/// Scripts that already fit are returned unchanged. Longer scripts keep the
/// first `floor(optimal / 60 * wpm)` words followed by [`ELLIPSIS_MARKER`].
pub fn optimize(script: &str, platform: Platform, rate: SpeakingRate) -> String {
    let budget = platform.budget();
    let estimated = rate.estimate_secs(script);
    if estimated <= budget.optimal_secs {
        return script.to_string();
    }

    let target = rate.words_for_secs(budget.optimal_secs);
    let mut words: Vec<&str> = script.split_whitespace().take(target).collect();
    if words.len() < word_count(script) {
        words.push(ELLIPSIS_MARKER);
    }
    words.join(" ")
}

/// Like [`optimize`] but keyed by platform name; unknown names pass through.
pub fn optimize_named(script: &str, platform: &str, rate: SpeakingRate) -> String {
    match platform.parse::<Platform>() {
        Ok(p) => optimize(script, p, rate),
        Err(_) => script.to_string(),
    }
}
