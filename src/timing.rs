//! Speaking-rate arithmetic shared by every duration estimate.
//!
//! Caption timing, platform truncation and the narration length estimate all
//! convert between word counts and seconds. They must agree, otherwise a
//! script trimmed to "45 seconds" produces 47 seconds of captions. A single
//! [`SpeakingRate`] value lives in [`crate::config::GeneratorConfig`] and is
//! passed explicitly into each of those computations.

use serde::{Deserialize, Serialize};

/// Average narration speed assumed when no measurement is available.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 150;

/// Narration speed in words per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakingRate(f64);

impl SpeakingRate {
    /// Create a rate from words per minute. Non-positive or non-finite values
    /// fall back to [`DEFAULT_WORDS_PER_MINUTE`].
    pub fn new(words_per_minute: f64) -> Self {
        if words_per_minute.is_finite() && words_per_minute > 0.0 {
            Self(words_per_minute)
        } else {
            Self::default()
        }
    }

    pub fn words_per_minute(&self) -> f64 {
        self.0
    }

    pub fn words_per_second(&self) -> f64 {
        self.0 / 60.0
    }

    /// Seconds needed to speak `words` words.
    pub fn seconds_for_words(&self, words: usize) -> f64 {
        words as f64 / self.words_per_second()
    }

    /// Seconds needed to speak `text`, counting whitespace-separated tokens.
    pub fn estimate_secs(&self, text: &str) -> f64 {
        self.seconds_for_words(word_count(text))
    }

    /// Largest whole number of words that fits in `secs` seconds.
    pub fn words_for_secs(&self, secs: f64) -> usize {
        (secs / 60.0 * self.0).floor().max(0.0) as usize
    }
}

impl Default for SpeakingRate {
    fn default() -> Self {
        Self(DEFAULT_WORDS_PER_MINUTE as f64)
    }
}

/// Number of whitespace-separated tokens in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Narration duration for `text` spoken at `speed` × the base rate.
///
/// `speed` is the TTS speed multiplier; values ≤ 0 are treated as 1.0.
pub fn estimate_narration_secs(text: &str, rate: SpeakingRate, speed: f32) -> f64 {
    let speed = if speed > 0.0 { speed as f64 } else { 1.0 };
    rate.estimate_secs(text) / speed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_is_two_and_a_half_words_per_second() {
        let rate = SpeakingRate::default();
        assert_eq!(rate.words_per_minute(), 150.0);
        assert!((rate.words_per_second() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn words_for_secs_floors() {
        let rate = SpeakingRate::default();
        assert_eq!(rate.words_for_secs(45.0), 112);
        assert_eq!(rate.words_for_secs(60.0), 150);
        assert_eq!(rate.words_for_secs(30.0), 75);
        assert_eq!(rate.words_for_secs(0.0), 0);
    }

    #[test]
    fn invalid_rate_falls_back_to_default() {
        assert_eq!(SpeakingRate::new(0.0), SpeakingRate::default());
        assert_eq!(SpeakingRate::new(-3.0), SpeakingRate::default());
        assert_eq!(SpeakingRate::new(f64::NAN), SpeakingRate::default());
    }

    #[test]
    fn narration_estimate_accounts_for_speed() {
        let text = "one two three four five six seven eight nine ten";
        let rate = SpeakingRate::default();
        assert!((estimate_narration_secs(text, rate, 1.0) - 4.0).abs() < 1e-9);
        assert!((estimate_narration_secs(text, rate, 2.0) - 2.0).abs() < 1e-9);
        assert!((estimate_narration_secs(text, rate, 0.0) - 4.0).abs() < 1e-9);
    }
}
