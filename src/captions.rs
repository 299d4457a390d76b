//! Caption segmentation and the burnt-in caption track.
//!
//! The narration script is cut into fixed-size word groups. Each group is
//! shown on screen for exactly as long as it takes to say it at the configured
//! [`SpeakingRate`], so segments tile the timeline with no gaps or overlaps:
//!
//! ```text
//! "the quick brown fox jumps over the lazy dog", 5 words/segment, 150 wpm
//!
//!   [the quick brown fox jumps][over the lazy dog]
//!   0.0 ─────────────────── 2.0 ──────────────── 3.6 s
//! ```
//!
//! The compositor renders the segments as an ASS subtitle track, which gives
//! per-event positioning and fades without one ffmpeg filter per caption.

use crate::timing::SpeakingRate;
use serde::{Deserialize, Serialize};

/// A timed chunk of narration text displayed as one on-screen overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub text: String,
    /// Seconds from the start of the video.
    pub start: f64,
    pub duration: f64,
    /// `start + duration`; equal to the next segment's `start`.
    pub end: f64,
}

impl CaptionSegment {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Whether the overlay is visible at time `t` (half-open interval).
    pub fn is_visible_at(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

/// Split `script` into caption segments of `words_per_segment` words.
///
/// The last segment may be shorter. An empty script yields no segments.
/// A `words_per_segment` of zero is treated as one so that no segment is ever
/// empty.
pub fn segment(script: &str, words_per_segment: usize, rate: SpeakingRate) -> Vec<CaptionSegment> {
    let words: Vec<&str> = script.split_whitespace().collect();
    let size = words_per_segment.max(1);

    let mut segments = Vec::with_capacity(words.len().div_ceil(size));
    let mut cursor = 0.0_f64;

    for chunk in words.chunks(size) {
        let duration = rate.seconds_for_words(chunk.len());
        let end = cursor + duration;
        segments.push(CaptionSegment {
            text: chunk.join(" "),
            start: cursor,
            duration,
            end,
        });
        cursor = end;
    }

    segments
}

/// End time of the last segment, or 0 for an empty track.
pub fn total_duration(segments: &[CaptionSegment]) -> f64 {
    segments.last().map(|s| s.end).unwrap_or(0.0)
}

// ── ASS caption track ────────────────────────────────────────────────────

/// Visual style of the burnt-in captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionStyle {
    pub font_name: String,
    pub font_size: u32,
    pub bold: bool,
    /// ASS colour, `&HAABBGGRR`.
    pub primary_color: String,
    pub outline_color: String,
    pub outline_width: u32,
    /// Vertical anchor of the caption centre as a fraction of frame height.
    pub vertical_position: f64,
    /// Fade-in and fade-out length in seconds.
    pub fade_secs: f64,
    /// Wrap captions after this many characters per line.
    pub max_line_chars: usize,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size: 85,
            bold: true,
            primary_color: "&H00FFFFFF".to_string(),
            outline_color: "&H00000000".to_string(),
            outline_width: 3,
            vertical_position: 0.7,
            fade_secs: 0.2,
            max_line_chars: 18,
        }
    }
}

/// Render `segments` as an ASS script for a `width`×`height` frame.
///
/// Each segment becomes one `Dialogue` event centred horizontally at
/// `style.vertical_position` of the frame height, with a fade clamped to half
/// the segment length so very short captions still reach full opacity.
pub fn to_ass(segments: &[CaptionSegment], style: &CaptionStyle, width: u32, height: u32) -> String {
    let mut out = String::new();

    out.push_str("[Script Info]\n");
    out.push_str("ScriptType: v4.00+\n");
    out.push_str("WrapStyle: 2\n");
    out.push_str(&format!("PlayResX: {}\n", width));
    out.push_str(&format!("PlayResY: {}\n\n", height));

    out.push_str("[V4+ Styles]\n");
    out.push_str("Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n");
    out.push_str(&format!(
        "Style: Caption,{font},{size},{primary},{primary},{outline},&H80000000,{bold},0,0,0,100,100,0,0,1,{outline_width},0,5,0000,0000,0000,1\n",
        font = style.font_name,
        size = style.font_size,
        primary = style.primary_color,
        outline = style.outline_color,
        bold = if style.bold { -1 } else { 0 },
        outline_width = style.outline_width,
    ));

    out.push_str("\n[Events]\n");
    out.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    let x = width / 2;
    let y = (height as f64 * style.vertical_position).round() as u32;

    for seg in segments {
        let fade_ms = (style.fade_secs.min(seg.duration / 2.0) * 1000.0).round().max(0.0) as u32;
        let text = escape_ass_text(&wrap_words(&seg.text, style.max_line_chars).join("\n"));
        out.push_str(&format!(
            "Dialogue: 0,{start},{end},Caption,,0000,0000,0000,,{{\\an5\\pos({x},{y})\\fad({fade_ms},{fade_ms})}}{text}\n",
            start = format_ass_timestamp(seg.start),
            end = format_ass_timestamp(seg.end),
        ));
    }

    out
}

/// `H:MM:SS.cc` with centisecond precision.
fn format_ass_timestamp(secs: f64) -> String {
    let total_centis = (secs.max(0.0) * 100.0).round() as u64;
    let centis = total_centis % 100;
    let total_seconds = total_centis / 100;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{centis:02}")
}

/// Escape override braces and backslashes, then encode line breaks as `\N`.
fn escape_ass_text(text: &str) -> String {
    text.replace('\r', "")
        .replace('\\', "\\\\")
        .replace('{', "(")
        .replace('}', ")")
        .replace('\n', "\\N")
}

/// Greedy word wrap; a single word longer than `width` gets its own line.
fn wrap_words(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOX: &str = "the quick brown fox jumps over the lazy dog";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fox_scenario_two_segments() {
        let segs = segment(FOX, 5, SpeakingRate::default());
        assert_eq!(segs.len(), 2);

        assert_eq!(segs[0].text, "the quick brown fox jumps");
        assert!(approx(segs[0].start, 0.0));
        assert!(approx(segs[0].duration, 2.0));
        assert!(approx(segs[0].end, 2.0));

        assert_eq!(segs[1].text, "over the lazy dog");
        assert!(approx(segs[1].start, 2.0));
        assert!(approx(segs[1].duration, 1.6));
        assert!(approx(segs[1].end, 3.6));
    }

    #[test]
    fn empty_script_yields_nothing() {
        assert!(segment("", 5, SpeakingRate::default()).is_empty());
        assert!(segment("   \n\t ", 5, SpeakingRate::default()).is_empty());
    }

    #[test]
    fn zero_segment_size_means_one_word_each() {
        let segs = segment("a b c", 0, SpeakingRate::default());
        assert_eq!(segs.len(), 3);
        assert!(segs.iter().all(|s| s.word_count() == 1));
    }

    #[test]
    fn segments_are_contiguous_and_reconstruct_tokens() {
        let script = "  Large   language\nmodels are\tsurprisingly good at   summarising papers, apparently. ";
        for k in 1..=7 {
            let segs = segment(script, k, SpeakingRate::default());
            assert_eq!(segs[0].start, 0.0);
            for pair in segs.windows(2) {
                assert_eq!(pair[0].end, pair[1].start, "k={k}");
            }
            let rebuilt: Vec<String> = segs
                .iter()
                .flat_map(|s| s.text.split(' ').map(str::to_string).collect::<Vec<_>>())
                .collect();
            let expected: Vec<String> = script.split_whitespace().map(str::to_string).collect();
            assert_eq!(rebuilt, expected, "k={k}");
            assert!(segs.iter().all(|s| s.word_count() >= 1 && s.word_count() <= k));
        }
    }

    #[test]
    fn total_duration_matches_last_end() {
        let segs = segment(FOX, 4, SpeakingRate::default());
        assert!(approx(total_duration(&segs), 3.6));
        assert_eq!(total_duration(&[]), 0.0);
    }

    #[test]
    fn visibility_is_half_open() {
        let segs = segment(FOX, 5, SpeakingRate::default());
        assert!(segs[0].is_visible_at(0.0));
        assert!(!segs[0].is_visible_at(2.0));
        assert!(segs[1].is_visible_at(2.0));
    }

    #[test]
    fn ass_track_positions_and_fades_each_caption() {
        let segs = segment(FOX, 5, SpeakingRate::default());
        let ass = to_ass(&segs, &CaptionStyle::default(), 1080, 1920);

        assert!(ass.contains("PlayResX: 1080"));
        assert!(ass.contains("PlayResY: 1920"));
        let dialogues: Vec<&str> = ass.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(dialogues.len(), 2);
        assert!(dialogues[0].contains("0:00:00.00,0:00:02.00"));
        assert!(dialogues[1].contains("0:00:02.00,0:00:03.60"));
        assert!(dialogues[0].contains("\\pos(540,1344)"));
        assert!(dialogues[0].contains("\\fad(200,200)"));
    }

    #[test]
    fn short_caption_fade_is_clamped() {
        let segs = segment("hi", 5, SpeakingRate::new(600.0)); // 0.1 s
        let ass = to_ass(&segs, &CaptionStyle::default(), 1080, 1920);
        assert!(ass.contains("\\fad(50,50)"), "{ass}");
    }

    #[test]
    fn ass_text_is_escaped_and_wrapped() {
        assert_eq!(escape_ass_text("a{b}\\c"), "a(b)\\\\c");
        let lines = wrap_words("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn ass_timestamp_format() {
        assert_eq!(format_ass_timestamp(0.0), "0:00:00.00");
        assert_eq!(format_ass_timestamp(3.6), "0:00:03.60");
        assert_eq!(format_ass_timestamp(3725.456), "1:02:05.46");
    }
}
