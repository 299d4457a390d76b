//! Prompts and fixed script text used by the script writers.
//!
//! Every piece of wording the pipeline sends to a model, or speaks on its
//! own, lives here so that it can be changed and tested without touching the
//! retry or parsing logic in [`crate::pipeline::script`].

/// System message for the hosted script writer.
pub const SCRIPT_SYSTEM_PROMPT: &str =
    "You are an expert at making academic research accessible and viral on social media.";

/// Build the user message asking for a JSON video script.
///
/// `paper_text` should already be truncated to the configured character cap.
pub fn script_user_prompt(paper_text: &str, target_words: usize, max_duration_secs: u32) -> String {
    format!(
        r##"Turn the academic paper below into a script for a viral short-form vertical video (TikTok, Reels, Shorts).
The goal is to make the research accessible and exciting to a general audience.

Paper text:
{paper_text}

Requirements:
1. LENGTH: about {target_words} words ({max_duration_secs} seconds when read aloud)
2. STYLE: conversational and a little dramatic, like a popular science creator
3. HOOK: the first three seconds must grab attention
4. STRUCTURE: hook, short context or problem, key findings in plain words, why viewers should care, call to action
5. LANGUAGE: no jargon; use analogies and everyday examples
6. TONE: enthusiastic but faithful to what the paper actually shows

Reply with a single JSON object and nothing else:
{{
    "title": "catchy video title, at most 60 characters",
    "hook": "the opening sentence",
    "script": "the full narration",
    "hashtags": ["#relevant", "#hashtags"]
}}

It has to sound natural when spoken, not like someone reading a paper."##
    )
}

/// Analysis prompt sent to the local model.
pub fn analysis_prompt(title: &str, abstract_text: &str) -> String {
    format!(
        "Analyze this research paper and extract:\n\
         1. Main research question or problem\n\
         2. Key methodology\n\
         3. Main findings (2-3 points)\n\
         4. Why it matters\n\
         \n\
         Title: {title}\n\
         Abstract: {abstract_text}\n\
         \n\
         Keep each point to one or two sentences."
    )
}

/// Rule-based analysis used when the local model is unreachable.
pub fn simple_analysis(title: &str) -> String {
    format!(
        "🔬 Research Problem: This paper investigates {}\n\
         📊 Key Method: The researchers used experimental and computational approaches\n\
         💡 Main Finding: The study reveals important insights about the topic\n\
         🌟 Why It Matters: This research advances our understanding and has practical applications",
        title.to_lowercase()
    )
}

// ── Template script (local backend) ──────────────────────────────────────

/// Declared length of the template script.
pub const TEMPLATE_DURATION_SECS: u32 = 90;
pub const TEMPLATE_STYLE: &str = "detailed_brainrot";

pub const TEMPLATE_VISUAL_CUES: [&str; 8] = [
    "brain explosion with fire effects",
    "confused scientist with question marks",
    "galaxy brain expanding sequence",
    "data charts flying everywhere",
    "mind blown reaction compilation",
    "rocket launch with rainbow trail",
    "laboratory equipment dancing",
    "brain emoji rain finale",
];

/// Fill-ins for the template, optionally enriched from an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptParts {
    pub problem: String,
    pub analogy: String,
    pub method: String,
    pub results: String,
    pub impact: String,
    pub technical: String,
}

impl ScriptParts {
    /// Stock fill-ins for `title`, with method, result and impact replaced by
    /// analysis lines that mention them. The last matching line wins.
    pub fn from_analysis(title: &str, analysis: &str) -> Self {
        let mut parts = Self {
            problem: format!(
                "So these absolute legends looked at '{title}' and said 'nah, we need answers!'"
            ),
            analogy: "explaining TikTok to your grandparents, except the grandparents are the entire scientific community".to_string(),
            method: "They pulled out every tool in the scientific toolkit: experiments, data analysis, the whole nine yards!".to_string(),
            results: "The data came back and said 'SIKE! Everything you thought you knew? WRONG!'".to_string(),
            impact: "This research is about to leave the field in SHAMBLES, in the best way possible!".to_string(),
            technical: "The statistics are through the ROOF, the methodology is cleaner than your room, and the implications are bigger than your favourite anime plot twist!".to_string(),
        };

        for line in analysis.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let lower = trimmed.to_lowercase();
            if lower.contains("method") || lower.contains("approach") {
                parts.method = format!("They used {lower} and honestly? The innovation is SENDING me! 🔬");
            } else if lower.contains("result") || lower.contains("finding") {
                parts.results = format!("Get this: {lower} I literally cannot even! The data said what it said! 📈");
            } else if lower.contains("matter") || lower.contains("important") {
                parts.impact = format!("{trimmed} This is the kind of research that makes you question everything! 🌟");
            }
        }

        parts
    }
}

/// Seven-part narration script: hook, problem, method, results,
/// implications, technical deep dive, outro.
pub fn template_script(title: &str, parts: &ScriptParts) -> String {
    let sections = [
        format!(
            "Yo chat, this research paper just dropped and it is absolutely UNHINGED! We're going DEEP on {title} and your brain cells are NOT ready! 🤯"
        ),
        format!(
            "{} Imagine {}. That's basically what these scientists were dealing with! 💀",
            parts.problem, parts.analogy
        ),
        format!(
            "OK, here's where it gets SPICY! {} They said 'let's do something nobody has done before' and then ACTUALLY DID IT! 🔥",
            parts.method
        ),
        format!(
            "BUT WAIT, IT GETS CRAZIER! {} The numbers don't lie, bestie! 📊",
            parts.results
        ),
        format!(
            "{} This could change how we think about EVERYTHING! 🚀",
            parts.impact
        ),
        format!(
            "Now the actual science, because we're not just here for the vibes! {} See? Science slaps when you actually get it! 🧪",
            parts.technical
        ),
        "And THAT'S how you turn a dusty academic paper into content that slaps! Drop a 🧠 if your mind is blown and follow for more research that hits different! ✨".to_string(),
    ];
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_carries_targets_and_text() {
        let p = script_user_prompt("PAPER BODY", 450, 180);
        assert!(p.contains("PAPER BODY"));
        assert!(p.contains("about 450 words"));
        assert!(p.contains("180 seconds"));
        assert!(p.contains("\"script\""));
    }

    #[test]
    fn user_prompt_shows_hashtag_array_and_closing_line() {
        let p = script_user_prompt("x", 10, 60);
        assert!(p.contains(r##""hashtags": ["#relevant", "#hashtags"]"##));
        assert!(p.ends_with("not like someone reading a paper."));
    }

    #[test]
    fn analysis_lines_enrich_template_parts() {
        let analysis = "Key methodology: a randomized trial\n\
                        Main finding: sleep improves recall\n\
                        Why it matters: students everywhere";
        let parts = ScriptParts::from_analysis("Sleep and Memory", analysis);
        assert!(parts.method.contains("a randomized trial"));
        assert!(parts.results.contains("sleep improves recall"));
        assert!(parts.impact.starts_with("Why it matters: students everywhere"));
    }

    #[test]
    fn simple_analysis_feeds_every_slot() {
        let analysis = simple_analysis("Quantum Cats");
        assert!(analysis.contains("quantum cats"));
        let parts = ScriptParts::from_analysis("Quantum Cats", &analysis);
        assert!(parts.method.starts_with("They used"));
        assert!(parts.results.starts_with("Get this"));
    }

    #[test]
    fn template_has_seven_sections() {
        let parts = ScriptParts::from_analysis("T", "");
        let script = template_script("Paper X", &parts);
        assert_eq!(script.split("\n\n").count(), 7);
        assert!(script.contains("Paper X"));
        assert_eq!(TEMPLATE_VISUAL_CUES.len(), 8);
    }
}
