//! Post text rendering
//!
//! Each post is laid out with one of five templates picked at random, and
//! sometimes decorated with a single emoji, so consecutive posts do not share
//! an identical shape.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::PostRecord;

/// Emoji used for decoration when none are configured
pub const DEFAULT_EMOJIS: [&str; 10] = ["✨", "🚀", "💡", "🔥", "👉", "📌", "✅", "🙌", "💪", "🎯"];

/// Chance that a post gets an emoji
pub const DEFAULT_DECORATION_PROBABILITY: f64 = 1.0 / 3.0;

/// Structural layouts for body, call to action and hashtags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// body, cta, hashtags separated by blank lines
    Classic,
    /// hashtags first, then body and cta
    HashtagsFirst,
    /// body, hashtags, cta
    HashtagsMiddle,
    /// body, an extra blank line, then cta and hashtags
    Spacious,
    /// one line each, no blank lines
    Compact,
}

impl Template {
    pub const ALL: [Template; 5] = [
        Template::Classic,
        Template::HashtagsFirst,
        Template::HashtagsMiddle,
        Template::Spacious,
        Template::Compact,
    ];

    pub fn render(self, record: &PostRecord) -> String {
        let PostRecord {
            body,
            cta,
            hashtags,
            ..
        } = record;

        match self {
            Template::Classic => format!("{body}\n\n{cta}\n\n{hashtags}"),
            Template::HashtagsFirst => format!("{hashtags}\n\n{body}\n\n{cta}"),
            Template::HashtagsMiddle => format!("{body}\n\n{hashtags}\n\n{cta}"),
            Template::Spacious => format!("{body}\n\n\n{cta}\n\n{hashtags}"),
            Template::Compact => format!("{body}\n{cta}\n{hashtags}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Formatter {
    emojis: Vec<String>,
    decoration_probability: f64,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            emojis: DEFAULT_EMOJIS.iter().map(|e| e.to_string()).collect(),
            decoration_probability: DEFAULT_DECORATION_PROBABILITY,
        }
    }
}

impl Formatter {
    /// An empty emoji set disables decoration. Probability is clamped to [0, 1].
    pub fn new(emojis: Vec<String>, decoration_probability: f64) -> Self {
        Self {
            emojis,
            decoration_probability: decoration_probability.clamp(0.0, 1.0),
        }
    }

    pub fn with_probability(mut self, decoration_probability: f64) -> Self {
        self.decoration_probability = decoration_probability.clamp(0.0, 1.0);
        self
    }

    /// Render `record` with a random template and optional emoji
    pub fn format<R: Rng + ?Sized>(&self, record: &PostRecord, rng: &mut R) -> String {
        let template = Template::ALL[rng.gen_range(0..Template::ALL.len())];
        let text = template.render(record);
        self.decorate(text, rng)
    }

    fn decorate<R: Rng + ?Sized>(&self, text: String, rng: &mut R) -> String {
        if self.emojis.is_empty() || !rng.gen_bool(self.decoration_probability) {
            return text;
        }

        let Some(emoji) = self.emojis.choose(rng) else {
            return text;
        };

        if rng.gen_bool(0.5) {
            format!("{} {}", emoji, text)
        } else {
            format!("{} {}", text, emoji)
        }
    }
}

/// Shorten `text` for console output, cutting on a char boundary
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
