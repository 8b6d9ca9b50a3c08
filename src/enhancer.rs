//! Query rewriting for image and meme backends.
//!
//! Raw queries like "cat" or "dance" return mediocre results from most image
//! services. The enhancer applies a few fixed rules, in order:
//!
//! 1. **Meme table**: if the lower-cased query contains a known trigger
//!    phrase, the whole query is replaced by the canonical meme query and no
//!    further rule runs. The first trigger in table order wins.
//! 2. **Trend words**: a token from the trend set appends `" tiktok viral"`
//!    unless the query already mentions tiktok.
//! 3. **Art words**: a token from the art set appends `" high quality hd"`.
//! 4. **Short queries**: two tokens or fewer (counted after rules 2 and 3)
//!    get `" hd quality"`.
//!
//! Rules 2-4 are independent of each other. Casing of the original query is
//! preserved wherever it is not replaced. The rewrite is single-pass and not
//! idempotent: enhancing an enhanced query may append again.
//!
//! ```
//! use image_finder::enhancer::enhance;
//!
//! assert_eq!(enhance("pepe"), "pepe the frog meme");
//! assert_eq!(enhance("Sunset"), "Sunset hd quality");
//! assert_eq!(enhance("a quiet mountain lake"), "a quiet mountain lake");
//! ```

/// Canonical rewrites for popular meme subjects, in match priority order
pub const MEME_TABLE: &[(&str, &str)] = &[
    ("thinking monkey", "thinking monkey meme tiktok"),
    ("monkey", "monkey meme"),
    ("cat", "cat meme"),
    ("dog", "dog meme"),
    ("pepe", "pepe the frog meme"),
    ("wojak", "wojak meme"),
    ("doge", "doge meme"),
    ("distracted boyfriend", "distracted boyfriend meme"),
    ("drake", "drake meme template"),
    ("stonks", "stonks meme"),
    ("galaxy brain", "galaxy brain meme"),
];

/// Words that suggest short-video trend content
pub const TREND_WORDS: &[&str] = &["dance", "trend", "viral", "challenge", "reaction"];

/// Words that suggest the user wants high-resolution artwork
pub const ART_WORDS: &[&str] = &["aesthetic", "wallpaper", "art", "drawing", "painting"];

const TREND_SUFFIX: &str = " tiktok viral";
const ART_SUFFIX: &str = " high quality hd";
const QUALITY_SUFFIX: &str = " hd quality";
const SHORT_QUERY_TOKENS: usize = 2;

/// Rewrites raw queries using configurable keyword tables
#[derive(Debug, Clone)]
pub struct QueryEnhancer {
    memes: Vec<(String, String)>,
    trend_words: Vec<String>,
    art_words: Vec<String>,
}

impl Default for QueryEnhancer {
    fn default() -> Self {
        Self {
            memes: MEME_TABLE
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            trend_words: TREND_WORDS.iter().map(|w| w.to_string()).collect(),
            art_words: ART_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl QueryEnhancer {
    /// Enhancer with the built-in tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a meme trigger after the built-in ones
    ///
    /// Triggers are matched lower-cased, so they should be lower-case.
    pub fn with_meme(mut self, trigger: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.memes
            .push((trigger.into().to_lowercase(), replacement.into()));
        self
    }

    /// Rewrite `query`
    ///
    /// Callers are expected to skip empty or whitespace-only queries; such
    /// input is returned unchanged.
    pub fn enhance(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return query.to_string();
        }

        let lower = query.to_lowercase();

        if let Some((_, replacement)) = self
            .memes
            .iter()
            .find(|(trigger, _)| lower.contains(trigger.as_str()))
        {
            return replacement.clone();
        }

        let tokens: Vec<&str> = lower
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .collect();
        let has_token = |words: &[String]| tokens.iter().any(|t| words.iter().any(|w| w == t));

        let mut enhanced = query.to_string();

        if has_token(&self.trend_words) && !lower.contains("tiktok") {
            enhanced.push_str(TREND_SUFFIX);
        }

        if has_token(&self.art_words) {
            enhanced.push_str(ART_SUFFIX);
        }

        if enhanced.split_whitespace().count() <= SHORT_QUERY_TOKENS {
            enhanced.push_str(QUALITY_SUFFIX);
        }

        enhanced
    }
}

/// Rewrite `query` with the built-in tables
pub fn enhance(query: &str) -> String {
    QueryEnhancer::default().enhance(query)
}
