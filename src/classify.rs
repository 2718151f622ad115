//! Maps a request to the crew category that decides how its result is read.

use std::fmt;

/// Which crew pipeline a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Research,
    Blog,
    Twitter,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Research => "research",
            Category::Blog => "blog",
            Category::Twitter => "twitter",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify request text. First matching rule wins:
/// research, then blog/copywriting, then twitter/x, then general.
pub fn classify(text: &str) -> Category {
    let lower = text.to_lowercase();

    if lower.contains("research") {
        Category::Research
    } else if lower.contains("blog") || lower.contains("copywriting") {
        Category::Blog
    } else if lower.contains("twitter") || lower.split_whitespace().any(|token| token == "x") {
        Category::Twitter
    } else {
        Category::General
    }
}
