use std::fmt;

use crate::styles::StyleSelection;

pub const MIN_RESPONSE_CHARS: usize = 50;
pub const MIN_KEYWORD_HITS: usize = 3;
pub const MIN_SENTENCES: usize = 3;

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// Each keyword counts once, whether it appears in English or in one of its
/// localized spellings.
const DESCRIPTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("transform", &["変換"]),
    ("style", &["スタイル"]),
    ("color", &["色"]),
    ("texture", &["質感"]),
    ("feature", &["特徴"]),
    ("expression", &["表現"]),
    ("image", &["画像"]),
    ("effect", &["効果"]),
    ("line", &["線"]),
    ("tone", &["トーン", "色調"]),
    ("texture-detail", &["テクスチャ"]),
    ("shading", &["陰影"]),
    ("impression", &["印象"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooShort { chars: usize },
    MissingStyleName { style: String },
    TooFewKeywords { found: usize },
    TooFewSentences { found: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { chars } => {
                write!(f, "response too short ({chars} < {MIN_RESPONSE_CHARS} chars)")
            }
            Self::MissingStyleName { style } => write!(f, "style name '{style}' not mentioned"),
            Self::TooFewKeywords { found } => {
                write!(f, "only {found} of {MIN_KEYWORD_HITS} description keywords")
            }
            Self::TooFewSentences { found } => {
                write!(f, "only {found} of {MIN_SENTENCES} sentences")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assessment {
    pub rejections: Vec<Rejection>,
}

impl Assessment {
    pub fn is_accepted(&self) -> bool {
        self.rejections.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.rejections.is_empty() {
            return "accepted".to_string();
        }
        self.rejections
            .iter()
            .map(Rejection::to_string)
            .collect::<Vec<String>>()
            .join("; ")
    }
}

/// Runs every heuristic and reports all failures, not just the first.
pub fn assess(response: &str, style: &StyleSelection) -> Assessment {
    let text = response.trim();
    let lowered = text.to_lowercase();
    let mut rejections = Vec::new();

    let chars = text.chars().count();
    if chars < MIN_RESPONSE_CHARS {
        rejections.push(Rejection::TooShort { chars });
    }

    if !mentions_style(&lowered, style) {
        rejections.push(Rejection::MissingStyleName {
            style: style.label().to_string(),
        });
    }

    let keywords = keyword_hits(&lowered);
    if keywords < MIN_KEYWORD_HITS {
        rejections.push(Rejection::TooFewKeywords { found: keywords });
    }

    let sentences = sentence_count(text);
    if sentences < MIN_SENTENCES {
        rejections.push(Rejection::TooFewSentences { found: sentences });
    }

    Assessment { rejections }
}

pub fn is_acceptable(response: &str, style: &StyleSelection) -> bool {
    assess(response, style).is_accepted()
}

fn mentions_style(lowered: &str, style: &StyleSelection) -> bool {
    match style {
        StyleSelection::Known(name) => {
            let display = name.display_name().to_lowercase();
            let words: Vec<&str> = display.split_whitespace().collect();
            let spellings = [words.join(" "), words.join("-"), words.concat()];
            spellings
                .iter()
                .any(|spelling| lowered.contains(spelling.as_str()))
                || lowered.contains(name.localized_name())
        }
        StyleSelection::Unknown(raw) => {
            let needle = raw.trim().to_lowercase();
            !needle.is_empty() && lowered.contains(needle.as_str())
        }
    }
}

fn keyword_hits(lowered: &str) -> usize {
    DESCRIPTION_KEYWORDS
        .iter()
        .filter(|(english, localized)| {
            lowered.contains(english) || localized.iter().any(|word| lowered.contains(word))
        })
        .count()
}

fn sentence_count(text: &str) -> usize {
    text.split(SENTENCE_TERMINATORS)
        .filter(|sentence| !sentence.trim().is_empty())
        .count()
}
