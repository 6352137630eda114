use std::fmt;

use serde::{Deserialize, Serialize};

/// Prompt used when the requested style is not one of the known presets.
pub const GENERIC_PROMPT: &str = "Please transform this image.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleName {
    Anime,
    Watercolor,
    OilPainting,
    PixelArt,
    Neon,
    Monochrome,
    PopArt,
    Sketch,
}

impl StyleName {
    pub const ALL: [StyleName; 8] = [
        StyleName::Anime,
        StyleName::Watercolor,
        StyleName::OilPainting,
        StyleName::PixelArt,
        StyleName::Neon,
        StyleName::Monochrome,
        StyleName::PopArt,
        StyleName::Sketch,
    ];

    /// Stable identifier, safe for file names.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Anime => "anime",
            Self::Watercolor => "watercolor",
            Self::OilPainting => "oil_painting",
            Self::PixelArt => "pixel_art",
            Self::Neon => "neon",
            Self::Monochrome => "monochrome",
            Self::PopArt => "pop_art",
            Self::Sketch => "sketch",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Anime => "Anime",
            Self::Watercolor => "Watercolor",
            Self::OilPainting => "Oil Painting",
            Self::PixelArt => "Pixel Art",
            Self::Neon => "Neon",
            Self::Monochrome => "Monochrome",
            Self::PopArt => "Pop Art",
            Self::Sketch => "Sketch",
        }
    }

    /// Japanese label; accepted both as input and as a mention of the style in
    /// generated text.
    pub fn localized_name(&self) -> &'static str {
        match self {
            Self::Anime => "アニメ",
            Self::Watercolor => "水彩",
            Self::OilPainting => "油絵",
            Self::PixelArt => "ピクセルアート",
            Self::Neon => "ネオン",
            Self::Monochrome => "モノクロ",
            Self::PopArt => "ポップアート",
            Self::Sketch => "スケッチ",
        }
    }

    pub fn prompt_template(&self) -> &'static str {
        match self {
            Self::Anime => {
                "Transform this image into an anime style. Use bright colors and distinctive \
                 line art so that it looks like a Japanese animation."
            }
            Self::Watercolor => {
                "Transform this image into a watercolor painting. Express soft brush strokes, \
                 pale tones, and the bleeding that is characteristic of watercolor."
            }
            Self::OilPainting => {
                "Transform this image into a classic oil painting. Give it rich colors and a \
                 thick impasto texture, as if it had been painted by an impressionist."
            }
            Self::PixelArt => {
                "Transform this image into retro pixel art. Use a limited palette and crisp \
                 pixel boundaries, like an 80s video game."
            }
            Self::Neon => {
                "Transform this image into a futuristic neon style. Add vivid glowing elements \
                 against a dark background for a cyberpunk atmosphere."
            }
            Self::Monochrome => {
                "Transform this image into a monochrome style. Use strong contrast and deep \
                 blacks for a dramatic black-and-white photograph finish."
            }
            Self::PopArt => {
                "Transform this image into pop art. Use bright, bold colors, clear outlines, and \
                 halftone patterns for a finish in the manner of Andy Warhol."
            }
            Self::Sketch => {
                "Transform this image into a pencil sketch. Use fine lines and delicate shading \
                 so that it looks like a hand-drawn drawing."
            }
        }
    }

    /// Case-insensitive lookup that ignores spaces, hyphens and underscores.
    /// Japanese labels may carry a trailing `風` or `画風`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let normalized: String = trimmed
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();
        if normalized.is_empty() {
            return None;
        }
        let label = trimmed
            .strip_suffix("画風")
            .or_else(|| trimmed.strip_suffix('風'))
            .unwrap_or(trimmed);
        Self::ALL.into_iter().find(|style| {
            let id: String = style.id().chars().filter(|ch| *ch != '_').collect();
            id == normalized || label == style.localized_name()
        })
    }
}

impl fmt::Display for StyleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A style as requested by the user: either a known preset or the raw text
/// of an unrecognized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSelection {
    Known(StyleName),
    Unknown(String),
}

impl StyleSelection {
    pub fn parse(raw: &str) -> Self {
        match StyleName::parse(raw) {
            Some(style) => Self::Known(style),
            None => Self::Unknown(raw.trim().to_string()),
        }
    }

    pub fn style(&self) -> Option<StyleName> {
        match self {
            Self::Known(style) => Some(*style),
            Self::Unknown(_) => None,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Known(style) => style.display_name(),
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn prompt_template(&self) -> &'static str {
        match self {
            Self::Known(style) => style.prompt_template(),
            Self::Unknown(_) => GENERIC_PROMPT,
        }
    }

    /// Lowercase tag for artifact names; unknown styles are reduced to
    /// `[a-z0-9_]` and fall back to `custom`.
    pub fn file_tag(&self) -> String {
        match self {
            Self::Known(style) => style.id().to_string(),
            Self::Unknown(raw) => {
                let tag: String = raw
                    .chars()
                    .filter_map(|ch| {
                        if ch.is_ascii_alphanumeric() {
                            Some(ch.to_ascii_lowercase())
                        } else if matches!(ch, ' ' | '-' | '_') {
                            Some('_')
                        } else {
                            None
                        }
                    })
                    .collect();
                let tag = tag.trim_matches('_');
                if tag.is_empty() {
                    "custom".to_string()
                } else {
                    tag.chars().take(32).collect()
                }
            }
        }
    }
}

impl From<StyleName> for StyleSelection {
    fn from(style: StyleName) -> Self {
        Self::Known(style)
    }
}

impl fmt::Display for StyleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Prompt sent to the model: the style template plus any user instruction.
pub fn transformation_prompt(style: &StyleSelection, custom_instruction: Option<&str>) -> String {
    let base = style.prompt_template();
    match custom_instruction.map(str::trim).filter(|value| !value.is_empty()) {
        Some(instruction) => format!("{base} Additional instructions: {instruction}"),
        None => base.to_string(),
    }
}

/// Message shown in the conversation on behalf of the user.
pub fn request_message(style: &StyleSelection, custom_instruction: Option<&str>) -> String {
    let mut message = format!("Transform this image into the {} style.", style.label());
    if let Some(instruction) = custom_instruction
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        message.push_str("\nAdditional instructions: ");
        message.push_str(instruction);
    }
    message
}
