use serde::{Deserialize, Serialize};

/// One harm category and the threshold at which Gemini withholds output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: impl Into<String>, threshold: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            threshold: threshold.into(),
        }
    }
}

/// Harm categories sent with every request.
pub const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub const SAFETY_THRESHOLD: &str = "BLOCK_NONE";

/// The fixed safety configuration shared by the streaming and fallback calls.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    HARM_CATEGORIES
        .into_iter()
        .map(|category| SafetySetting::new(category, SAFETY_THRESHOLD))
        .collect()
}

/// Finish reasons that mean the candidate was cut off by a content filter.
pub const BLOCKING_FINISH_REASONS: [&str; 6] = [
    "SAFETY",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
    "RECITATION",
];
