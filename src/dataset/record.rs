use chrono::Local;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed column order of every corpus file.
pub const COLUMNS: [&str; 5] = ["text", "source_url", "date_extracted", "domain", "language"];

pub const DEFAULT_DOMAIN: &str = "general";

/// A candidate record as supplied by an upstream extraction step.
///
/// Every field is optional; absent fields are filled in by [`RecordInput::complete`]
/// rather than rejected. Unknown keys are ignored.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RecordInput {
    /// Extracted natural-language content
    pub text: Option<String>,
    /// Where the text came from
    pub source_url: Option<String>,
    /// Capture date, YYYY-MM-DD (default: today)
    pub date_extracted: Option<String>,
    /// Topical category (default: "general")
    pub domain: Option<String>,
    /// Language label of the text
    pub language: Option<String>,
}

/// One row of the corpus, field order matching [`COLUMNS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    pub source_url: String,
    pub date_extracted: String,
    pub domain: String,
    pub language: String,
}

impl RecordInput {
    pub fn complete(self, today: &str, default_domain: &str) -> Record {
        Record {
            text: self.text.unwrap_or_default(),
            source_url: self.source_url.unwrap_or_default(),
            date_extracted: self.date_extracted.unwrap_or_else(|| today.to_string()),
            domain: self.domain.unwrap_or_else(|| default_domain.to_string()),
            language: self.language.unwrap_or_default(),
        }
    }
}

pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
