//! Domain models for notes and output languages.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A note picked from the study folder, loaded and ready to be prompted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub file_name: String,
    pub content: String,
    pub source_path: PathBuf,
}

/// Output language of the generated summary and quiz.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum TargetLanguage {
    #[default]
    #[serde(alias = "ko")]
    #[value(alias = "ko")]
    Korean,
    #[serde(alias = "en")]
    #[value(alias = "en")]
    English,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 2] = [TargetLanguage::Korean, TargetLanguage::English];

    /// Stable identifier used in configuration, templates and persisted state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetLanguage::Korean => "korean",
            TargetLanguage::English => "english",
        }
    }

    /// Label shown in the language picker.
    pub fn label(&self) -> &'static str {
        match self {
            TargetLanguage::Korean => "한국어 🇰🇷",
            TargetLanguage::English => "English 🇺🇸",
        }
    }

    /// Placeholder text displayed while a review is in flight.
    pub fn loading_message(&self) -> &'static str {
        match self {
            TargetLanguage::Korean => "Gemini가 읽는 중...",
            TargetLanguage::English => "Gemini is reading...",
        }
    }

    /// The other language; the picker only ever has two entries.
    pub fn toggle(self) -> Self {
        match self {
            TargetLanguage::Korean => TargetLanguage::English,
            TargetLanguage::English => TargetLanguage::Korean,
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetLanguage {
    type Err = LanguageParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed == "한국어" {
            return Ok(TargetLanguage::Korean);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "korean" | "ko" | "kr" => Ok(TargetLanguage::Korean),
            "english" | "en" => Ok(TargetLanguage::English),
            other => Err(LanguageParseError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Error returned when parsing a [`TargetLanguage`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LanguageParseError {
    #[error("unknown output language '{0}' (expected korean or english)")]
    UnknownLanguage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_names() {
        assert_eq!("ko".parse::<TargetLanguage>(), Ok(TargetLanguage::Korean));
        assert_eq!("한국어".parse::<TargetLanguage>(), Ok(TargetLanguage::Korean));
        assert_eq!(" English ".parse::<TargetLanguage>(), Ok(TargetLanguage::English));
        assert!("french".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn toggle_cycles_between_both_languages() {
        assert_eq!(TargetLanguage::Korean.toggle(), TargetLanguage::English);
        assert_eq!(TargetLanguage::English.toggle().toggle(), TargetLanguage::English);
    }

    #[test]
    fn serializes_as_kebab_case_identifier() {
        let json = serde_json::to_string(&TargetLanguage::English).unwrap();
        assert_eq!(json, "\"english\"");
    }
}
