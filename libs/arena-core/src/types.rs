use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use crate::error::ArenaError;

/// Languages the execution service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Cpp,
    Rust,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Cpp,
        Language::Rust,
    ];

    /// Identifier used on the wire and in user input.
    pub fn value(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Cpp => "cpp",
            Language::Rust => "rust",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Cpp => "C++",
            Language::Rust => "Rust",
        }
    }

    /// Canonical source file extension, leading dot included.
    /// The service picks its runner from this, so it must stay in sync with it.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::Python => ".py",
            Language::JavaScript => ".js",
            Language::Cpp => ".cpp",
            Language::Rust => ".rs",
        }
    }

    /// Reverse of `extension`, the way the service picks a runner for an
    /// uploaded file. The leading dot is optional.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        Language::ALL
            .into_iter()
            .find(|lang| &lang.extension()[1..] == ext)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for Language {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.value() == s)
            .ok_or_else(|| ArenaError::UnsupportedLanguage(s.to_string()))
    }
}

/// Static description of a language, as offered to users picking one.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    pub value: &'static str,
    pub label: &'static str,
    pub extension: &'static str,
}

impl From<Language> for LanguageOption {
    fn from(language: Language) -> Self {
        Self {
            value: language.value(),
            label: language.label(),
            extension: language.extension(),
        }
    }
}

pub fn supported_languages() -> Vec<LanguageOption> {
    Language::ALL.into_iter().map(LanguageOption::from).collect()
}

/// One side of a comparison as the user typed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotInput {
    pub code: String,
    pub language: String,
}

impl SlotInput {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// Outcome of one remote execution.
///
/// Every measurement is optional: the service leaves out what it did not
/// measure (e.g. no compilation step for interpreted languages, nothing at all
/// when it rejects the upload).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub success: bool,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation_memory_bytes: Option<u64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_memory_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A failed result produced locally, without any measurement.
    pub fn failure(language: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            output: String::new(),
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Position of a slot within a comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    First,
    Second,
}

impl SlotId {
    pub const ALL: [SlotId; 2] = [SlotId::First, SlotId::Second];

    /// 1-based position shown to users.
    pub fn position(&self) -> u8 {
        match self {
            SlotId::First => 1,
            SlotId::Second => 2,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            SlotId::First => 0,
            SlotId::Second => 1,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.position())
    }
}

/// Exactly one value per slot. Serialized as `{"1": .., "2": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPair<T> {
    #[serde(rename = "1")]
    pub first: T,
    #[serde(rename = "2")]
    pub second: T,
}

impl<T> SlotPair<T> {
    pub fn new(first: T, second: T) -> Self {
        Self { first, second }
    }

    pub fn from_fn(mut f: impl FnMut(SlotId) -> T) -> Self {
        Self {
            first: f(SlotId::First),
            second: f(SlotId::Second),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> {
        [(SlotId::First, &self.first), (SlotId::Second, &self.second)].into_iter()
    }
}

impl<T> Index<SlotId> for SlotPair<T> {
    type Output = T;

    fn index(&self, slot: SlotId) -> &T {
        match slot {
            SlotId::First => &self.first,
            SlotId::Second => &self.second,
        }
    }
}
