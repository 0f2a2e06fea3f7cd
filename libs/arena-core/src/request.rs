use crate::error::Result;
use crate::types::Language;

/// Everything needed to upload one snippet to the execution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPayload {
    pub language: Language,
    pub filename: String,
    pub code: Vec<u8>,
}

impl ExecutionPayload {
    /// Fails with `UnsupportedLanguage` when `language` is not a known identifier.
    pub fn build(code: &str, language: &str) -> Result<Self> {
        let language: Language = language.parse()?;
        Ok(Self::for_language(code, language))
    }

    fn for_language(code: &str, language: Language) -> Self {
        Self {
            language,
            filename: format!("code{}", language.extension()),
            code: code.as_bytes().to_vec(),
        }
    }
}
