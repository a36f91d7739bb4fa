use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::{TranslationBackend, TranslationConfig};
use crate::summarize::chunk_text;
use crate::{DigestError, Result};

/// Language codes offered on the command line, with display names
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("auto", "Auto-detect"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
];

/// Longest piece sent in one request; the endpoint takes text in the query string
const MAX_REQUEST_CHARS: usize = 1800;

/// Requested output language for summaries and answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLanguage {
    /// Keep the summary's own language, translating to English if it is not English
    Auto,
    Code(String),
}

impl TargetLanguage {
    pub fn english() -> Self {
        TargetLanguage::Code("en".to_string())
    }

    pub fn is_supported(&self) -> bool {
        let code = self.to_string();
        SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
    }
}

impl FromStr for TargetLanguage {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_lowercase();
        if code == "auto" {
            return Ok(TargetLanguage::Auto);
        }

        let valid = !code.is_empty()
            && code.len() <= 8
            && code.chars().all(|c| c.is_ascii_alphabetic() || c == '-')
            && !code.starts_with('-');
        if !valid {
            crate::bail!("Invalid language code: {}", s);
        }

        Ok(TargetLanguage::Code(code))
    }
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Auto => write!(f, "auto"),
            TargetLanguage::Code(code) => write!(f, "{}", code),
        }
    }
}

/// Translation and language identification
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String>;

    /// Best guess at the language of `text`, `None` when undecidable
    async fn detect_language(&self, text: &str) -> Result<Option<String>>;
}

/// Result of the translation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Language answers about this text should be given in
    pub language: String,
}

/// Translate `summary` as requested by `target`.
///
/// With [`TargetLanguage::Auto`] the summary's language is detected and it is translated to
/// English only when it is not already English. An explicit target is skipped when the text is
/// already in that language.
pub async fn translate_summary(
    translator: &dyn Translator,
    summary: &str,
    target: &TargetLanguage,
) -> Result<Translation> {
    let detected = match translator.detect_language(summary).await {
        Ok(lang) => lang,
        Err(e) => {
            tracing::warn!("Language detection failed: {}", e);
            None
        }
    };

    match target {
        TargetLanguage::Auto => {
            let Some(lang) = detected else {
                tracing::warn!("Could not auto-detect language, defaulting to English");
                return Ok(Translation {
                    text: summary.to_string(),
                    language: "en".to_string(),
                });
            };

            tracing::info!("Auto-detected language: {}", lang);
            let text = if lang == "en" {
                summary.to_string()
            } else {
                translator.translate(summary, "en").await?
            };
            Ok(Translation { text, language: lang })
        }
        TargetLanguage::Code(code) => {
            let text = if detected.as_deref() == Some(code.as_str()) {
                summary.to_string()
            } else {
                tracing::info!("Translating text to {}", code);
                translator.translate(summary, code).await?
            };
            Ok(Translation {
                text,
                language: code.clone(),
            })
        }
    }
}

/// Translator using the public Google translate web endpoint
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn request(&self, text: &str, target: &str) -> Result<Value> {
        let url = format!(
            "{}?client=gtx&sl=auto&tl={}&dt=t&q={}",
            self.endpoint,
            urlencoding::encode(target),
            urlencoding::encode(text)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            crate::bail!("Translation request failed: HTTP {}", response.status());
        }

        Ok(response.json().await?)
    }
}

impl Default for GoogleTranslator {
    fn default() -> Self {
        Self::new("https://translate.googleapis.com/translate_a/single")
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let mut pieces = Vec::new();
        for piece in chunk_text(text, MAX_REQUEST_CHARS, 0, 200) {
            let body = self.request(&piece, target).await?;
            pieces.push(parse_translation(&body)?);
        }

        Ok(pieces.join(" "))
    }

    async fn detect_language(&self, text: &str) -> Result<Option<String>> {
        let sample = crate::utils::truncate_chars(text.trim(), 500);
        if sample.chars().count() < 10 {
            return Ok(Some("en".to_string()));
        }

        match self.request(sample, "en").await {
            Ok(body) => Ok(parse_detected_language(&body)),
            Err(e) => {
                tracing::warn!("Translation API detection failed, using stopword counts: {}", e);
                Ok(detect_language_simple(text))
            }
        }
    }
}

/// Translator that returns text unchanged
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, target: &str) -> Result<String> {
        tracing::debug!("Translation disabled, keeping text for target {}", target);
        Ok(text.to_string())
    }

    async fn detect_language(&self, text: &str) -> Result<Option<String>> {
        Ok(detect_language_simple(text))
    }
}

/// Translator for the configured backend
pub fn translator_from_config(config: &TranslationConfig) -> Arc<dyn Translator> {
    match config.backend {
        TranslationBackend::Google => Arc::new(GoogleTranslator::new(config.endpoint.clone())),
        TranslationBackend::Passthrough => Arc::new(PassthroughTranslator),
    }
}

/// Concatenate the translated segments of an endpoint response
pub fn parse_translation(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| DigestError::new("Unexpected translation response"))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    Ok(text.trim().to_string())
}

/// Source language reported by an endpoint response
pub fn parse_detected_language(body: &Value) -> Option<String> {
    body.get(2)
        .and_then(Value::as_str)
        .map(|lang| lang.split('-').next().unwrap_or(lang).to_lowercase())
}

const STOPWORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by"]),
    ("es", &["el", "la", "los", "las", "y", "o", "pero", "en", "de", "con", "por", "para"]),
    ("fr", &["le", "la", "les", "et", "ou", "mais", "dans", "de", "avec", "par", "pour"]),
    ("de", &["der", "die", "das", "und", "oder", "aber", "in", "von", "mit", "für"]),
    ("it", &["il", "la", "i", "le", "e", "o", "ma", "in", "di", "con", "per"]),
    ("pt", &["o", "a", "os", "as", "e", "ou", "mas", "em", "de", "com", "por", "para"]),
];

/// Guess the language from stopword frequencies; `None` when nothing matches
pub fn detect_language_simple(text: &str) -> Option<String> {
    let words = crate::utils::words(text);

    let (lang, score) = STOPWORDS
        .iter()
        .map(|(lang, stopwords)| {
            let score = words.iter().filter(|w| stopwords.contains(&w.as_str())).count();
            (*lang, score)
        })
        // First language wins ties, so English is preferred
        .fold(("en", 0), |best, candidate| if candidate.1 > best.1 { candidate } else { best });

    if score == 0 {
        None
    } else {
        Some(lang.to_string())
    }
}
