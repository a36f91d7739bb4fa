use async_trait::async_trait;

use crate::Result;

/// Generation bounds passed to the summarization model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryParams {
    pub max_length: u32,
    pub min_length: u32,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 50,
        }
    }
}

/// A model that condenses one bounded-length piece of text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, text: &str, params: SummaryParams) -> Result<String>;

    fn model_name(&self) -> String;
}

/// Picks the highest scoring sentences; works offline
pub struct ExtractiveSummarizer {
    max_sentences: usize,
}

impl ExtractiveSummarizer {
    pub fn new(max_sentences: usize) -> Self {
        Self {
            max_sentences: max_sentences.max(1),
        }
    }

    pub fn extract(&self, text: &str) -> String {
        let sentences: Vec<&str> = text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.chars().count() > 10)
            .collect();

        if sentences.is_empty() {
            return crate::utils::truncate_chars(text.trim(), 200).to_string();
        }

        if sentences.len() <= self.max_sentences {
            return format!("{}.", sentences.join(". "));
        }

        let total = sentences.len() as f64;
        let mut scored: Vec<(usize, usize)> = sentences
            .iter()
            .enumerate()
            .map(|(index, sentence)| {
                let mut score = sentence.chars().count();
                // Favour the opening and the conclusion
                let position = index as f64;
                if position < total * 0.3 {
                    score += 15;
                } else if position > total * 0.7 {
                    score += 10;
                }
                (index, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut picked: Vec<usize> = scored
            .into_iter()
            .take(self.max_sentences)
            .map(|(index, _)| index)
            .collect();
        picked.sort_unstable();

        let summary: Vec<&str> = picked.into_iter().map(|i| sentences[i]).collect();
        format!("{}.", summary.join(". "))
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

#[async_trait]
impl SummaryModel for ExtractiveSummarizer {
    async fn summarize(&self, text: &str, _params: SummaryParams) -> Result<String> {
        Ok(self.extract(text))
    }

    fn model_name(&self) -> String {
        "extractive".to_string()
    }
}
