use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, ModelBackend};
use crate::inference::InferenceClient;
use crate::translate::Translator;
use crate::utils::{split_sentences, words};
use crate::Result;

/// Sentences of the summary handed to the QA backend as context
const CONTEXT_SENTENCES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Backend confidence in `[0, 1]`
    pub score: f32,
}

/// Extractive question answering over a short context
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionAnswering: Send + Sync {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;
}

/// Scores each sentence's relevance to a query; one score per sentence, same order
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentenceRanker: Send + Sync {
    async fn similarity(&self, query: &str, sentences: &[String]) -> Result<Vec<f32>>;
}

/// Offline backend based on keyword overlap between question and text
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordModel;

fn keywords(question: &str) -> Vec<String> {
    words(question)
        .into_iter()
        .filter(|w| w.chars().count() > 2)
        .collect()
}

fn keyword_matches(keywords: &[String], sentence: &str) -> usize {
    let sentence_words = words(sentence);
    keywords
        .iter()
        .filter(|k| {
            sentence_words
                .iter()
                .any(|w| w.contains(k.as_str()) || k.contains(w.as_str()))
        })
        .count()
}

#[async_trait]
impl QuestionAnswering for KeywordModel {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let keywords = keywords(question);
        let sentences: Vec<&str> = context
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| s.chars().count() > 10)
            .collect();

        let mut best = sentences
            .first()
            .copied()
            .unwrap_or("I couldn't find a specific answer.");
        let mut best_matches = 0;

        for sentence in &sentences {
            let matches = keyword_matches(&keywords, sentence);
            if matches > best_matches {
                best_matches = matches;
                best = *sentence;
            }
        }

        let score = if keywords.is_empty() {
            0.0
        } else {
            (best_matches as f32 / keywords.len() as f32).min(0.9)
        };

        Ok(Answer {
            text: best.to_string(),
            score,
        })
    }
}

#[async_trait]
impl SentenceRanker for KeywordModel {
    async fn similarity(&self, query: &str, sentences: &[String]) -> Result<Vec<f32>> {
        let keywords = keywords(query);
        let total = keywords.len().max(1) as f32;
        Ok(sentences
            .iter()
            .map(|s| keyword_matches(&keywords, s) as f32 / total)
            .collect())
    }
}

/// Indices of the `k` highest scores, in ascending index order
fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let mut ranked: Vec<usize> = (0..scores.len()).collect();
    ranked.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    ranked.truncate(k);
    ranked.sort_unstable();
    ranked
}

/// Answers questions about a summary.
///
/// Built once with [`QaEngine::load`] and reused for every question; the backends it
/// holds are shared, nothing is reloaded per call.
pub struct QaEngine {
    qa: Arc<dyn QuestionAnswering>,
    ranker: Arc<dyn SentenceRanker>,
    translator: Arc<dyn Translator>,
}

impl QaEngine {
    pub fn new(
        qa: Arc<dyn QuestionAnswering>,
        ranker: Arc<dyn SentenceRanker>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self { qa, ranker, translator }
    }

    /// Build the engine for the configured model backend
    pub fn load(config: &Config, translator: Arc<dyn Translator>) -> Result<Self> {
        match config.models.backend {
            ModelBackend::Hosted => {
                if config.models.inference_url.trim().is_empty() {
                    crate::bail!("models.inference_url is empty");
                }
                let token = config.inference_token();
                if token.is_none() {
                    tracing::warn!(
                        "{} is not set, hosted models may reject requests",
                        config.models.token_env
                    );
                }

                let client = Arc::new(InferenceClient::new(&config.models, token));
                tracing::info!(
                    "QA engine using {} and {}",
                    config.models.qa_model,
                    config.models.embedding_model
                );
                Ok(Self::new(client.clone(), client, translator))
            }
            ModelBackend::Extractive => {
                tracing::info!("QA engine using keyword extraction");
                let model = Arc::new(KeywordModel);
                Ok(Self::new(model.clone(), model, translator))
            }
        }
    }

    /// Join the summary sentences most relevant to `question`, in their original order
    pub async fn relevant_context(&self, summary: &str, question: &str) -> Result<String> {
        let sentences: Vec<String> = split_sentences(summary)
            .into_iter()
            .map(str::to_string)
            .collect();
        if sentences.is_empty() {
            crate::bail!("Summary is empty, nothing to answer from");
        }

        let scores = self.ranker.similarity(question, &sentences).await?;
        if scores.len() != sentences.len() {
            crate::bail!(
                "Sentence ranker returned {} scores for {} sentences",
                scores.len(),
                sentences.len()
            );
        }

        let context: Vec<&str> = top_k_indices(&scores, CONTEXT_SENTENCES)
            .into_iter()
            .map(|i| sentences[i].as_str())
            .collect();
        Ok(context.join(". "))
    }

    pub async fn answer(&self, summary: &str, question: &str, target_language: &str) -> Result<Answer> {
        tracing::info!("Answering question: {} (target language: {})", question, target_language);

        let question_lang = match self.translator.detect_language(question).await {
            Ok(lang) => lang,
            Err(e) => {
                tracing::warn!("Could not detect question language: {}", e);
                None
            }
        };

        let question_en = match question_lang.as_deref() {
            Some(lang) if lang != "en" => {
                tracing::debug!("Translating question from {} to English", lang);
                self.translator.translate(question, "en").await?
            }
            _ => question.to_string(),
        };

        let context = self.relevant_context(summary, &question_en).await?;
        tracing::debug!("QA context: {}", context);

        let mut answer = self.qa.answer(&question_en, &context).await?;

        if !target_language.is_empty() && target_language != "en" {
            answer.text = self.translator.translate(&answer.text, target_language).await?;
        }

        Ok(answer)
    }
}

/// Starter questions for a summary, generic ones first
pub fn suggest_questions(summary: &str) -> Vec<String> {
    let mut suggestions = vec![
        "What is the main topic discussed?",
        "What are the most important takeaways?",
    ];

    let content = words(summary);
    let mentions = |terms: &[&str]| content.iter().any(|w| terms.contains(&w.as_str()));

    if mentions(&["how", "method", "process", "steps"]) {
        suggestions.push("How does this process work?");
    }
    if mentions(&["why", "reason", "because"]) {
        suggestions.push("Why is this important?");
    }
    if mentions(&["when", "time", "date", "year"]) {
        suggestions.push("When did this happen?");
    }
    if mentions(&["who", "person", "people"]) {
        suggestions.push("Who are the key people mentioned?");
    }
    if mentions(&["where", "location", "place"]) {
        suggestions.push("Where does this take place?");
    }

    suggestions.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::MockTranslator;
    use crate::DigestError;
    use mockall::predicate::eq;

    const SUMMARY: &str = "Rust is fast. Cats sleep a lot. Rust has ownership. Dogs bark. \
                           Rust compiles to native code.";

    fn english_translator() -> MockTranslator {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Ok(Some("en".to_string())));
        translator.expect_translate().never();
        translator
    }

    fn fixed_ranker(scores: Vec<f32>) -> MockSentenceRanker {
        let mut ranker = MockSentenceRanker::new();
        ranker
            .expect_similarity()
            .returning(move |_, _| Ok(scores.clone()));
        ranker
    }

    #[tokio::test]
    async fn test_context_keeps_original_order() {
        let mut qa = MockQuestionAnswering::new();
        qa.expect_answer()
            .withf(|question, context| {
                question == "What is Rust?"
                    && context == "Rust is fast. Rust has ownership. Rust compiles to native code"
            })
            .times(1)
            .returning(|_, _| Ok(Answer { text: "fast".to_string(), score: 0.8 }));

        let engine = QaEngine::new(
            Arc::new(qa),
            Arc::new(fixed_ranker(vec![0.9, 0.1, 0.7, 0.2, 0.8])),
            Arc::new(english_translator()),
        );

        let answer = engine.answer(SUMMARY, "What is Rust?", "en").await.unwrap();
        assert_eq!(answer.text, "fast");
    }

    #[tokio::test]
    async fn test_translates_question_and_answer() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Ok(Some("fr".to_string())));
        translator
            .expect_translate()
            .with(eq("Qu'est-ce que Rust?"), eq("en"))
            .times(1)
            .returning(|_, _| Ok("What is Rust?".to_string()));
        translator
            .expect_translate()
            .with(eq("fast"), eq("fr"))
            .times(1)
            .returning(|_, _| Ok("rapide".to_string()));

        let mut qa = MockQuestionAnswering::new();
        qa.expect_answer()
            .withf(|question, _| question == "What is Rust?")
            .returning(|_, _| Ok(Answer { text: "fast".to_string(), score: 0.8 }));

        let engine = QaEngine::new(
            Arc::new(qa),
            Arc::new(fixed_ranker(vec![0.5; 5])),
            Arc::new(translator),
        );

        let answer = engine.answer(SUMMARY, "Qu'est-ce que Rust?", "fr").await.unwrap();
        assert_eq!(answer.text, "rapide");
    }

    #[tokio::test]
    async fn test_detection_failure_assumes_english() {
        let mut translator = MockTranslator::new();
        translator
            .expect_detect_language()
            .returning(|_| Err(DigestError::new("offline")));
        translator.expect_translate().never();

        let engine = QaEngine::new(
            Arc::new(KeywordModel),
            Arc::new(KeywordModel),
            Arc::new(translator),
        );

        let answer = engine
            .answer(SUMMARY, "What does Rust compile to?", "en")
            .await
            .unwrap();
        assert_eq!(answer.text, "Rust compiles to native code");
    }

    #[tokio::test]
    async fn test_empty_summary_is_an_error() {
        let engine = QaEngine::new(
            Arc::new(MockQuestionAnswering::new()),
            Arc::new(MockSentenceRanker::new()),
            Arc::new(english_translator()),
        );

        let err = engine.answer(" . . ", "Anything?", "en").await.unwrap_err();
        assert_eq!(err.message(), "Summary is empty, nothing to answer from");
    }

    #[tokio::test]
    async fn test_score_count_mismatch_is_an_error() {
        let engine = QaEngine::new(
            Arc::new(MockQuestionAnswering::new()),
            Arc::new(fixed_ranker(vec![1.0])),
            Arc::new(english_translator()),
        );

        assert!(engine.answer(SUMMARY, "What is Rust?", "en").await.is_err());
    }

    #[tokio::test]
    async fn test_keyword_model_picks_best_sentence() {
        let answer = KeywordModel
            .answer(
                "Which animals sleep a lot?",
                "Dogs bark at night. Cats sleep a lot during the day.",
            )
            .await
            .unwrap();

        assert_eq!(answer.text, "Cats sleep a lot during the day");
        assert!(answer.score > 0.0 && answer.score <= 0.9);
    }

    #[tokio::test]
    async fn test_keyword_model_without_context() {
        let answer = KeywordModel.answer("Why?", "").await.unwrap();
        assert_eq!(answer.text, "I couldn't find a specific answer.");
        assert_eq!(answer.score, 0.0);
    }

    #[test]
    fn test_top_k_indices() {
        assert_eq!(top_k_indices(&[0.1, 0.9, 0.5, 0.7], 3), vec![1, 2, 3]);
        assert_eq!(top_k_indices(&[0.3, 0.3], 3), vec![0, 1]);
        assert!(top_k_indices(&[], 3).is_empty());
    }

    #[test]
    fn test_suggestions_follow_content() {
        let suggestions = suggest_questions("The process starts because people asked for it.");
        assert!(suggestions.contains(&"How does this process work?".to_string()));
        assert!(suggestions.contains(&"Why is this important?".to_string()));
        assert!(suggestions.contains(&"Who are the key people mentioned?".to_string()));
        assert!(!suggestions.contains(&"Where does this take place?".to_string()));
    }
}
