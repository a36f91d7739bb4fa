use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ModelsConfig;
use crate::qa::{Answer, QuestionAnswering, SentenceRanker};
use crate::summarize::{SummaryModel, SummaryParams};
use crate::{DigestError, Result};

/// Client for hosted model inference (`POST {base}/{model}` with a JSON body)
#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    summarization_model: String,
    qa_model: String,
    embedding_model: String,
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct QaOutput {
    answer: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct ErrorOutput {
    error: String,
}

#[derive(Serialize)]
struct QaInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct SimilarityInputs<'a> {
    source_sentence: &'a str,
    sentences: &'a [String],
}

impl InferenceClient {
    pub fn new(config: &ModelsConfig, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: config.inference_url.trim_end_matches('/').to_string(),
            token,
            summarization_model: config.summarization_model.clone(),
            qa_model: config.qa_model.clone(),
            embedding_model: config.embedding_model.clone(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    async fn post<T: DeserializeOwned>(&self, model: &str, body: serde_json::Value) -> Result<T> {
        let url = self.model_url(model);
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorOutput>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            crate::bail!("{} returned HTTP {}: {}", model, status, detail.trim());
        }

        serde_json::from_str(&text)
            .map_err(|e| DigestError::new(format!("Unexpected response from {}: {}", model, e)))
    }
}

#[async_trait]
impl SummaryModel for InferenceClient {
    async fn summarize(&self, text: &str, params: SummaryParams) -> Result<String> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "max_length": params.max_length,
                "min_length": params.min_length,
                "do_sample": false,
            },
            "options": { "wait_for_model": true },
        });

        let outputs: Vec<SummaryOutput> = self.post(&self.summarization_model, body).await?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or_else(|| DigestError::new("Summarization model returned no output"))
    }

    fn model_name(&self) -> String {
        self.summarization_model.clone()
    }
}

#[async_trait]
impl QuestionAnswering for InferenceClient {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let inputs = serde_json::to_value(QaInputs { question, context })?;
        let body = json!({
            "inputs": inputs,
            "options": { "wait_for_model": true },
        });

        let output: QaOutput = self.post(&self.qa_model, body).await?;
        Ok(Answer {
            text: output.answer.trim().to_string(),
            score: output.score,
        })
    }
}

#[async_trait]
impl SentenceRanker for InferenceClient {
    async fn similarity(&self, query: &str, sentences: &[String]) -> Result<Vec<f32>> {
        let inputs = serde_json::to_value(SimilarityInputs { source_sentence: query, sentences })?;
        let body = json!({
            "inputs": inputs,
            "options": { "wait_for_model": true },
        });

        self.post(&self.embedding_model, body).await
    }
}
