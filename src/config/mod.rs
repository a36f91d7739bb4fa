use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External command-line tools
    pub tools: ToolsConfig,

    /// Summarization / QA model backends
    pub models: ModelsConfig,

    /// Chunking and merge thresholds
    pub summarizer: SummarizerConfig,

    /// Translation service
    pub translation: TranslationConfig,

    /// Batch processing limits
    pub batch: BatchConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// yt-dlp executable
    pub yt_dlp: String,

    /// Python interpreter used for helper scripts
    pub python: String,

    /// pytube download script, used when yt-dlp fails
    pub pytube_script: Option<PathBuf>,

    /// whisper executable
    pub whisper: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Hosted inference endpoints
    Hosted,
    /// Built-in keyword based extraction, no network
    Extractive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub backend: ModelBackend,

    /// Base URL of the inference API; the model id is appended
    pub inference_url: String,

    /// Environment variable holding the API token
    pub token_env: String,

    pub summarization_model: String,
    pub qa_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub max_chunk_size: usize,
    pub overlap: usize,

    /// How far back from a chunk end to look for a sentence terminator
    pub sentence_lookback: usize,

    /// Characters passed to the model per call
    pub max_input_length: usize,

    /// Merged summaries longer than this are summarized again
    pub merge_threshold: usize,

    /// Shortest text worth summarizing
    pub min_text_length: usize,

    pub summary_max_length: u32,
    pub summary_min_length: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationBackend {
    /// Google translate web endpoint
    Google,
    /// Leave text as is; language detection by stopword counts
    Passthrough,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub backend: TranslationBackend,
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on concurrent videos
    pub max_workers: usize,

    /// Maximum URLs accepted per batch
    pub max_videos: usize,

    /// Captions shorter than this fall back to speech-to-text
    pub min_caption_length: usize,

    pub snippet_length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Temporary directory for downloads
    pub temp_dir: Option<PathBuf>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp: "yt-dlp".to_string(),
            python: "python3".to_string(),
            pytube_script: None,
            whisper: "whisper".to_string(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Hosted,
            inference_url: "https://api-inference.huggingface.co/models".to_string(),
            token_env: "HF_API_TOKEN".to_string(),
            summarization_model: "facebook/bart-large-cnn".to_string(),
            qa_model: "distilbert-base-uncased-distilled-squad".to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            overlap: 100,
            sentence_lookback: 200,
            max_input_length: 1024,
            merge_threshold: 1000,
            min_text_length: 50,
            summary_max_length: 150,
            summary_min_length: 50,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: TranslationBackend::Google,
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_videos: 20,
            min_caption_length: 100,
            snippet_length: 500,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config = Self::from_yaml(&content)?;
            tracing::debug!("Loaded configuration from {}", config_path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Read the config without creating one; an unreadable or invalid file falls back to defaults
    pub fn read_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::read_or_default_from(&path),
            Err(e) => {
                tracing::warn!("Using default configuration: {:#}", e);
                Self::default()
            }
        }
    }

    fn read_or_default_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let loaded = fs_err::read_to_string(path)
            .context("Failed to read config file")
            .and_then(|content| Self::from_yaml(&content));
        match loaded {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config at {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("vdigest.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("video-digest").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let s = &self.summarizer;
        if s.max_chunk_size == 0 {
            anyhow::bail!("summarizer.max_chunk_size must be greater than zero");
        }
        if s.overlap >= s.max_chunk_size {
            anyhow::bail!(
                "summarizer.overlap ({}) must be smaller than max_chunk_size ({})",
                s.overlap,
                s.max_chunk_size
            );
        }
        if s.max_input_length == 0 {
            anyhow::bail!("summarizer.max_input_length must be greater than zero");
        }
        if self.batch.max_workers == 0 {
            anyhow::bail!("batch.max_workers must be greater than zero");
        }

        Ok(())
    }

    /// API token for hosted models, if the configured variable is set
    pub fn inference_token(&self) -> Option<String> {
        std::env::var(&self.models.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  yt-dlp: {}", self.tools.yt_dlp);
        println!("  whisper: {}", self.tools.whisper);
        if let Some(script) = &self.tools.pytube_script {
            println!("  pytube script: {} {}", self.tools.python, script.display());
        }
        println!("  Model backend: {:?}", self.models.backend);
        if self.models.backend == ModelBackend::Hosted {
            println!("  Inference URL: {}", self.models.inference_url);
            println!(
                "  API token ({}): {}",
                self.models.token_env,
                if self.inference_token().is_some() { "set" } else { "not set" }
            );
        }
        println!("  Translation: {:?}", self.translation.backend);
        println!(
            "  Chunking: {} chars, {} overlap",
            self.summarizer.max_chunk_size, self.summarizer.overlap
        );
        println!("  Max workers: {}", self.batch.max_workers);
        println!("  Max videos per batch: {}", self.batch.max_videos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.max_workers, 4);
        assert_eq!(config.summarizer.max_chunk_size, 1000);
        assert_eq!(config.summarizer.overlap, 100);
    }

    #[test]
    fn test_read_or_default_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let config = Config::read_or_default_from(&path);
        assert_eq!(config.batch.max_workers, 4);
        assert!(!path.exists());
    }

    #[test]
    fn test_read_or_default_ignores_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "batch:\n  max_workers: 0\n").unwrap();

        let config = Config::read_or_default_from(&path);
        assert_eq!(config.batch.max_workers, 4);

        std::fs::write(&path, "batch:\n  max_workers: 7\n").unwrap();
        assert_eq!(Config::read_or_default_from(&path).batch.max_workers, 7);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "batch:\n  max_workers: 2\nmodels:\n  backend: extractive\n";
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.batch.max_workers, 2);
        assert_eq!(config.batch.max_videos, 20);
        assert_eq!(config.models.backend, ModelBackend::Extractive);
        assert_eq!(config.tools.yt_dlp, "yt-dlp");
    }

    #[test]
    fn test_rejects_overlap_larger_than_chunk() {
        let yaml = "summarizer:\n  max_chunk_size: 100\n  overlap: 100\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let yaml = "batch:\n  max_workers: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut config = Config::default();
        config.tools.pytube_script = Some(PathBuf::from("scripts/pytube_download.py"));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.tools.pytube_script, config.tools.pytube_script);
        assert_eq!(parsed.models.qa_model, config.models.qa_model);
    }
}
