//! Configuration for the document QA service
//!
//! Values are layered: built-in defaults, then an optional TOML file named by
//! `CONFIG_FILE`, then a `.env` file, then process environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Name of the ledger file kept inside the upload directory
pub const LEDGER_FILENAME: &str = ".processed_files.json";

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Application name shown on the root endpoint
    pub app_name: String,
    /// Verbose logging
    pub debug: bool,
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// LLM configuration
    pub llm: LlmConfig,
    /// Provider credentials
    pub api_keys: ApiKeys,
    /// Vector store configuration
    pub vector_store: VectorStoreConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Upload directory and retention
    pub files: FilesConfig,
    /// Conversation memory
    pub conversation: ConversationConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            app_name: "Document QA Agent".to_string(),
            debug: false,
            server: ServerConfig::default(),
            embeddings: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            api_keys: ApiKeys::default(),
            vector_store: VectorStoreConfig::default(),
            chunking: ChunkingConfig::default(),
            files: FilesConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024,
        }
    }
}

/// Which service produces embeddings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI embeddings API
    OpenAi,
    /// HuggingFace Inference API
    #[default]
    HuggingFace,
    /// Local Ollama server
    Local,
}

impl FromStr for EmbeddingBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "huggingface" => Ok(Self::HuggingFace),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(Error::Config(format!(
                "Unsupported embedding provider: {}",
                other
            ))),
        }
    }
}

/// Which service generates answers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// OpenAI chat completions
    #[default]
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Local Ollama server
    Local,
}

impl FromStr for LlmBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(Error::Config(format!("Unsupported LLM provider: {}", other))),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider selection
    pub provider: EmbeddingBackend,
    /// Model name. Interpreted by the selected provider.
    pub model: String,
    /// Embedding dimensions reported by the provider
    pub dimensions: usize,
    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::HuggingFace,
            model: "sentence-transformers/all-mpnet-base-v2".to_string(),
            dimensions: 768,
            batch_size: 32,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider selection
    pub provider: LlmBackend,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens in a generated answer
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// OpenAI-compatible base URL
    pub openai_base_url: String,
    /// Anthropic base URL
    pub anthropic_base_url: String,
    /// HuggingFace Inference API base URL
    pub huggingface_base_url: String,
    /// Ollama base URL, used by the local providers
    pub ollama_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::OpenAi,
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: 120,
            max_retries: 2,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            huggingface_base_url: "https://api-inference.huggingface.co".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
        }
    }
}

/// Provider credentials. Never serialized back out.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    #[serde(skip_serializing)]
    pub openai: Option<String>,
    #[serde(skip_serializing)]
    pub anthropic: Option<String>,
    #[serde(skip_serializing)]
    pub huggingface: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| k.as_ref().map(|_| "***");
        f.debug_struct("ApiKeys")
            .field("openai", &mask(&self.openai))
            .field("anthropic", &mask(&self.anthropic))
            .field("huggingface", &mask(&self.huggingface))
            .finish()
    }
}

/// Vector store selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreBackend {
    /// Persistent SQLite file under `persist_directory`
    #[default]
    Sqlite,
    /// In-process, lost on restart
    Memory,
}

impl FromStr for VectorStoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "chroma" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("Unsupported vector store: {}", other))),
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Backend selection
    pub backend: VectorStoreBackend,
    /// Directory holding the persistent index
    pub persist_directory: PathBuf,
    /// Number of chunks retrieved per question
    pub retriever_k: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorStoreBackend::Sqlite,
            persist_directory: PathBuf::from("./data/vector_store"),
            retriever_k: 4,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Upload directory and retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Where uploads are written and where sync scans
    pub upload_directory: PathBuf,
    /// Files older than this many days are removed by cleanup
    pub retention_days: u64,
    /// Run cleanup periodically when set
    pub cleanup_interval_secs: Option<u64>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_directory: PathBuf::from("./data/uploads"),
            retention_days: 30,
            cleanup_interval_secs: None,
        }
    }
}

impl FilesConfig {
    /// Path of the processed-files ledger
    pub fn ledger_path(&self) -> PathBuf {
        self.upload_directory.join(LEDGER_FILENAME)
    }
}

/// Conversation memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Maximum remembered question/answer turns
    pub max_turns: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self { max_turns: 20 }
    }
}

impl RagConfig {
    /// Build configuration from defaults, `CONFIG_FILE`, `.env` and the environment
    pub fn load() -> Result<Self> {
        // .env only fills variables not already set in the process
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!("Failed to read .env file: {}", e);
            }
        }

        let mut config = match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.absolutize_paths();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Overlay values from a key lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, get: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("APP_NAME") {
            self.app_name = v;
        }
        if let Some(v) = get("DEBUG") {
            self.debug = parse_bool(&v);
        }

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_num("PORT", &v)?;
        }
        if let Some(v) = get("MAX_FILE_SIZE") {
            self.server.max_upload_size = parse_num("MAX_FILE_SIZE", &v)?;
        }

        if let Some(v) = get("EMBEDDING_PROVIDER") {
            self.embeddings.provider = v.parse()?;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.embeddings.model = v;
        }
        if let Some(v) = get("EMBEDDING_DIMENSIONS") {
            self.embeddings.dimensions = parse_num("EMBEDDING_DIMENSIONS", &v)?;
        }

        if let Some(v) = get("LLM_PROVIDER") {
            self.llm.provider = v.parse()?;
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_TEMPERATURE") {
            self.llm.temperature = parse_num("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_num("LLM_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.openai_base_url = v;
        }
        if let Some(v) = get("OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = v;
        }

        if let Some(v) = get("OPENAI_API_KEY").filter(|v| !v.is_empty()) {
            self.api_keys.openai = Some(v);
        }
        if let Some(v) = get("ANTHROPIC_API_KEY").filter(|v| !v.is_empty()) {
            self.api_keys.anthropic = Some(v);
        }
        if let Some(v) = get("HUGGINGFACEHUB_API_TOKEN").filter(|v| !v.is_empty()) {
            self.api_keys.huggingface = Some(v);
        }

        if let Some(v) = get("VECTOR_STORE") {
            self.vector_store.backend = v.parse()?;
        }
        if let Some(v) = get("PERSIST_DIRECTORY") {
            self.vector_store.persist_directory = PathBuf::from(v);
        }
        if let Some(v) = get("RETRIEVER_K") {
            self.vector_store.retriever_k = parse_num("RETRIEVER_K", &v)?;
        }

        if let Some(v) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_num("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_num("CHUNK_OVERLAP", &v)?;
        }

        if let Some(v) = get("UPLOAD_DIRECTORY") {
            self.files.upload_directory = PathBuf::from(v);
        }
        if let Some(v) = get("RETENTION_DAYS") {
            self.files.retention_days = parse_num("RETENTION_DAYS", &v)?;
        }
        if let Some(v) = get("CLEANUP_INTERVAL_SECS") {
            self.files.cleanup_interval_secs = Some(parse_num("CLEANUP_INTERVAL_SECS", &v)?);
        }

        if let Some(v) = get("MAX_CONVERSATION_TURNS") {
            self.conversation.max_turns = parse_num("MAX_CONVERSATION_TURNS", &v)?;
        }

        Ok(())
    }

    /// Resolve relative directories against the working directory so ledger
    /// keys stay stable regardless of how paths were spelled.
    pub fn absolutize_paths(&mut self) {
        if let Ok(cwd) = std::env::current_dir() {
            if self.files.upload_directory.is_relative() {
                self.files.upload_directory = cwd.join(&self.files.upload_directory);
            }
            if self.vector_store.persist_directory.is_relative() {
                self.vector_store.persist_directory =
                    cwd.join(&self.vector_store.persist_directory);
            }
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("CHUNK_SIZE must be greater than 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.vector_store.retriever_k == 0 {
            return Err(Error::Config("RETRIEVER_K must be greater than 0".into()));
        }
        if self.conversation.max_turns == 0 {
            return Err(Error::Config(
                "MAX_CONVERSATION_TURNS must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_num<T: FromStr>(key: &str, v: &str) -> Result<T> {
    v.trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {:?}", key, v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.vector_store.retriever_k, 4);
        assert_eq!(config.files.retention_days, 30);
        assert_eq!(config.server.max_upload_size, 100 * 1024 * 1024);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config
            .apply_env(env(&[
                ("EMBEDDING_PROVIDER", "huggingface"),
                ("LLM_PROVIDER", "anthropic"),
                ("LLM_MODEL", "claude-3-haiku-20240307"),
                ("CHUNK_SIZE", "500"),
                ("CHUNK_OVERLAP", "50"),
                ("UPLOAD_DIRECTORY", "/tmp/uploads"),
                ("DEBUG", "true"),
                ("OPENAI_API_KEY", ""),
            ]))
            .unwrap();

        assert_eq!(config.embeddings.provider, EmbeddingBackend::HuggingFace);
        assert_eq!(config.llm.provider, LlmBackend::Anthropic);
        assert_eq!(config.llm.model, "claude-3-haiku-20240307");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.files.upload_directory, PathBuf::from("/tmp/uploads"));
        assert!(config.debug);
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = RagConfig::default();
        let err = config.apply_env(env(&[("LLM_PROVIDER", "palm")]));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_bad_number_rejected() {
        let mut config = RagConfig::default();
        let err = config.apply_env(env(&[("CHUNK_SIZE", "lots")]));
        assert!(matches!(err, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_overlap() {
        let mut config = RagConfig::default();
        config.chunking.chunk_overlap = 1000;
        assert!(config.validate().is_err());

        config.chunking.chunk_size = 0;
        config.chunking.chunk_overlap = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_k() {
        let mut config = RagConfig::default();
        config.vector_store.retriever_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial() {
        let config = RagConfig::from_toml_str(
            r#"
            app_name = "Handbook QA"

            [chunking]
            chunk_size = 800

            [vector_store]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.app_name, "Handbook QA");
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.vector_store.backend, VectorStoreBackend::Memory);
        assert_eq!(config.vector_store.retriever_k, 4);
    }

    #[test]
    fn test_api_keys_masked_in_debug() {
        let keys = ApiKeys {
            openai: Some("sk-secret".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains("sk-secret"));
    }
}
