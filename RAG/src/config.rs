//! Typed configuration (spec.md §6, "Configuration").
//!
//! Loaded once at process start into a single `Config` and passed by
//! `Arc` from there on, per spec.md §9's "singleton services" note —
//! generalizing the teacher's scattered `env::var(...)` calls into one
//! object. Layering: `config/default.toml` (committed) is overridden by
//! `RAG__`-prefixed environment variables (double underscore = nesting),
//! which are themselves populated from a `.env` file via `dotenv` before
//! the `config` builder runs.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalTimerConfig {
    pub enabled: bool,
    pub timeout_seconds: f64,
}

impl Default for GlobalTimerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 29.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicChunkingConfig {
    pub page_threshold: usize,
    pub default_chunks_to_llm: usize,
    pub large_document_chunks_to_llm: usize,
}

impl Default for DynamicChunkingConfig {
    fn default() -> Self {
        Self {
            page_threshold: 50,
            default_chunks_to_llm: 8,
            large_document_chunks_to_llm: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWiseConfig {
    pub pages_per_chunk: usize,
}

impl Default for PageWiseConfig {
    fn default() -> Self {
        Self { pages_per_chunk: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterWiseConfig {
    pub enabled: bool,
    pub chunk_size: usize,
    pub overlap: usize,
    pub min_chunk_size_ratio: f64,
}

impl Default for CharacterWiseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: 1000,
            overlap: 150,
            min_chunk_size_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecursiveConfig {
    pub enabled: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RecursiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub page_wise: PageWiseConfig,
    pub character_wise: CharacterWiseConfig,
    pub recursive: RecursiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingBatchConfig {
    pub enabled: bool,
    pub batch_size: usize,
}

impl Default for EmbeddingBatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSearchConfig {
    pub use_hnsw: bool,
    pub hnsw_min_size: usize,
}

impl Default for VectorSearchConfig {
    fn default() -> Self {
        Self {
            use_hnsw: false,
            hnsw_min_size: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonServiceConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for PythonServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8100".to_string(),
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextExtractionConfig {
    /// "unpdf" (native) or "python-pymupdf" (sidecar).
    pub pdf_method: String,
    pub fallback_enabled: bool,
    pub python_service: PythonServiceConfig,
}

impl Default for TextExtractionConfig {
    fn default() -> Self {
        Self {
            pdf_method: "unpdf".to_string(),
            fallback_enabled: true,
            python_service: PythonServiceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptInjectionConfig {
    pub enabled: bool,
    pub strict_mode: bool,
    pub max_risk_score: u8,
    pub preserve_urls: bool,
    pub block_high_risk_requests: bool,
}

impl Default for PromptInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            max_risk_score: 25,
            preserve_urls: true,
            block_high_risk_requests: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub prompt_injection_protection: PromptInjectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    pub buffer_size: usize,
    pub flush_interval_ms: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64,
            flush_interval_ms: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
    pub max_download_bytes: u64,
    /// Bearer token required on every `/api/v1/*` route. `None` disables
    /// auth entirely (local development).
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
            max_download_bytes: 5000 * 1024 * 1024,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub global_timer: GlobalTimerConfig,
    pub chunks_to_llm: usize,
    pub dynamic_chunking: DynamicChunkingConfig,
    pub chunking: ChunkingConfig,
    pub embedding_batch: EmbeddingBatchConfig,
    pub embedding_timeout_ms: u64,
    pub question_embedding_timeout_ms: u64,
    pub vector_search: VectorSearchConfig,
    pub enable_llm_racing: bool,
    pub text_extraction: TextExtractionConfig,
    pub security: SecurityConfig,
    pub streaming: StreamingConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            global_timer: GlobalTimerConfig::default(),
            chunks_to_llm: 8,
            dynamic_chunking: DynamicChunkingConfig::default(),
            chunking: ChunkingConfig::default(),
            embedding_batch: EmbeddingBatchConfig::default(),
            embedding_timeout_ms: 15_000,
            question_embedding_timeout_ms: 8_000,
            vector_search: VectorSearchConfig::default(),
            enable_llm_racing: false,
            text_extraction: TextExtractionConfig::default(),
            security: SecurityConfig::default(),
            streaming: StreamingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config/default.toml` (if present), then overlays `RAG__`
    /// prefixed environment variables, falling back to built-in defaults
    /// for anything neither source sets.
    pub fn load() -> anyhow::Result<Arc<Config>> {
        dotenv::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(
                config::Config::try_from(&Config::default())
                    .expect("default config always serializes"),
            )
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(
                config::Environment::with_prefix("RAG")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg: Config = builder
            .build()
            .context("failed to build configuration from default.toml and environment")?
            .try_deserialize()
            .context("failed to deserialize configuration into Config")?;
        Ok(Arc::new(cfg))
    }
}
