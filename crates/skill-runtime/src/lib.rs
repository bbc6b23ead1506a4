//! Execution engine for code-execution sessions (spec §4): namespace
//! injection, the skill library, the dependency controller, and the three
//! pluggable executors (in-process, subprocess-kernel, container), built
//! on an embedded `mlua` interpreter as the agent-submitted-code substrate.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                   Session                      │
//! │   (facade: tools/skills/artifacts/deps + run)  │
//! └───────────────────────────────────────────────┘
//!                        │
//!           ┌────────────┼────────────┐
//!           ▼            ▼            ▼
//!   ┌───────────────┐┌──────────┐┌───────────────┐
//!   │  In-process    ││Subprocess││   Container   │
//!   │   executor     ││  kernel  ││   executor    │
//!   └───────────────┘└──────────┘└───────────────┘
//!           │            │            │
//!           └────────────┴────────────┘
//!                        │
//!              bootstrap_namespaces()
//!                        │
//!           ┌────────────┼────────────┐
//!           ▼            ▼            ▼
//!     ToolRegistry   SkillLibrary  DepsController
//!                        │
//!                 skill_context::Storage
//! ```
//!
//! # Feature flags
//!
//! - `hybrid-search`: BM25 + dense vector fusion (reciprocal rank fusion)
//!   for `tools.search`/`skills.search`.
//! - `reranker`: cross-encoder reranking of search results.
//! - `context-compression`: token-aware compression of search output.
//! - `qdrant`: a production vector-store backend for the search stack,
//!   alongside the always-available in-memory and file-backed stores.

#![warn(missing_docs)]

pub mod audit;
pub mod bootstrap;
pub mod cli_tool;
pub mod deps;
pub mod embeddings;
pub mod errors;
pub mod executor;
pub mod metrics;
pub mod namespace;
pub mod search;
pub mod search_config;
pub mod session;
pub mod skills;
pub mod tool_registry;
pub mod types;
pub mod vector_store;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use bootstrap::{bootstrap_namespaces, bootstrap_with_storage, BootstrapConfig};
pub use cli_tool::{CliToolDefinition, OptionSchema, OptionType, PositionalSchema, Recipe, RecipeParam, Schema};
pub use deps::{AddOutcome, DepsConfig, DepsController, DepsPolicy, Installer, InstallReport, ShellInstaller};
pub use errors::{ErrorKind, Result, RuntimeError};
pub use executor::{Capability, ContainerExecutor, ContainerLimits, Executor, InProcessExecutor, SubprocessExecutor};
pub use metrics::ExecutionMetrics;
pub use namespace::NamespaceDict;
pub use session::{Session, SessionConfig};
pub use skills::{SkillLibrary, SkillRecord, SkillSearchResult};
pub use tool_registry::{CliAdapter, HttpAdapter, RpcStdioAdapter, ToolAdapter, ToolRegistry};
pub use types::*;

pub use vector_store::{
    cosine_similarity, euclidean_distance, DeleteStats, DistanceMetric, DocumentMetadata, EmbeddedDocument,
    FileConfig, FileVectorStore, Filter, HealthStatus, InMemoryVectorStore, SearchResult, UpsertStats, VectorStore,
};

#[cfg(feature = "qdrant")]
pub use vector_store::{QdrantConfig, QdrantVectorStore};

pub use embeddings::{
    create_provider, EmbeddingConfig, EmbeddingProvider, EmbeddingProviderFactory, EmbeddingProviderType,
    FastEmbedModel, FastEmbedProvider, OllamaProvider, OpenAIEmbedProvider, OpenAIEmbeddingModel,
};

pub use search::{FusionMethod, reciprocal_rank_fusion, weighted_sum_fusion};

#[cfg(feature = "hybrid-search")]
pub use search::{BM25Config, BM25Index, BM25SearchResult, HybridConfig, HybridRetriever, HybridSearchResult};

#[cfg(feature = "reranker")]
pub use search::{FastEmbedReranker, RerankDocument, RerankResult, Reranker, RerankerConfig, RerankerModel};

#[cfg(feature = "context-compression")]
pub use search::{
    CompressedToolContext, CompressionConfig, CompressionResult, CompressionStrategy, ContextCompressor,
    ToolParameter,
};

pub use search::{EntityType, ExtractedEntity, ProcessedQuery, QueryExpansion, QueryIntent, QueryProcessor};

pub use search::{IndexManager, IndexMetadata, IndexStats, SkillChecksum, SyncResult};

pub use search::{IndexDocument, PipelineHealth, PipelineIndexStats, PipelineSearchResult, ProviderStatus, SearchPipeline};

pub use search_config::{
    AiIngestionConfig, AiProvider, AnthropicLlmConfig, BackendConfig, BackendType,
    CompressionStrategy as SearchCompressionStrategy, ContextConfig, EmbeddingConfig as SearchEmbeddingConfig,
    FusionMethod as SearchFusionMethod, IndexConfig as SearchIndexConfig, OllamaLlmConfig, OpenAiLlmConfig,
    QdrantConfig as SearchQdrantConfig, RerankerConfig as SearchRerankerConfig, RetrievalConfig, SearchConfig,
};
