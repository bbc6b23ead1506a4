//! Storage backends for the code-execution session engine.
//!
//! This crate owns the persisted entity shapes (skills, artifacts, declared
//! dependencies) and the two backends that read and write them:
//!
//! - [`store::FileStorage`] — one file per entity under a base directory.
//! - [`store::KvStorage`] — a Redis-backed store, keyed by `<prefix>:<kind>:<name>`.
//!
//! Both implement the [`store::Storage`] trait and emit a [`entities::StorageAccess`]
//! descriptor via [`store::Storage::access`] sufficient for a fresh process to
//! reopen the same store — the cross-process bootstrap boundary consumed by
//! `skill-runtime::bootstrap`.
//!
//! Secret and credential handling ([`secrets`], [`providers`]) lives here too,
//! grounded in the teacher's platform-keychain-backed secret provider stack;
//! it backs credential material referenced by tool adapters (e.g. an HTTP
//! tool's bearer token, a KV backend's connection password) without agent
//! code ever seeing the raw secret.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod entities;
pub mod providers;
pub mod secrets;
pub mod store;

pub use entities::{Artifact, ArtifactSummary, Dep, Skill, SkillParameter, SkillSummary, StorageAccess};
pub use secrets::{
    ExternalSecretProvider, SecretDefinition, SecretFileFormat, SecretInjectionTarget,
    SecretProviderConfig, SecretsConfig,
};
pub use providers::{
    EnvironmentProvider, FileProvider, KeychainProvider, SecretManager, SecretProvider,
    SecretValue,
};
pub use store::{FileStorage, KvStorage, Storage};

/// Error types for the skill-context crate.
pub mod error {
    use thiserror::Error;

    /// Errors raised by the storage backends and the secret providers.
    ///
    /// `NotFound`, `Conflict`, `Corrupt`, and `StorageUnavailable` are the
    /// storage-facing variants named in spec §4.A/§7; the remaining variants
    /// are carried over from the credential-provider stack.
    #[derive(Debug, Error)]
    pub enum ContextError {
        /// Requested entity does not exist in the store.
        #[error("not found: {0}")]
        NotFound(String),

        /// Entity already exists where uniqueness is required.
        #[error("already exists: {0}")]
        AlreadyExists(String),

        /// Invalid configuration (e.g. malformed connection URL).
        #[error("invalid configuration: {0}")]
        InvalidConfig(String),

        /// Invariant violation on write (e.g. empty name).
        #[error("conflict: {0}")]
        Conflict(String),

        /// A persisted entity exists but failed to parse or decode.
        #[error("corrupt entry {name}: {reason}")]
        Corrupt {
            /// Name of the corrupt entity.
            name: String,
            /// Human-readable reason decoding failed.
            reason: String,
        },

        /// The backend's underlying endpoint (filesystem, Redis) is unreachable.
        #[error("storage unavailable: {0}")]
        StorageUnavailable(String),

        /// Secret not found.
        #[error("Secret not found: {0}")]
        SecretNotFound(String),

        /// Required secret not set.
        #[error("Required secret not set: {0}")]
        RequiredSecretNotSet(String),

        /// IO error.
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        /// Serialization error.
        #[error("Serialization error: {0}")]
        Serialization(String),

        /// Secret provider error.
        #[error("Secret provider error: {0}")]
        SecretProvider(String),

        /// Redis client/connection error.
        #[error("redis error: {0}")]
        Redis(#[from] redis::RedisError),
    }

    impl From<serde_json::Error> for ContextError {
        fn from(e: serde_json::Error) -> Self {
            Self::Serialization(e.to_string())
        }
    }

    impl From<toml::de::Error> for ContextError {
        fn from(e: toml::de::Error) -> Self {
            Self::Serialization(e.to_string())
        }
    }

    impl From<toml::ser::Error> for ContextError {
        fn from(e: toml::ser::Error) -> Self {
            Self::Serialization(e.to_string())
        }
    }
}

pub use error::ContextError;

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
