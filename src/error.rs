//! Error taxonomy for outfield.
//!
//! Unit-level write failures are wrapped separately in
//! [`crate::core::dispatch::UnitError`], which carries the full
//! (repository, scope, name) context of the failing unit.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    GitHub(#[from] GithubError),

    /// The run completed but one or more units failed.
    #[error("failed with {0} error(s)")]
    RunFailed(usize),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration loading and validation errors.
///
/// All of these are detected before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("github.owner is required")]
    MissingOwner,

    #[error("github.token is required (set it in the config file or via the GH_TOKEN_WITH_ACTIONS_WRITE environment variable)")]
    MissingToken,

    #[error("at least one repository must be specified in github.repos")]
    NoRepositories,

    #[error("repository name cannot be empty")]
    EmptyRepositoryName,

    #[error("at least one of repository_secrets, environment_secrets, repository_variables, or environment_variables must be specified")]
    NoValueSections,

    #[error("empty environment name in [{section}]")]
    EmptyEnvironmentName { section: String },

    #[error("empty key in [{section}]")]
    EmptyName { section: String },

    #[error("empty value for '{name}' in [{section}]")]
    EmptyValue { section: String, name: String },
}

/// Sealed-box encryption errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid recipient public key: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid recipient public key: {0}")]
    InvalidKey(String),

    #[error("random source failure: {0}")]
    Rng(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}

/// GitHub API errors.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("repository {owner}/{repo} not found or access denied")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("environment '{environment}' not found in repository {owner}/{repo}. Create the environment first in the repository settings")]
    EnvironmentNotFound {
        owner: String,
        repo: String,
        environment: String,
    },

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}
