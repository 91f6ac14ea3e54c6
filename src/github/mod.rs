//! GitHub API surface for Actions secrets and variables.
//!
//! The dispatcher consumes the [`Client`] capability trait; tests supply an
//! in-memory fake and production wires in [`rest::RestClient`].

pub mod rest;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::GithubError;

/// A repository's or environment's public key for secret encryption.
///
/// `key` is the base64-encoded 32-byte X25519 public key; `key_id` must be
/// submitted alongside any value encrypted under it.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicKey {
    pub key_id: String,
    pub key: String,
}

/// Metadata about a stored secret. The value itself is never readable.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored variable. Unlike secrets, the current value is readable.
#[derive(Debug, Clone, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
}

/// GitHub API operations needed to propagate secrets and variables.
///
/// Environment-scoped secrets belong to a (repository, environment) pair and
/// are encrypted under that environment's own key, distinct from the
/// repository key.
#[async_trait]
pub trait Client: Send + Sync {
    /// Fetch the repository public key used to encrypt repository secrets.
    async fn get_public_key(&self, owner: &str, repo: &str) -> Result<PublicKey, GithubError>;

    /// Fetch the public key for one of the repository's environments.
    async fn get_environment_public_key(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<PublicKey, GithubError>;

    /// Resolve the numeric repository id required by environment-scoped calls.
    async fn get_repository_id(&self, owner: &str, repo: &str) -> Result<i64, GithubError>;

    /// Create or update a repository secret. `encrypted_value` is the
    /// base64-encoded sealed box, `key_id` identifies the key it was sealed
    /// under.
    async fn create_or_update_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), GithubError>;

    /// Create or update an environment secret.
    async fn create_or_update_environment_secret(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), GithubError>;

    /// Upsert a repository variable (plaintext).
    async fn set_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<(), GithubError>;

    /// Upsert an environment variable (plaintext).
    async fn set_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), GithubError>;

    /// Existence probe for a repository secret (dry-run previews).
    async fn get_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError>;

    /// Existence probe for an environment secret.
    async fn get_environment_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError>;

    /// Read a repository variable, including its current value.
    async fn get_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<Variable, GithubError>;

    /// Read an environment variable, including its current value.
    async fn get_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<Variable, GithubError>;
}
