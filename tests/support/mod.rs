//! Test support utilities for outfield integration tests.
//!
//! Provides an in-memory GitHub API fake and configuration builders.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;

use outfield::core::config::{Config, GitHubConfig};
use outfield::error::GithubError;
use outfield::github::{Client, PublicKey, SecretMetadata, Variable};

pub const REPO_KEY_ID: &str = "test-key-id";
pub const ENV_KEY_ID: &str = "test-env-key-id";

/// Raw repository public key served by the mock (any 32 bytes form a valid
/// X25519 public key).
pub const REPO_KEY: [u8; 32] = [7u8; 32];

/// Raw environment public key, distinct from the repository key.
pub const ENV_KEY: [u8; 32] = [9u8; 32];

/// In-memory implementation of the GitHub API surface.
///
/// Stores written secrets and variables, serves deterministic public keys,
/// and supports injected per-unit write failures plus call counters so tests
/// can assert on remote traffic.
#[derive(Default)]
pub struct MockClient {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    secrets: HashMap<String, SecretMetadata>,
    written_secrets: HashMap<String, (String, String)>,
    variables: HashMap<String, Variable>,
    fail_writes: HashSet<String>,
    not_found_repos: HashSet<String>,
    key_fetches: usize,
    secret_writes: usize,
    variable_writes: usize,
    probes: usize,
}

fn unit_key(owner: &str, repo: &str, environment: Option<&str>, name: &str) -> String {
    match environment {
        Some(environment) => format!("{owner}/{repo}/{environment}/{name}"),
        None => format!("{owner}/{repo}/{name}"),
    }
}

fn metadata(name: &str) -> SecretMetadata {
    SecretMetadata {
        name: name.to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed metadata for an existing secret (dry-run probes will see it).
    pub fn with_secret_metadata(
        self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
        name: &str,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(unit_key(owner, repo, environment, name), metadata(name));
        self
    }

    /// Seed an existing variable with its current value.
    pub fn with_variable(
        self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
        name: &str,
        value: &str,
    ) -> Self {
        self.state.lock().unwrap().variables.insert(
            unit_key(owner, repo, environment, name),
            Variable {
                name: name.to_string(),
                value: value.to_string(),
            },
        );
        self
    }

    /// Make writes to the given unit fail with a 500.
    pub fn fail_write(
        self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
        name: &str,
    ) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_writes
            .insert(unit_key(owner, repo, environment, name));
        self
    }

    /// Make the repository's key fetches fail with a typed not-found.
    pub fn not_found(self, owner: &str, repo: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .not_found_repos
            .insert(format!("{owner}/{repo}"));
        self
    }

    pub fn key_fetches(&self) -> usize {
        self.state.lock().unwrap().key_fetches
    }

    pub fn secret_writes(&self) -> usize {
        self.state.lock().unwrap().secret_writes
    }

    pub fn variable_writes(&self) -> usize {
        self.state.lock().unwrap().variable_writes
    }

    pub fn probes(&self) -> usize {
        self.state.lock().unwrap().probes
    }

    /// The (encrypted_value, key_id) pair most recently written for a unit.
    pub fn written_secret(
        &self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
        name: &str,
    ) -> Option<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .written_secrets
            .get(&unit_key(owner, repo, environment, name))
            .cloned()
    }

    pub fn variable_value(
        &self,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
        name: &str,
    ) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .variables
            .get(&unit_key(owner, repo, environment, name))
            .map(|variable| variable.value.clone())
    }

    fn injected_write_failure(state: &State, key: &str) -> Option<GithubError> {
        state.fail_writes.contains(key).then(|| GithubError::Api {
            status: 500,
            message: "injected failure".to_string(),
        })
    }
}

#[async_trait]
impl Client for MockClient {
    async fn get_public_key(&self, owner: &str, repo: &str) -> Result<PublicKey, GithubError> {
        let mut state = self.state.lock().unwrap();
        if state.not_found_repos.contains(&format!("{owner}/{repo}")) {
            return Err(GithubError::RepositoryNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            });
        }
        state.key_fetches += 1;
        Ok(PublicKey {
            key_id: REPO_KEY_ID.to_string(),
            key: BASE64.encode(REPO_KEY),
        })
    }

    async fn get_environment_public_key(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<PublicKey, GithubError> {
        let mut state = self.state.lock().unwrap();
        if state.not_found_repos.contains(&format!("{owner}/{repo}")) {
            return Err(GithubError::EnvironmentNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                environment: environment.to_string(),
            });
        }
        state.key_fetches += 1;
        Ok(PublicKey {
            key_id: ENV_KEY_ID.to_string(),
            key: BASE64.encode(ENV_KEY),
        })
    }

    async fn get_repository_id(&self, _owner: &str, _repo: &str) -> Result<i64, GithubError> {
        Ok(12345)
    }

    async fn create_or_update_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let key = unit_key(owner, repo, None, name);
        if let Some(error) = Self::injected_write_failure(&state, &key) {
            return Err(error);
        }
        state.secret_writes += 1;
        state
            .written_secrets
            .insert(key.clone(), (encrypted_value.to_string(), key_id.to_string()));
        state.secrets.insert(key, metadata(name));
        Ok(())
    }

    async fn create_or_update_environment_secret(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let key = unit_key(owner, repo, Some(environment), name);
        if let Some(error) = Self::injected_write_failure(&state, &key) {
            return Err(error);
        }
        state.secret_writes += 1;
        state
            .written_secrets
            .insert(key.clone(), (encrypted_value.to_string(), key_id.to_string()));
        state.secrets.insert(key, metadata(name));
        Ok(())
    }

    async fn set_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let key = unit_key(owner, repo, None, name);
        if let Some(error) = Self::injected_write_failure(&state, &key) {
            return Err(error);
        }
        state.variable_writes += 1;
        state.variables.insert(
            key,
            Variable {
                name: name.to_string(),
                value: value.to_string(),
            },
        );
        Ok(())
    }

    async fn set_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
        value: &str,
    ) -> Result<(), GithubError> {
        let mut state = self.state.lock().unwrap();
        let key = unit_key(owner, repo, Some(environment), name);
        if let Some(error) = Self::injected_write_failure(&state, &key) {
            return Err(error);
        }
        state.variable_writes += 1;
        state.variables.insert(
            key,
            Variable {
                name: name.to_string(),
                value: value.to_string(),
            },
        );
        Ok(())
    }

    async fn get_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError> {
        let mut state = self.state.lock().unwrap();
        state.probes += 1;
        state
            .secrets
            .get(&unit_key(owner, repo, None, name))
            .cloned()
            .ok_or_else(|| GithubError::Api {
                status: 404,
                message: "secret not found".to_string(),
            })
    }

    async fn get_environment_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError> {
        let mut state = self.state.lock().unwrap();
        state.probes += 1;
        state
            .secrets
            .get(&unit_key(owner, repo, Some(environment), name))
            .cloned()
            .ok_or_else(|| GithubError::Api {
                status: 404,
                message: "environment secret not found".to_string(),
            })
    }

    async fn get_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<Variable, GithubError> {
        let mut state = self.state.lock().unwrap();
        state.probes += 1;
        state
            .variables
            .get(&unit_key(owner, repo, None, name))
            .cloned()
            .ok_or_else(|| GithubError::Api {
                status: 404,
                message: "variable not found".to_string(),
            })
    }

    async fn get_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<Variable, GithubError> {
        let mut state = self.state.lock().unwrap();
        state.probes += 1;
        state
            .variables
            .get(&unit_key(owner, repo, Some(environment), name))
            .cloned()
            .ok_or_else(|| GithubError::Api {
                status: 404,
                message: "environment variable not found".to_string(),
            })
    }
}

/// Minimal valid configuration with an empty value catalog.
pub fn config(owner: &str, repos: &[&str]) -> Config {
    Config {
        github: GitHubConfig {
            token: "test-token".to_string(),
            owner: owner.to_string(),
            repos: repos.iter().map(|repo| repo.to_string()).collect(),
        },
        repository_secrets: BTreeMap::new(),
        environment_secrets: BTreeMap::new(),
        repository_variables: BTreeMap::new(),
        environment_variables: BTreeMap::new(),
    }
}
