//! Configuration file management.
//!
//! Handles reading and validating `outfield.toml` configuration files.
//! Value sections use `BTreeMap` so environments and names are always
//! processed in lexicographic order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Environment variable consulted when the config file carries no token.
pub const TOKEN_ENV: &str = "GH_TOKEN_WITH_ACTIONS_WRITE";

/// Application configuration loaded from `outfield.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitHub connection settings and target repositories
    pub github: GitHubConfig,
    /// Repository-scoped secrets: name -> plaintext value
    #[serde(default)]
    pub repository_secrets: BTreeMap<String, String>,
    /// Environment-scoped secrets: environment -> (name -> plaintext value)
    #[serde(default)]
    pub environment_secrets: BTreeMap<String, BTreeMap<String, String>>,
    /// Repository-scoped variables: name -> value
    #[serde(default)]
    pub repository_variables: BTreeMap<String, String>,
    /// Environment-scoped variables: environment -> (name -> value)
    #[serde(default)]
    pub environment_variables: BTreeMap<String, BTreeMap<String, String>>,
}

/// GitHub-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API token with actions:write scope. Falls back to
    /// `GH_TOKEN_WITH_ACTIONS_WRITE` when empty.
    #[serde(default)]
    pub token: String,
    /// Owner or organization holding the target repositories
    #[serde(default)]
    pub owner: String,
    /// Target repository names
    #[serde(default)]
    pub repos: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// The token is filled from `GH_TOKEN_WITH_ACTIONS_WRITE` when the file
    /// leaves it empty. Validation is a separate step so CLI overrides can be
    /// applied first.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: Config = toml::from_str(&data).map_err(ConfigError::Parse)?;

        if config.github.token.is_empty() {
            if let Ok(token) = std::env::var(TOKEN_ENV) {
                config.github.token = token;
            }
        }

        Ok(config)
    }

    /// Apply CLI flag overrides. `None` or empty lists leave the loaded
    /// values untouched.
    pub fn apply_overrides(&mut self, token: Option<&str>, owner: Option<&str>, repos: Vec<String>) {
        if let Some(token) = token {
            self.github.token = token.to_string();
        }

        if let Some(owner) = owner {
            self.github.owner = owner.to_string();
        }

        if !repos.is_empty() {
            self.github.repos = repos;
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: owner, repositories and token must be
    /// present, at least one value section must be non-empty, and no name or
    /// value anywhere may be the empty string.
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.is_empty() {
            return Err(ConfigError::MissingOwner.into());
        }

        if self.github.repos.is_empty() {
            return Err(ConfigError::NoRepositories.into());
        }

        if self.github.token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }

        if self.github.repos.iter().any(|repo| repo.is_empty()) {
            return Err(ConfigError::EmptyRepositoryName.into());
        }

        if self.repository_secrets.is_empty()
            && self.environment_secrets.is_empty()
            && self.repository_variables.is_empty()
            && self.environment_variables.is_empty()
        {
            return Err(ConfigError::NoValueSections.into());
        }

        validate_section("repository_secrets", &self.repository_secrets)?;
        validate_environments("environment_secrets", &self.environment_secrets)?;
        validate_section("repository_variables", &self.repository_variables)?;
        validate_environments("environment_variables", &self.environment_variables)?;

        Ok(())
    }
}

fn validate_section(section: &str, values: &BTreeMap<String, String>) -> Result<()> {
    for (name, value) in values {
        if name.is_empty() {
            return Err(ConfigError::EmptyName {
                section: section.to_string(),
            }
            .into());
        }
        if value.is_empty() {
            return Err(ConfigError::EmptyValue {
                section: section.to_string(),
                name: name.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_environments(
    section: &str,
    environments: &BTreeMap<String, BTreeMap<String, String>>,
) -> Result<()> {
    for (environment, values) in environments {
        if environment.is_empty() {
            return Err(ConfigError::EmptyEnvironmentName {
                section: section.to_string(),
            }
            .into());
        }
        validate_section(&format!("{section}.{environment}"), values)?;
    }
    Ok(())
}
