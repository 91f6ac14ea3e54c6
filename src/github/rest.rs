//! reqwest-backed implementation of the GitHub API client.
//!
//! Environment-scoped endpoints are addressed by numeric repository id, so
//! those methods resolve the id first. Variable upserts follow GitHub's
//! update-then-create pattern: the API offers no existence check for
//! variables, so a failed `PATCH` falls back to a `POST`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{Client, PublicKey, SecretMetadata, Variable};
use crate::error::GithubError;

const GITHUB_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("outfield/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Repository {
    id: i64,
}

/// GitHub REST API client.
pub struct RestClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl RestClient {
    /// Create a client against `api.github.com`.
    pub fn new(token: &str) -> Result<Self, GithubError> {
        Self::with_base_url(token, GITHUB_API_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response into the error taxonomy: 404 becomes a
    /// typed not-found carrying the offending coordinates, anything else an
    /// `Api` error with the response body as detail.
    async fn ensure_success(
        response: Response,
        owner: &str,
        repo: &str,
        environment: Option<&str>,
    ) -> Result<Response, GithubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(match environment {
                Some(environment) => GithubError::EnvironmentNotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    environment: environment.to_string(),
                },
                None => GithubError::RepositoryNotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                },
            });
        }

        let message = response.text().await.unwrap_or_default();
        Err(GithubError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Client for RestClient {
    async fn get_public_key(&self, owner: &str, repo: &str) -> Result<PublicKey, GithubError> {
        let response = self
            .http
            .get(self.url(&format!("/repos/{owner}/{repo}/actions/secrets/public-key")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, None).await?;
        Ok(response.json().await?)
    }

    async fn get_environment_public_key(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
    ) -> Result<PublicKey, GithubError> {
        let repo_id = self.get_repository_id(owner, repo).await?;
        let response = self
            .http
            .get(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/secrets/public-key"
            )))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, Some(environment)).await?;
        Ok(response.json().await?)
    }

    async fn get_repository_id(&self, owner: &str, repo: &str) -> Result<i64, GithubError> {
        let response = self
            .http
            .get(self.url(&format!("/repos/{owner}/{repo}")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, None).await?;
        let repository: Repository = response.json().await?;
        Ok(repository.id)
    }

    async fn create_or_update_secret(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<(), GithubError> {
        let response = self
            .http
            .put(self.url(&format!("/repos/{owner}/{repo}/actions/secrets/{name}")))
            .bearer_auth(&self.token)
            .json(&json!({ "encrypted_value": encrypted_value, "key_id": key_id }))
            .send()
            .await?;

        Self::ensure_success(response, owner, repo, None).await?;
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
        let repo_id = self.get_repository_id(owner, repo).await?;
        let response = self
            .http
            .put(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/secrets/{name}"
            )))
            .bearer_auth(&self.token)
            .json(&json!({ "encrypted_value": encrypted_value, "key_id": key_id }))
            .send()
            .await?;

        Self::ensure_success(response, owner, repo, Some(environment)).await?;
        Ok(())
    }

    async fn set_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
        value: &str,
    ) -> Result<(), GithubError> {
        let body = json!({ "name": name, "value": value });

        let response = self
            .http
            .patch(self.url(&format!("/repos/{owner}/{repo}/actions/variables/{name}")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        debug!(repo, variable = name, status = %response.status(), "variable update failed, attempting create");

        let response = self
            .http
            .post(self.url(&format!("/repos/{owner}/{repo}/actions/variables")))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::ensure_success(response, owner, repo, None).await?;
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
        let repo_id = self.get_repository_id(owner, repo).await?;
        let body = json!({ "name": name, "value": value });

        let response = self
            .http
            .patch(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/variables/{name}"
            )))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        debug!(repo, environment, variable = name, status = %response.status(), "variable update failed, attempting create");

        let response = self
            .http
            .post(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/variables"
            )))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        Self::ensure_success(response, owner, repo, Some(environment)).await?;
        Ok(())
    }

    async fn get_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError> {
        let response = self
            .http
            .get(self.url(&format!("/repos/{owner}/{repo}/actions/secrets/{name}")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, None).await?;
        Ok(response.json().await?)
    }

    async fn get_environment_secret_metadata(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<SecretMetadata, GithubError> {
        let repo_id = self.get_repository_id(owner, repo).await?;
        let response = self
            .http
            .get(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/secrets/{name}"
            )))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, Some(environment)).await?;
        Ok(response.json().await?)
    }

    async fn get_variable(
        &self,
        owner: &str,
        repo: &str,
        name: &str,
    ) -> Result<Variable, GithubError> {
        let response = self
            .http
            .get(self.url(&format!("/repos/{owner}/{repo}/actions/variables/{name}")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, None).await?;
        Ok(response.json().await?)
    }

    async fn get_environment_variable(
        &self,
        owner: &str,
        repo: &str,
        environment: &str,
        name: &str,
    ) -> Result<Variable, GithubError> {
        let repo_id = self.get_repository_id(owner, repo).await?;
        let response = self
            .http
            .get(self.url(&format!(
                "/repositories/{repo_id}/environments/{environment}/variables/{name}"
            )))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response, owner, repo, Some(environment)).await?;
        Ok(response.json().await?)
    }
}
