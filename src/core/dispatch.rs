//! Concurrent batch dispatcher.
//!
//! One worker task per target repository, all spawned at run start. Each
//! worker walks the value catalog in a fixed order (repository secrets,
//! environment secrets, repository variables, environment variables;
//! environments and names lexicographic) and checks the shared cancellation
//! token before every unit of work. When a unit fails and the run is not
//! `continue_on_error`, the token is set and every worker stops at its next
//! checkpoint; in-flight remote calls are left to finish.
//!
//! Workers return their outcomes and errors; the collector that joins the
//! task set merges them into the final [`RunReport`]. No mutable state is
//! shared beyond the cancellation flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::core::config::Config;
use crate::core::sealed_box;
use crate::error::{CryptoError, Error, GithubError};
use crate::github::{Client, PublicKey, SecretMetadata, Variable};

const MASK: &str = "****";

/// Run-level switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Probe and preview instead of writing
    pub dry_run: bool,
    /// Keep going after a unit fails instead of cancelling the run
    pub continue_on_error: bool,
}

/// Where a value lives within a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Repository,
    Environment(String),
}

impl Scope {
    pub fn environment(&self) -> Option<&str> {
        match self {
            Scope::Repository => None,
            Scope::Environment(environment) => Some(environment),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Repository => write!(f, "repository"),
            Scope::Environment(environment) => write!(f, "environment '{environment}'"),
        }
    }
}

/// Whether a catalog entry is an encrypted secret or a plaintext variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Secret,
    Variable,
}

impl ValueKind {
    fn describe(&self, scope: &Scope) -> &'static str {
        match (self, scope) {
            (ValueKind::Secret, Scope::Repository) => "repository secret",
            (ValueKind::Secret, Scope::Environment(_)) => "environment secret",
            (ValueKind::Variable, Scope::Repository) => "repository variable",
            (ValueKind::Variable, Scope::Environment(_)) => "environment variable",
        }
    }
}

/// What happened to one processed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Value written
    Set,
    /// Dry run: no current value exists
    WouldCreate,
    /// Dry run: a current value would be replaced
    WouldUpdate,
}

/// A successful (or previewed) unit result.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub repo: String,
    pub scope: Scope,
    pub kind: ValueKind,
    pub name: String,
    pub action: Action,
}

/// A failed unit, carrying its full coordinates and the underlying cause.
#[derive(Debug)]
pub struct UnitError {
    pub kind: ValueKind,
    pub owner: String,
    pub repo: String,
    pub scope: Scope,
    pub name: String,
    pub source: Error,
}

impl fmt::Display for UnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.describe(&self.scope);
        match &self.scope {
            Scope::Environment(environment) => write!(
                f,
                "failed to set {kind} '{}' in environment '{environment}' for repository {}/{}: {}",
                self.name, self.owner, self.repo, self.source
            ),
            Scope::Repository => write!(
                f,
                "failed to set {kind} '{}' for repository {}/{}: {}",
                self.name, self.owner, self.repo, self.source
            ),
        }
    }
}

impl std::error::Error for UnitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Aggregated result of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<UnitOutcome>,
    pub errors: Vec<UnitError>,
}

impl RunReport {
    /// A run fails iff any unit failed, regardless of partial success.
    pub fn is_failure(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One-shot cooperative cancellation signal shared by all workers of a run.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Mask a secret value for logs and previews. Not a security control: short
/// values collapse to a fixed token, longer ones keep two characters at each
/// end.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return MASK.to_string();
    }

    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}{MASK}{tail}")
}

/// Apply the configured value catalog to every target repository.
///
/// Spawns one worker per repository and waits for all of them; results land
/// in arbitrary cross-target order.
pub async fn run(client: Arc<dyn Client>, config: Arc<Config>, options: RunOptions) -> RunReport {
    let cancel = CancellationToken::new();
    let mut workers = JoinSet::new();

    for repo in &config.github.repos {
        let worker = TargetWorker {
            client: Arc::clone(&client),
            config: Arc::clone(&config),
            repo: repo.clone(),
            options,
            cancel: cancel.clone(),
            outcomes: Vec::new(),
            errors: Vec::new(),
        };
        workers.spawn(worker.run());
    }

    let mut report = RunReport::default();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((mut outcomes, mut errors)) => {
                report.outcomes.append(&mut outcomes);
                report.errors.append(&mut errors);
            }
            Err(join_error) => error!(error = %join_error, "target worker aborted"),
        }
    }
    report
}

/// Per-repository worker. Fully independent of sibling workers; the only
/// shared state is the cancellation token.
struct TargetWorker {
    client: Arc<dyn Client>,
    config: Arc<Config>,
    repo: String,
    options: RunOptions,
    cancel: CancellationToken,
    outcomes: Vec<UnitOutcome>,
    errors: Vec<UnitError>,
}

impl TargetWorker {
    async fn run(mut self) -> (Vec<UnitOutcome>, Vec<UnitError>) {
        if !self.cancel.is_cancelled() {
            info!(repo = %self.repo, "processing repository");
            self.process().await;
        }
        (self.outcomes, self.errors)
    }

    async fn process(&mut self) {
        let config = Arc::clone(&self.config);

        for (name, value) in &config.repository_secrets {
            if self.cancelled() {
                return;
            }
            self.apply_secret(Scope::Repository, name, value).await;
        }

        for (environment, secrets) in &config.environment_secrets {
            for (name, value) in secrets {
                if self.cancelled() {
                    return;
                }
                self.apply_secret(Scope::Environment(environment.clone()), name, value)
                    .await;
            }
        }

        for (name, value) in &config.repository_variables {
            if self.cancelled() {
                return;
            }
            self.apply_variable(Scope::Repository, name, value).await;
        }

        for (environment, variables) in &config.environment_variables {
            for (name, value) in variables {
                if self.cancelled() {
                    return;
                }
                self.apply_variable(Scope::Environment(environment.clone()), name, value)
                    .await;
            }
        }
    }

    fn cancelled(&self) -> bool {
        if self.cancel.is_cancelled() {
            debug!(repo = %self.repo, "cancellation requested, skipping remaining units");
            return true;
        }
        false
    }

    fn owner(&self) -> &str {
        &self.config.github.owner
    }

    async fn apply_secret(&mut self, scope: Scope, name: &str, value: &str) {
        if self.options.dry_run {
            // Existence probe only: no key fetch, no encryption, no write.
            let action = match self.probe_secret(&scope, name).await {
                Ok(_) => Action::WouldUpdate,
                Err(_) => Action::WouldCreate,
            };
            match action {
                Action::WouldUpdate => {
                    info!(repo = %self.repo, scope = %scope, secret = name, value = %mask(value), "would update secret");
                }
                _ => {
                    info!(repo = %self.repo, scope = %scope, secret = name, value = %mask(value), "would create secret");
                }
            }
            self.record_outcome(scope, ValueKind::Secret, name, action);
            return;
        }

        match self.push_secret(&scope, name, value).await {
            Ok(()) => {
                info!(repo = %self.repo, scope = %scope, secret = name, "secret set");
                self.record_outcome(scope, ValueKind::Secret, name, Action::Set);
            }
            Err(source) => self.record_failure(ValueKind::Secret, scope, name, source),
        }
    }

    async fn apply_variable(&mut self, scope: Scope, name: &str, value: &str) {
        if self.options.dry_run {
            let action = match self.probe_variable(&scope, name).await {
                Ok(current) => {
                    info!(repo = %self.repo, scope = %scope, variable = name, current = %current.value, new = value, "would update variable");
                    Action::WouldUpdate
                }
                Err(_) => {
                    info!(repo = %self.repo, scope = %scope, variable = name, value, "would create variable");
                    Action::WouldCreate
                }
            };
            self.record_outcome(scope, ValueKind::Variable, name, action);
            return;
        }

        let result = match &scope {
            Scope::Repository => {
                self.client
                    .set_variable(self.owner(), &self.repo, name, value)
                    .await
            }
            Scope::Environment(environment) => {
                self.client
                    .set_environment_variable(self.owner(), &self.repo, environment, name, value)
                    .await
            }
        };

        match result {
            Ok(()) => {
                info!(repo = %self.repo, scope = %scope, variable = name, "variable set");
                self.record_outcome(scope, ValueKind::Variable, name, Action::Set);
            }
            Err(source) => self.record_failure(ValueKind::Variable, scope, name, source.into()),
        }
    }

    /// Fetch the scope's public key, seal the value under it and write the
    /// result. The key is fetched fresh for every unit: each environment has
    /// its own key, and keys may rotate between runs.
    async fn push_secret(&self, scope: &Scope, name: &str, value: &str) -> Result<(), Error> {
        let key = self.fetch_public_key(scope).await?;

        let raw_key = BASE64
            .decode(key.key.as_bytes())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let sealed = sealed_box::seal(value.as_bytes(), &raw_key)?;
        let encrypted = BASE64.encode(&sealed);

        match scope {
            Scope::Repository => {
                self.client
                    .create_or_update_secret(self.owner(), &self.repo, name, &encrypted, &key.key_id)
                    .await?
            }
            Scope::Environment(environment) => {
                self.client
                    .create_or_update_environment_secret(
                        self.owner(),
                        &self.repo,
                        environment,
                        name,
                        &encrypted,
                        &key.key_id,
                    )
                    .await?
            }
        }
        Ok(())
    }

    async fn fetch_public_key(&self, scope: &Scope) -> Result<PublicKey, GithubError> {
        match scope {
            Scope::Repository => self.client.get_public_key(self.owner(), &self.repo).await,
            Scope::Environment(environment) => {
                self.client
                    .get_environment_public_key(self.owner(), &self.repo, environment)
                    .await
            }
        }
    }

    async fn probe_secret(&self, scope: &Scope, name: &str) -> Result<SecretMetadata, GithubError> {
        match scope {
            Scope::Repository => {
                self.client
                    .get_secret_metadata(self.owner(), &self.repo, name)
                    .await
            }
            Scope::Environment(environment) => {
                self.client
                    .get_environment_secret_metadata(self.owner(), &self.repo, environment, name)
                    .await
            }
        }
    }

    async fn probe_variable(&self, scope: &Scope, name: &str) -> Result<Variable, GithubError> {
        match scope {
            Scope::Repository => self.client.get_variable(self.owner(), &self.repo, name).await,
            Scope::Environment(environment) => {
                self.client
                    .get_environment_variable(self.owner(), &self.repo, environment, name)
                    .await
            }
        }
    }

    fn record_outcome(&mut self, scope: Scope, kind: ValueKind, name: &str, action: Action) {
        self.outcomes.push(UnitOutcome {
            repo: self.repo.clone(),
            scope,
            kind,
            name: name.to_string(),
            action,
        });
    }

    fn record_failure(&mut self, kind: ValueKind, scope: Scope, name: &str, source: Error) {
        let unit = UnitError {
            kind,
            owner: self.owner().to_string(),
            repo: self.repo.clone(),
            scope,
            name: name.to_string(),
            source,
        };
        error!(repo = %self.repo, error = %unit, "unit failed");
        self.errors.push(unit);

        if !self.options.continue_on_error {
            self.cancel.cancel();
        }
    }
}
