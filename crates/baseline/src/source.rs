//! Remote baseline sources
//!
//! The baseline is a JSON object of key → raw value, hosted by a remote
//! configuration service. Reads use a session-token protocol: a session
//! yields an initial token, each poll returns the next token, the poll
//! interval the remote asks for, and the content when it changed.
//! Writes upload a new hosted version and deploy it.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{BaselineError, BaselineMap};

/// Result of one poll
#[derive(Debug, Clone)]
pub struct LatestConfiguration {
    /// Token for the next poll
    pub next_token: String,
    /// Poll interval requested by the remote
    pub poll_interval: Duration,
    /// Raw content; `None` when unchanged since the previous token
    pub content: Option<Vec<u8>>,
}

/// Remote store holding the published baseline
#[async_trait]
pub trait BaselineSource: Send + Sync {
    /// Open a polling session and return the initial token
    async fn start_session(&self) -> Result<String, BaselineError>;

    /// Poll with a token
    async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, BaselineError>;

    /// Upload new content, returning its version number
    async fn create_version(
        &self,
        content: Vec<u8>,
        description: Option<&str>,
    ) -> Result<u64, BaselineError>;

    /// Deploy a version, returning the deployment number when the remote reports one
    async fn start_deployment(&self, version: u64) -> Result<Option<u64>, BaselineError>;
}

/// Parse baseline content into a key map
pub fn parse_content(content: &[u8]) -> Result<BaselineMap, BaselineError> {
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(BaselineMap::new());
    }
    match serde_json::from_slice::<serde_json::Value>(content)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(BaselineError::InvalidContent(format!(
            "expected a JSON object, got {}",
            match other {
                serde_json::Value::Array(_) => "an array",
                serde_json::Value::Null => "null",
                _ => "a scalar",
            }
        ))),
    }
}

/// HTTP source configuration
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    pub endpoint: String,
    pub application: String,
    pub environment: String,
    pub profile: String,
    pub deployment_strategy: String,
    pub min_poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:2772".to_string(),
            application: "config-engine".to_string(),
            environment: "development".to_string(),
            profile: "baseline".to_string(),
            deployment_strategy: "AllAtOnce".to_string(),
            min_poll_interval: Duration::from_secs(15),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartSessionRequest<'a> {
    application_identifier: &'a str,
    environment_identifier: &'a str,
    configuration_profile_identifier: &'a str,
    required_minimum_poll_interval_in_seconds: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartSessionResponse {
    initial_configuration_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartDeploymentRequest<'a> {
    configuration_profile_id: &'a str,
    configuration_version: String,
    deployment_strategy_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartDeploymentResponse {
    #[serde(default)]
    deployment_number: Option<u64>,
}

/// Error body returned by the remote on a rejected request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    details: Option<ApiErrorDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiErrorDetails {
    #[serde(default)]
    invalid_parameters: HashMap<String, InvalidParameter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvalidParameter {
    #[serde(default)]
    problem: Option<String>,
}

impl ApiErrorBody {
    /// The poll token was rejected as expired or corrupted
    fn token_rejected(&self) -> bool {
        self.reason.as_deref() == Some(INVALID_PARAMETERS_REASON)
            && self
                .details
                .as_ref()
                .and_then(|d| d.invalid_parameters.get(TOKEN_PARAMETER))
                .and_then(|p| p.problem.as_deref())
                .is_some_and(|problem| matches!(problem, "Expired" | "Corrupted"))
    }
}

/// Map a non-success response onto a typed error
fn classify_error(status: reqwest::StatusCode, body: &str) -> BaselineError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    if status == reqwest::StatusCode::BAD_REQUEST && parsed.token_rejected() {
        return BaselineError::SessionExpired;
    }
    BaselineError::Api {
        status: status.as_u16(),
        message: parsed.message.unwrap_or_else(|| body.to_string()),
    }
}

const NEXT_TOKEN_HEADER: &str = "next-poll-configuration-token";
const POLL_INTERVAL_HEADER: &str = "next-poll-interval-in-seconds";
const VERSION_HEADER: &str = "version-number";
const INVALID_PARAMETERS_REASON: &str = "InvalidParameters";
const TOKEN_PARAMETER: &str = "ConfigurationToken";

/// Baseline source speaking the hosted configuration REST protocol.
///
/// Request signing is expected to happen in a local agent or proxy in
/// front of `endpoint`.
#[derive(Clone)]
pub struct HttpBaselineSource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpBaselineSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, BaselineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BaselineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BaselineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status, &body))
    }

    fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
impl BaselineSource for HttpBaselineSource {
    async fn start_session(&self) -> Result<String, BaselineError> {
        let request = StartSessionRequest {
            application_identifier: &self.config.application,
            environment_identifier: &self.config.environment,
            configuration_profile_identifier: &self.config.profile,
            required_minimum_poll_interval_in_seconds: self.config.min_poll_interval.as_secs(),
        };

        let response = self
            .client
            .post(self.api_url("/configurationsessions"))
            .json(&request)
            .send()
            .await?;
        let session: StartSessionResponse = Self::check(response).await?.json().await?;

        tracing::debug!(application = %self.config.application, "Baseline session started");
        Ok(session.initial_configuration_token)
    }

    async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, BaselineError> {
        let response = self
            .client
            .get(self.api_url("/configuration"))
            .query(&[("configuration_token", token)])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let next_token = Self::header(&response, NEXT_TOKEN_HEADER)
            .ok_or_else(|| BaselineError::InvalidContent("missing next poll token".to_string()))?
            .to_string();
        let poll_interval = Self::header(&response, POLL_INTERVAL_HEADER)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.config.min_poll_interval);

        let body = response.bytes().await?;
        Ok(LatestConfiguration {
            next_token,
            poll_interval,
            content: (!body.is_empty()).then(|| body.to_vec()),
        })
    }

    async fn create_version(
        &self,
        content: Vec<u8>,
        description: Option<&str>,
    ) -> Result<u64, BaselineError> {
        let mut request = self
            .client
            .post(self.api_url(&format!(
                "/applications/{}/configurationprofiles/{}/hostedconfigurationversions",
                self.config.application, self.config.profile
            )))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(content);
        if let Some(description) = description {
            request = request.header("Description", description);
        }

        let response = Self::check(request.send().await?).await?;
        Self::header(&response, VERSION_HEADER)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| BaselineError::InvalidContent("missing version number".to_string()))
    }

    async fn start_deployment(&self, version: u64) -> Result<Option<u64>, BaselineError> {
        let request = StartDeploymentRequest {
            configuration_profile_id: &self.config.profile,
            configuration_version: version.to_string(),
            deployment_strategy_id: &self.config.deployment_strategy,
        };

        let response = self
            .client
            .post(self.api_url(&format!(
                "/applications/{}/environments/{}/deployments",
                self.config.application, self.config.environment
            )))
            .json(&request)
            .send()
            .await?;
        let deployment: StartDeploymentResponse = Self::check(response).await?.json().await?;
        Ok(deployment.deployment_number)
    }
}

#[derive(Default)]
struct InMemoryState {
    versions: Vec<Vec<u8>>,
    deployed: Option<usize>,
    failing: bool,
    /// Tokens issued before the current epoch are rejected
    session_epoch: usize,
}

/// In-process baseline source for development and tests.
///
/// Counts every call so tests can assert that no write happened.
pub struct InMemoryBaselineSource {
    state: RwLock<InMemoryState>,
    poll_interval: Duration,
    sessions: AtomicUsize,
    polls: AtomicUsize,
    writes: AtomicUsize,
}

impl Default for InMemoryBaselineSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBaselineSource {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(InMemoryState::default()),
            poll_interval: Duration::ZERO,
            sessions: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Start with `values` already deployed as version 1
    pub fn with_values(values: HashMap<String, serde_json::Value>) -> Self {
        let source = Self::new();
        {
            let mut state = source.state.write();
            state
                .versions
                .push(serde_json::to_vec(&values).unwrap_or_default());
            state.deployed = Some(0);
        }
        source
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Expire every token issued so far; the next poll with one fails with
    /// `SessionExpired`
    pub fn expire_sessions(&self) {
        self.state.write().session_epoch += 1;
    }

    /// Make every read fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.state.write().failing = failing;
    }

    pub fn session_count(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::Relaxed)
    }

    /// Number of create_version and start_deployment calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Currently deployed content
    pub fn deployed_values(&self) -> BaselineMap {
        let state = self.state.read();
        state
            .deployed
            .and_then(|i| state.versions.get(i))
            .and_then(|content| parse_content(content).ok())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BaselineSource for InMemoryBaselineSource {
    async fn start_session(&self) -> Result<String, BaselineError> {
        if self.state.read().failing {
            return Err(BaselineError::Network("in-memory source failing".to_string()));
        }
        let epoch = self.state.read().session_epoch;
        let n = self.sessions.fetch_add(1, Ordering::Relaxed);
        Ok(format!("e{}:session-{}", epoch, n))
    }

    async fn get_latest(&self, token: &str) -> Result<LatestConfiguration, BaselineError> {
        let state = self.state.read();
        if state.failing {
            return Err(BaselineError::Network("in-memory source failing".to_string()));
        }
        let current = format!("e{}", state.session_epoch);
        if token.split(':').next() != Some(current.as_str()) {
            return Err(BaselineError::SessionExpired);
        }
        let n = self.polls.fetch_add(1, Ordering::Relaxed);
        Ok(LatestConfiguration {
            next_token: format!("{}-{}", token, n),
            poll_interval: self.poll_interval,
            content: state.deployed.and_then(|i| state.versions.get(i).cloned()),
        })
    }

    async fn create_version(
        &self,
        content: Vec<u8>,
        _description: Option<&str>,
    ) -> Result<u64, BaselineError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write();
        state.versions.push(content);
        Ok(state.versions.len() as u64)
    }

    async fn start_deployment(&self, version: u64) -> Result<Option<u64>, BaselineError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.write();
        let index = version
            .checked_sub(1)
            .map(|v| v as usize)
            .filter(|&i| i < state.versions.len())
            .ok_or(BaselineError::Api {
                status: 404,
                message: format!("unknown version {}", version),
            })?;
        state.deployed = Some(index);
        Ok(Some(version))
    }
}
