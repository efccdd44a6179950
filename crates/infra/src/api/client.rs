//! Remember The Milk API client
//!
//! [`RtmClient`] exposes the task operations. Every call is signed, paced
//! through one rate limiter per client and executed by the
//! [`RequestExecutor`]. Mutations are POSTs carrying a timeline handle from
//! the [`TimelineCache`]; listing and authorization calls are GETs.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Method;
use rtm_common::resilience::MinIntervalLimiter;
use rtm_common::time::{SharedClock, SystemClock};
use rtm_domain::constants::{
    methods, AUTH_URL, FORMAT_JSON, INVALID_TIMELINE_CODE, MAX_RETRIES, MIN_REQUEST_INTERVAL,
    REQUEST_TIMEOUT, REST_URL, TIMELINE_TIMEOUT,
};
use rtm_domain::{Credentials, Priority, Response, Result, RtmError, TaskFilter, TaskList, TaskRef};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::auth::{AuthFlow, AuthorizationPrompt};
use super::executor::RequestExecutor;
use super::signature::{params, Params, Signer};
use super::timeline::{TimelineCache, TimelineCacheConfig};
use crate::http::HttpClient;
use crate::token_file::TokenFile;

/// Configuration for [`RtmClient`]
#[derive(Debug, Clone)]
pub struct RtmClientConfig {
    /// REST endpoint
    pub rest_url: String,
    /// Browser authorization endpoint
    pub auth_url: String,
    /// Deadline for one attempt of a regular call
    pub request_timeout: Duration,
    /// Deadline for one attempt of timeline creation
    pub timeline_timeout: Duration,
    /// Minimum spacing between request starts
    pub min_request_interval: Duration,
    /// Retries after a 503, on top of the first attempt
    pub max_retries: u32,
    /// Timeline TTL and creation retry budget
    pub timeline: TimelineCacheConfig,
    pub user_agent: String,
}

impl Default for RtmClientConfig {
    fn default() -> Self {
        Self {
            rest_url: REST_URL.to_string(),
            auth_url: AUTH_URL.to_string(),
            request_timeout: REQUEST_TIMEOUT,
            timeline_timeout: TIMELINE_TIMEOUT,
            min_request_interval: MIN_REQUEST_INTERVAL,
            max_retries: MAX_RETRIES,
            timeline: TimelineCacheConfig::default(),
            user_agent: concat!("rtm-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionToken {
    token: Option<String>,
    discarded: bool,
}

/// API client for one credential set
pub struct RtmClient {
    config: RtmClientConfig,
    credentials: Credentials,
    signer: Signer,
    rest_url: Url,
    auth_url: Url,
    executor: RequestExecutor,
    timelines: TimelineCache,
    token_file: Option<TokenFile>,
    session: RwLock<SessionToken>,
}

impl RtmClient {
    /// Create a client backed by the system clock.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::Config` if the credentials are incomplete, an
    /// endpoint is not a valid URL, or the HTTP client cannot be built.
    pub fn new(config: RtmClientConfig, credentials: Credentials) -> Result<Self> {
        Self::with_clock(config, credentials, SystemClock::shared())
    }

    /// Create a client with a custom clock (for testing).
    pub fn with_clock(
        config: RtmClientConfig,
        credentials: Credentials,
        clock: SharedClock,
    ) -> Result<Self> {
        credentials.validate()?;

        let rest_url = parse_endpoint("REST", &config.rest_url)?;
        let auth_url = parse_endpoint("authorization", &config.auth_url)?;

        let http = HttpClient::builder().user_agent(config.user_agent.clone()).build()?;
        let limiter =
            Arc::new(MinIntervalLimiter::with_clock(config.min_request_interval, clock.clone()));
        let executor = RequestExecutor::new(
            http,
            limiter,
            clock.clone(),
            config.request_timeout,
            config.max_retries,
        );
        let timelines = TimelineCache::new(config.timeline.clone(), clock);

        let signer = Signer::new(&credentials.api_key, &credentials.api_secret_key);
        let token_file = credentials.token_path.as_ref().map(TokenFile::new);

        Ok(Self {
            config,
            credentials,
            signer,
            rest_url,
            auth_url,
            executor,
            timelines,
            token_file,
            session: RwLock::new(SessionToken::default()),
        })
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> RtmClientBuilder {
        RtmClientBuilder::default()
    }

    pub fn config(&self) -> &RtmClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token_file(&self) -> Option<&TokenFile> {
        self.token_file.as_ref()
    }

    /// Current auth token.
    ///
    /// Looks at the explicit token, then the token obtained by
    /// [`authenticate`](Self::authenticate), then the token file. After
    /// [`discard_token`](Self::discard_token) only a new handshake yields a
    /// token.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::Config` if no source has a token, or
    /// `RtmError::Io` if the token file cannot be read.
    pub fn auth_token(&self) -> Result<String> {
        let session = self.session.read();
        if let Some(token) = &session.token {
            return Ok(token.clone());
        }
        if !session.discarded {
            if let Some(token) = self.credentials.explicit_token() {
                return Ok(token.to_string());
            }
            if let Some(token) = self.token_file.as_ref().map(TokenFile::read).transpose()?.flatten()
            {
                return Ok(token);
            }
        }
        Err(RtmError::Config("no auth token available; authenticate first".into()))
    }

    /// Whether any token source currently yields a token.
    pub fn has_token(&self) -> bool {
        self.auth_token().is_ok()
    }

    /// Forget the current token so the next [`authenticate`](Self::authenticate)
    /// runs the handshake again. The token file is left untouched.
    pub async fn discard_token(&self) {
        {
            let mut session = self.session.write();
            session.token = None;
            session.discarded = true;
        }
        self.timelines.clear().await;
        info!("Auth token discarded");
    }

    /// Run the frob/token handshake unless a token is already available.
    ///
    /// A new token is kept for this client and written to the token file
    /// when one is configured.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, prompt: &dyn AuthorizationPrompt) -> Result<String> {
        if let Ok(token) = self.auth_token() {
            debug!("Token already available; skipping handshake");
            return Ok(token);
        }

        let token = AuthFlow::new(&self.executor, &self.signer, &self.rest_url, &self.auth_url)
            .run(prompt)
            .await?;

        {
            let mut session = self.session.write();
            session.token = Some(token.clone());
            session.discarded = false;
        }

        if let Some(file) = &self.token_file {
            file.write(&token)?;
            info!(path = %file.path().display(), "Token saved");
        }
        Ok(token)
    }

    /// Timeline handle for the current token, cached for its TTL.
    pub async fn timeline(&self) -> Result<String> {
        let token = self.auth_token()?;
        self.timeline_for(&token).await
    }

    /// Add a task. The name is trimmed and parsed with Smart Add.
    #[instrument(skip(self), fields(rtm_method = methods::TASKS_ADD))]
    pub async fn add_task(&self, name: &str) -> Result<Response> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RtmError::InvalidInput("task name must not be empty".into()));
        }
        self.mutate(methods::TASKS_ADD, params([("name", name), ("parse", "1")])).await
    }

    /// List tasks, optionally restricted by a search filter.
    #[instrument(skip(self), fields(rtm_method = methods::TASKS_GET_LIST))]
    pub async fn get_task_list(&self, filter: Option<&TaskFilter>) -> Result<TaskList> {
        let token = self.auth_token()?;

        let mut extra = Params::new();
        if let Some(filter) = filter.filter(|f| !f.is_empty()) {
            extra.insert("filter".into(), filter.as_str().to_string());
        }
        let url = self.signed_url(methods::TASKS_GET_LIST, &token, extra);

        let tasks: TaskList = self.executor.execute(Method::GET, &url).await?.payload_as("tasks")?;
        info!(tasks = tasks.iter_tasks().count(), "Task list fetched");
        Ok(tasks)
    }

    #[instrument(skip(self), fields(rtm_method = methods::TASKS_DELETE))]
    pub async fn delete_task(&self, task: &TaskRef) -> Result<Response> {
        self.mutate(methods::TASKS_DELETE, task_params(task)).await
    }

    #[instrument(skip(self), fields(rtm_method = methods::TASKS_COMPLETE))]
    pub async fn complete_task(&self, task: &TaskRef) -> Result<Response> {
        self.mutate(methods::TASKS_COMPLETE, task_params(task)).await
    }

    #[instrument(skip(self), fields(rtm_method = methods::TASKS_UNCOMPLETE))]
    pub async fn uncomplete_task(&self, task: &TaskRef) -> Result<Response> {
        self.mutate(methods::TASKS_UNCOMPLETE, task_params(task)).await
    }

    #[instrument(skip(self), fields(rtm_method = methods::TASKS_SET_NAME))]
    pub async fn set_task_name(&self, task: &TaskRef, name: &str) -> Result<Response> {
        let mut extra = task_params(task);
        extra.insert("name".into(), name.to_string());
        self.mutate(methods::TASKS_SET_NAME, extra).await
    }

    /// Set the priority. Parse user input with `str::parse::<Priority>`,
    /// which rejects anything but `N`, `1`, `2` and `3`.
    #[instrument(skip(self), fields(rtm_method = methods::TASKS_SET_PRIORITY))]
    pub async fn set_task_priority(&self, task: &TaskRef, priority: Priority) -> Result<Response> {
        let mut extra = task_params(task);
        extra.insert("priority".into(), priority.as_str().to_string());
        self.mutate(methods::TASKS_SET_PRIORITY, extra).await
    }

    /// Set the due date from free text ("tomorrow", "2026-10-20").
    #[instrument(skip(self), fields(rtm_method = methods::TASKS_SET_DUE_DATE))]
    pub async fn set_task_due_date(&self, task: &TaskRef, due: &str) -> Result<Response> {
        let mut extra = task_params(task);
        extra.insert("due".into(), due.to_string());
        extra.insert("parse".into(), "1".into());
        self.mutate(methods::TASKS_SET_DUE_DATE, extra).await
    }

    async fn mutate(&self, rtm_method: &'static str, mut extra: Params) -> Result<Response> {
        let token = self.auth_token()?;
        let timeline = self.timeline_for(&token).await?;
        extra.insert("timeline".into(), timeline);
        let url = self.signed_url(rtm_method, &token, extra);

        match self.executor.execute(Method::POST, &url).await {
            Ok(response) => {
                info!("Mutation applied");
                Ok(response)
            }
            Err(err) => {
                if err.api_code() == Some(INVALID_TIMELINE_CODE) {
                    warn!("Timeline rejected; discarding cached handle");
                    self.timelines.invalidate(&token).await;
                }
                Err(err)
            }
        }
    }

    async fn timeline_for(&self, token: &str) -> Result<String> {
        self.timelines.get_or_create(token, || self.create_timeline(token)).await
    }

    #[instrument(skip_all, fields(rtm_method = methods::TIMELINES_CREATE))]
    async fn create_timeline(&self, token: &str) -> Result<String> {
        let url = self.signed_url(methods::TIMELINES_CREATE, token, Params::new());
        self.executor
            .execute_with_timeout(Method::GET, &url, self.config.timeline_timeout)
            .await?
            .timeline()
    }

    fn signed_url(&self, rtm_method: &str, token: &str, mut extra: Params) -> Url {
        extra.insert("format".into(), FORMAT_JSON.into());
        extra.insert("method".into(), rtm_method.into());
        extra.insert("auth_token".into(), token.into());
        self.signer.signed_url(&self.rest_url, &extra)
    }
}

fn task_params(task: &TaskRef) -> Params {
    params([
        ("list_id", task.list_id.as_str()),
        ("taskseries_id", task.taskseries_id.as_str()),
        ("task_id", task.task_id.as_str()),
    ])
}

fn parse_endpoint(label: &str, raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| RtmError::Config(format!("Invalid {label} endpoint {raw:?}: {e}")))
}

/// Builder for [`RtmClient`]
#[derive(Default)]
pub struct RtmClientBuilder {
    config: Option<RtmClientConfig>,
    credentials: Option<Credentials>,
    clock: Option<SharedClock>,
}

impl RtmClientBuilder {
    /// Set the client configuration
    pub fn config(mut self, config: RtmClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the credentials
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Point both endpoints at `base` (e.g. a mock server).
    pub fn base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let config = self.config.get_or_insert_with(RtmClientConfig::default);
        config.rest_url = format!("{base}/services/rest/");
        config.auth_url = format!("{base}/services/auth/");
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.get_or_insert_with(RtmClientConfig::default).request_timeout = timeout;
        self
    }

    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.config.get_or_insert_with(RtmClientConfig::default).min_request_interval = interval;
        self
    }

    /// Inject a clock (for testing)
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns error if credentials are missing or client creation fails
    pub fn build(self) -> Result<RtmClient> {
        let config = self.config.unwrap_or_default();
        let credentials =
            self.credentials.ok_or_else(|| RtmError::Config("Credentials not set".to_string()))?;
        let clock = self.clock.unwrap_or_else(SystemClock::shared);

        RtmClient::with_clock(config, credentials, clock)
    }
}
