//! Frob/token authorization handshake
//!
//! `NoFrob -> FrobObtained -> Authorized`. The step between the last two
//! states is a human approving the application in a browser; the flow hands
//! that wait to an injected [`AuthorizationPrompt`], so it can be driven by
//! a terminal, an editor, or a test stub.

use async_trait::async_trait;
use reqwest::Method;
use rtm_domain::constants::{methods, FORMAT_JSON, PERMS_DELETE};
use rtm_domain::{Result, RtmError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, instrument};
use url::Url;

use super::executor::RequestExecutor;
use super::signature::{params, Signer};

/// Waits for the user to approve the application
///
/// Implementations show `auth_url` to the user and return once they confirm.
/// There is no timeout; the wait lasts as long as the human needs.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    async fn wait_for_authorization(&self, auth_url: &Url) -> Result<()>;
}

/// Terminal prompt: prints the URL on stderr and waits for Enter on stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

#[async_trait]
impl AuthorizationPrompt for StdinPrompt {
    async fn wait_for_authorization(&self, auth_url: &Url) -> Result<()> {
        let message = format!(
            "Open the following URL in your browser and authorize the application:\n\n  \
             {auth_url}\n\nPress Enter after authorizing...\n"
        );
        let mut stderr = tokio::io::stderr();
        stderr.write_all(message.as_bytes()).await?;
        stderr.flush().await?;

        let mut line = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(())
    }
}

/// Where the handshake currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    NoFrob,
    FrobObtained { frob: String },
    Authorized { token: String },
}

/// Build the browser authorization URL for `frob`.
///
/// The signature covers `frob` and `perms`; `perms` is always `delete`.
pub fn authorization_url(signer: &Signer, auth_url: &Url, frob: &str) -> Url {
    signer.signed_url(auth_url, &params([("frob", frob), ("perms", PERMS_DELETE)]))
}

/// One run of the handshake
pub struct AuthFlow<'a> {
    executor: &'a RequestExecutor,
    signer: &'a Signer,
    rest_url: &'a Url,
    auth_url: &'a Url,
    state: AuthState,
}

impl<'a> AuthFlow<'a> {
    pub fn new(
        executor: &'a RequestExecutor,
        signer: &'a Signer,
        rest_url: &'a Url,
        auth_url: &'a Url,
    ) -> Self {
        Self { executor, signer, rest_url, auth_url, state: AuthState::NoFrob }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// `NoFrob -> FrobObtained`
    #[instrument(skip(self), fields(rtm_method = methods::AUTH_GET_FROB))]
    pub async fn request_frob(&mut self) -> Result<String> {
        if !matches!(self.state, AuthState::NoFrob) {
            return Err(RtmError::InvalidInput("a frob has already been obtained".into()));
        }

        let url = self.signer.signed_url(
            self.rest_url,
            &params([("format", FORMAT_JSON), ("method", methods::AUTH_GET_FROB)]),
        );
        let frob = self.executor.execute(Method::GET, &url).await?.frob()?;

        debug!("Frob obtained");
        self.state = AuthState::FrobObtained { frob: frob.clone() };
        Ok(frob)
    }

    /// Authorization URL for the current frob.
    pub fn authorization_url(&self) -> Result<Url> {
        match &self.state {
            AuthState::FrobObtained { frob } => {
                Ok(authorization_url(self.signer, self.auth_url, frob))
            }
            _ => Err(RtmError::InvalidInput("no pending frob to authorize".into())),
        }
    }

    /// `FrobObtained -> Authorized`
    #[instrument(skip(self), fields(rtm_method = methods::AUTH_GET_TOKEN))]
    pub async fn exchange_token(&mut self) -> Result<String> {
        let AuthState::FrobObtained { frob } = &self.state else {
            return Err(RtmError::InvalidInput("no pending frob to exchange".into()));
        };

        let url = self.signer.signed_url(
            self.rest_url,
            &params([
                ("format", FORMAT_JSON),
                ("frob", frob.as_str()),
                ("method", methods::AUTH_GET_TOKEN),
            ]),
        );
        let token = self.executor.execute(Method::GET, &url).await?.auth_token()?;

        info!("Authorization complete");
        self.state = AuthState::Authorized { token: token.clone() };
        Ok(token)
    }

    /// Drive the whole handshake, waiting on `prompt` between the steps.
    pub async fn run(mut self, prompt: &dyn AuthorizationPrompt) -> Result<String> {
        self.request_frob().await?;
        let url = self.authorization_url()?;
        prompt.wait_for_authorization(&url).await?;
        self.exchange_token().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use rtm_common::resilience::MinIntervalLimiter;
    use rtm_common::testing::MockClock;
    use rtm_common::time::SharedClock;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::HttpClient;

    #[derive(Default)]
    struct RecordingPrompt {
        seen: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl AuthorizationPrompt for RecordingPrompt {
        async fn wait_for_authorization(&self, auth_url: &Url) -> Result<()> {
            self.seen.lock().push(auth_url.clone());
            Ok(())
        }
    }

    fn executor() -> RequestExecutor {
        let clock: SharedClock = Arc::new(MockClock::new());
        RequestExecutor::new(
            HttpClient::new().unwrap(),
            Arc::new(MinIntervalLimiter::with_clock(Duration::from_secs(1), clock.clone())),
            clock,
            Duration::from_secs(5),
            3,
        )
    }

    async fn mount_frob(server: &MockServer) {
        Mock::given(method("GET"))
            .and(query_param("method", "rtm.auth.getFrob"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rsp":{"stat":"ok","frob":"f00"}}"#),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_handshake(server: &MockServer) {
        mount_frob(server).await;
        Mock::given(method("GET"))
            .and(query_param("method", "rtm.auth.getToken"))
            .and(query_param("frob", "f00"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"rsp":{"stat":"ok","auth":{"token":"tok-123","perms":"delete","user":{"id":"1","username":"bob"}}}}"#,
            ))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_authorization_url_layout() {
        let signer = Signer::new("abc123", "BANANAS");
        let auth = Url::parse("https://www.rememberthemilk.com/services/auth/").unwrap();

        let url = authorization_url(&signer, &auth, "f00");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/services/auth/");
        assert!(query.contains(&("api_key".into(), "abc123".into())));
        assert!(query.contains(&("perms".into(), "delete".into())));
        assert!(query.contains(&("frob".into(), "f00".into())));
        assert!(query.contains(&("api_sig".into(), "1ce0bcc795200cea52f62501acc028a7".into())));
    }

    #[tokio::test]
    async fn test_full_handshake_with_stub_prompt() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let executor = executor();
        let signer = Signer::new("abc123", "BANANAS");
        let rest = Url::parse(&format!("{}/services/rest/", server.uri())).unwrap();
        let auth = Url::parse("https://www.rememberthemilk.com/services/auth/").unwrap();
        let prompt = RecordingPrompt::default();

        let token = AuthFlow::new(&executor, &signer, &rest, &auth).run(&prompt).await.unwrap();

        assert_eq!(token, "tok-123");
        let seen = prompt.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].query_pairs().any(|(k, v)| k == "frob" && v == "f00"));
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let server = MockServer::start().await;
        mount_handshake(&server).await;

        let executor = executor();
        let signer = Signer::new("k", "s");
        let rest = Url::parse(&format!("{}/services/rest/", server.uri())).unwrap();
        let auth = Url::parse("https://example.test/services/auth/").unwrap();
        let mut flow = AuthFlow::new(&executor, &signer, &rest, &auth);

        assert_eq!(flow.state(), &AuthState::NoFrob);
        assert!(flow.authorization_url().is_err());
        assert!(flow.exchange_token().await.is_err());

        flow.request_frob().await.unwrap();
        assert_eq!(flow.state(), &AuthState::FrobObtained { frob: "f00".into() });
        assert!(flow.request_frob().await.is_err());

        flow.exchange_token().await.unwrap();
        assert_eq!(flow.state(), &AuthState::Authorized { token: "tok-123".into() });
    }

    #[tokio::test]
    async fn test_frob_request_is_unauthenticated() {
        let server = MockServer::start().await;
        mount_frob(&server).await;

        let executor = executor();
        let signer = Signer::new("k", "s");
        let rest = Url::parse(&format!("{}/services/rest/", server.uri())).unwrap();
        let auth = Url::parse("https://example.test/services/auth/").unwrap();
        let mut flow = AuthFlow::new(&executor, &signer, &rest, &auth);
        flow.request_frob().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].url.query_pairs().all(|(k, _)| k != "auth_token"));
    }

    #[tokio::test]
    async fn test_envelope_failure_stops_flow() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"rsp":{"stat":"fail","err":{"code":"100","msg":"Invalid API Key"}}}"#,
            ))
            .mount(&server)
            .await;

        let executor = executor();
        let signer = Signer::new("k", "s");
        let rest = Url::parse(&format!("{}/services/rest/", server.uri())).unwrap();
        let auth = Url::parse("https://example.test/services/auth/").unwrap();
        let prompt = RecordingPrompt::default();

        let err = AuthFlow::new(&executor, &signer, &rest, &auth).run(&prompt).await.unwrap_err();

        assert_eq!(err.api_code(), Some("100"));
        assert!(prompt.seen.lock().is_empty());
    }
}
