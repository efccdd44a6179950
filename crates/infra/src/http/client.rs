use std::time::Duration;

use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use rtm_domain::{Result, RtmError};
use tracing::debug;

use crate::errors::InfraError;

/// Single-shot HTTP transport.
///
/// Pacing, deadlines and retries belong to the request executor; this type
/// only turns a request into a response or a domain error.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder once.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|err| RtmError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %path, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                let err = err.without_url();
                debug!(%method, %path, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`HttpClient`].
///
/// Proxies come from the environment (`HTTP_PROXY`, `HTTPS_PROXY`,
/// `NO_PROXY`) as reqwest resolves them.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
}

impl HttpClientBuilder {
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().connect_timeout(CONNECT_TIMEOUT);

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder
            .build()
            .map_err(|err| RtmError::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(HttpClient { client })
    }
}
