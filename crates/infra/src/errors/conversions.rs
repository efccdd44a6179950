//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use rtm_domain::RtmError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub RtmError);

impl From<InfraError> for RtmError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<RtmError> for InfraError {
    fn from(value: RtmError) -> Self {
        InfraError(value)
    }
}

trait IntoRtmError {
    fn into_rtm(self) -> RtmError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RtmError */
/* -------------------------------------------------------------------------- */

// The request URL carries `auth_token` and `api_sig`, so it is stripped
// before any message is formatted.
impl IntoRtmError for HttpError {
    fn into_rtm(self) -> RtmError {
        let err = self.without_url();

        if err.is_timeout() {
            return RtmError::Network("HTTP request timed out".into());
        }

        if err.is_connect() {
            return RtmError::Network(format!("HTTP connection failure: {err}"));
        }

        if let Some(status) = err.status() {
            return RtmError::Http { status: status.as_u16() };
        }

        if err.is_builder() {
            return RtmError::Config(format!("invalid HTTP request: {err}"));
        }

        if err.is_decode() || err.is_body() {
            return RtmError::InvalidResponse(format!("failed to read response body: {err}"));
        }

        RtmError::Network(err.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_rtm())
    }
}

/* -------------------------------------------------------------------------- */
/* toml::de::Error → RtmError */
/* -------------------------------------------------------------------------- */

impl IntoRtmError for toml::de::Error {
    fn into_rtm(self) -> RtmError {
        RtmError::Config(format!("Invalid TOML format: {self}"))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(value.into_rtm())
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn http_status_maps_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::BAD_REQUEST))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: RtmError = InfraError::from(error).into();
        assert_eq!(mapped, RtmError::Http { status: 400 });
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        let mapped: RtmError = InfraError::from(error).into();
        assert!(matches!(mapped, RtmError::Network(_)), "got {mapped:?}");
    }

    #[tokio::test]
    async fn connection_failure_message_omits_query() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client
            .get(format!("http://{addr}/services/rest/?auth_token=tok-123&api_sig=abcdef"))
            .send()
            .await
            .unwrap_err();

        let message = RtmError::from(InfraError::from(error)).to_string();
        assert!(!message.contains("auth_token="), "leaked: {message}");
        assert!(!message.contains("tok-123"), "leaked: {message}");
        assert!(!message.contains("abcdef"), "leaked: {message}");
    }

    #[test]
    fn toml_error_maps_to_config_error() {
        let error = toml::from_str::<toml::Table>("api_key = ").unwrap_err();
        let mapped: RtmError = InfraError::from(error).into();
        assert!(matches!(mapped, RtmError::Config(msg) if msg.contains("TOML")));
    }
}
