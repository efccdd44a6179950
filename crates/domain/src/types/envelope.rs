//! Response envelope
//!
//! Every API response is wrapped as `{"rsp": {"stat": "ok"|"fail", ...}}`.
//! Failures carry `{"err": {"code": "...", "msg": "..."}}`; successes carry
//! method-specific members next to `stat`, which are kept in
//! [`Response::payload`] and extracted on demand.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{Result, RtmError};

/// Top-level wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub rsp: Response,
}

impl Envelope {
    /// Parse a raw response body.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if the body is not an envelope.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| RtmError::InvalidResponse(format!("Failed to parse envelope: {e}")))
    }
}

/// Envelope status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Ok,
    Fail,
}

/// Failure details reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFailure {
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub msg: String,
}

/// Body of the envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub stat: Stat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<ApiFailure>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    /// Whether the envelope reports success.
    pub fn is_ok(&self) -> bool {
        self.stat == Stat::Ok
    }

    /// Turn a `fail` envelope into `RtmError::Api`.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::Api` carrying the remote code and message.
    pub fn into_result(self) -> Result<Self> {
        if self.is_ok() {
            return Ok(self);
        }
        let (code, message) = match self.err {
            Some(ApiFailure { code, msg }) => (code, msg),
            None => ("unknown".to_string(), "envelope reported failure without details".into()),
        };
        Err(RtmError::Api { code, message })
    }

    /// Borrow a payload member.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if the member is absent.
    pub fn field(&self, name: &str) -> Result<&Value> {
        self.payload
            .get(name)
            .ok_or_else(|| RtmError::InvalidResponse(format!("response has no `{name}` member")))
    }

    /// Deserialize a payload member into `T`.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if the member is absent or has
    /// the wrong shape.
    pub fn payload_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.field(name)?.clone();
        serde_json::from_value(value)
            .map_err(|e| RtmError::InvalidResponse(format!("malformed `{name}` member: {e}")))
    }

    /// Timeline handle from an `rtm.timelines.create` response.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if missing or empty.
    pub fn timeline(&self) -> Result<String> {
        non_empty(self.payload_as::<String>("timeline")?, "timeline")
    }

    /// Frob from an `rtm.auth.getFrob` response.
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if missing or empty.
    pub fn frob(&self) -> Result<String> {
        non_empty(self.payload_as::<String>("frob")?, "frob")
    }

    /// Auth token from an `rtm.auth.getToken` response (`rsp.auth.token`).
    ///
    /// # Errors
    ///
    /// Returns `RtmError::InvalidResponse` if missing or empty.
    pub fn auth_token(&self) -> Result<String> {
        let token = self
            .field("auth")?
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| RtmError::InvalidResponse("response has no `auth.token`".into()))?;
        non_empty(token.to_string(), "auth.token")
    }
}

fn non_empty(value: String, name: &str) -> Result<String> {
    if value.is_empty() {
        Err(RtmError::InvalidResponse(format!("`{name}` is empty")))
    } else {
        Ok(value)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(text) => text,
        Code::Number(number) => number.to_string(),
    })
}
