//! Client for the OpenAI-compatible assistant API served by Bee.
//!
//! The crate covers the surface the bundled demos drive: assistants, threads,
//! messages, runs (polling, tool outputs and streaming), files, vector stores,
//! the Bee custom tool registry and the observe (trace) API.
//!
//! ```no_run
//! use bee_openai::{assistants::CreateAssistantRequest, Credentials, OpenAiClient};
//!
//! # async fn demo() -> Result<(), bee_openai::OpenAiError> {
//! let client = OpenAiClient::new(Credentials::from_env()?)?;
//! let request = CreateAssistantRequest::builder("meta-llama/llama-3-1-70b-instruct").build()?;
//! let assistant = client.create_assistant(request).await?;
//! client.delete_assistant(&assistant.id).await?;
//! # Ok(())
//! # }
//! ```

use dotenvy::dotenv;
use reqwest::header::InvalidHeaderValue;
use serde::Deserialize;
use std::env;

pub mod assistants;
pub mod client;
pub mod files;
pub mod tools;
pub mod trace;

pub use client::{Deleted, List, ListQuery, OpenAiClient, Order};

/// Path of the assistant API below the server URL.
pub const API_ROOT: &str = "v1";
/// Path of the observe (trace) API below the server URL.
pub const OBSERVE_ROOT: &str = "observe";

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "BEE_API_KEY";
/// Environment variable holding the server URL, without the `/v1` suffix.
pub const SERVER_URL_VAR: &str = "BEE_API";

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenAiError {
    pub message: String,
    #[serde(rename = "type", default = "unknown_error_type")]
    pub error_type: String,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    /// HTTP status of the response that carried the error, if any.
    #[serde(skip)]
    pub status: Option<u16>,
}

fn unknown_error_type() -> String {
    "unknown".to_string()
}

impl OpenAiError {
    pub fn new(message: String, error_type: String) -> OpenAiError {
        OpenAiError {
            message,
            error_type,
            param: None,
            code: None,
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> OpenAiError {
        self.status = Some(status);
        self
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404) || self.code.as_deref() == Some("not_found")
    }
}

impl std::fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.error_type, self.message),
            None => write!(f, "{}: {}", self.error_type, self.message),
        }
    }
}

impl std::error::Error for OpenAiError {}

impl From<reqwest::Error> for OpenAiError {
    fn from(value: reqwest::Error) -> Self {
        let error = OpenAiError::new(value.to_string(), "http".to_string());
        match value.status() {
            Some(status) => error.with_status(status.as_u16()),
            None => error,
        }
    }
}

impl From<std::io::Error> for OpenAiError {
    fn from(value: std::io::Error) -> Self {
        OpenAiError::new(value.to_string(), "io".to_string())
    }
}

impl From<serde_json::Error> for OpenAiError {
    fn from(value: serde_json::Error) -> Self {
        OpenAiError::new(value.to_string(), "json".to_string())
    }
}

impl From<InvalidHeaderValue> for OpenAiError {
    fn from(value: InvalidHeaderValue) -> Self {
        OpenAiError::new(
            format!("API key is not a valid header value: {value}"),
            "configuration".to_string(),
        )
    }
}

impl From<derive_builder::UninitializedFieldError> for OpenAiError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        OpenAiError::new(value.to_string(), "builder".to_string())
    }
}

impl From<reqwest_eventsource::CannotCloneRequestError> for OpenAiError {
    fn from(value: reqwest_eventsource::CannotCloneRequestError) -> Self {
        OpenAiError::new(value.to_string(), "stream".to_string())
    }
}

impl From<reqwest_eventsource::Error> for OpenAiError {
    fn from(value: reqwest_eventsource::Error) -> Self {
        match value {
            reqwest_eventsource::Error::InvalidStatusCode(status, _) => OpenAiError::new(
                format!("stream rejected with status {status}"),
                "stream".to_string(),
            )
            .with_status(status.as_u16()),
            other => OpenAiError::new(other.to_string(), "stream".to_string()),
        }
    }
}

pub type ApiResponseOrError<T> = Result<T, OpenAiError>;

/// API key and base URL for one API root of a Bee server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    server_url: String,
    base_url: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Credentials {
    /// Credentials for the assistant API (`{server_url}/v1/`).
    pub fn new(api_key: impl Into<String>, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        let base_url = format!("{server_url}/{API_ROOT}/");
        Self {
            api_key: api_key.into(),
            server_url,
            base_url,
        }
    }

    /// Reads `BEE_API_KEY` and `BEE_API`, loading a `.env` file first if one exists.
    ///
    /// ```rust,no_run
    /// use bee_openai::Credentials;
    ///
    /// let credentials = Credentials::from_env().expect("BEE_API and BEE_API_KEY should be set");
    /// ```
    pub fn from_env() -> ApiResponseOrError<Self> {
        dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ApiResponseOrError<Self> {
        let api_key = required_var(&lookup, API_KEY_VAR)?;
        let server_url = required_var(&lookup, SERVER_URL_VAR)?;
        Ok(Self::new(api_key, server_url))
    }

    /// Same key, pointed at the observe API (`{server_url}/observe/`).
    pub fn observe(&self) -> Self {
        Self {
            api_key: self.api_key.clone(),
            server_url: self.server_url.clone(),
            base_url: format!("{}/{OBSERVE_ROOT}/", self.server_url),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

fn required_var(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
) -> ApiResponseOrError<String> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(OpenAiError::new(
            format!("environment variable `{name}` should be defined"),
            "configuration".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_roots() {
        let credentials = Credentials::new("key", "https://bee.example.com/");
        assert_eq!(credentials.base_url(), "https://bee.example.com/v1/");
        assert_eq!(
            credentials.observe().base_url(),
            "https://bee.example.com/observe/"
        );
        assert_eq!(credentials.observe().api_key(), "key");
    }

    #[test]
    fn credentials_from_vars() {
        let vars = |name: &str| match name {
            API_KEY_VAR => Some("key".to_string()),
            SERVER_URL_VAR => Some("http://localhost:4000".to_string()),
            _ => None,
        };
        let credentials = Credentials::from_vars(vars).unwrap();
        assert_eq!(credentials.api_key(), "key");
        assert_eq!(credentials.base_url(), "http://localhost:4000/v1/");
    }

    #[test]
    fn missing_variable_is_named() {
        let error = Credentials::from_vars(|name: &str| {
            (name == API_KEY_VAR).then(|| "key".to_string())
        })
        .unwrap_err();
        assert_eq!(error.error_type, "configuration");
        assert!(error.message.contains("`BEE_API`"));

        let error = Credentials::from_vars(|name: &str| {
            (name == SERVER_URL_VAR).then(|| " ".to_string())
        })
        .unwrap_err();
        assert!(error.message.contains("`BEE_API_KEY`"));
    }

    #[test]
    fn credentials_debug_hides_key() {
        let credentials = Credentials::new("secret-key", "http://localhost:4000");
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("http://localhost:4000/v1/"));
    }

    #[test]
    fn error_envelope_without_type() {
        let error: OpenAiError =
            serde_json::from_str(r#"{"message": "Tool not found", "code": "not_found"}"#).unwrap();
        assert_eq!(error.error_type, "unknown");
        assert!(error.is_not_found());
    }

    #[test]
    fn error_display_includes_status() {
        let error = OpenAiError::new("gone".to_string(), "invalid_request_error".to_string())
            .with_status(404);
        assert_eq!(error.to_string(), "invalid_request_error (404): gone");
        assert!(error.is_not_found());
    }
}
