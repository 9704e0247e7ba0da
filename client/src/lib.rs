//! Typed async client for the Cloudflare Images API.
//!
//! Every call goes through the same pipeline: an [`endpoints::Endpoint`]
//! describes the request, [`fetch`] turns it into an HTTP request and
//! normalizes the response envelope, and [`query::Query`] offers an
//! iterable view over a page of results.

use std::fmt;
use std::sync::Arc;

pub use crate::client::Client;
pub use crate::config::ClientConfig;
pub use crate::credentials::Credentials;
pub use crate::endpoints::{
    DeleteImageRequest, DirectUploadRequest, Endpoint, ListImagesRequest, SortOrder,
    UpdateImageRequest,
};
pub use crate::http::{
    HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestClient, ResponseHead,
};
pub use crate::query::Query;
pub use crate::responses::*;

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod fetch;
pub mod http;
pub mod query;
pub mod responses;

pub use tokio_util::sync::CancellationToken;

/// Base URL of the Cloudflare v4 API.
pub const BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    RequestFailed(Box<ApiError>),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Reqwest error: {0}")]
    Reqwest(Arc<reqwest::Error>),
    #[error("JSON serialization/deserialization failed: {0}")]
    Json(Arc<serde_json::Error>),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("expected a JSON response but got a {0} body")]
    UnexpectedBody(&'static str),
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// The API failure behind this error, if the server rejected the call.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::RequestFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Reqwest(Arc::new(err))
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Json(Arc::new(err))
    }
}

/// A call rejected by the API, either with a non-2xx status or with
/// `success: false` in the response envelope.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Code of the first reported error, `0` when the server sent none.
    pub code: i64,
    pub errors: Vec<Message>,
    pub messages: Vec<Message>,
    /// Status line and headers of the response that carried the failure.
    pub response: ResponseHead,
}

impl ApiError {
    pub(crate) fn new(envelope: Envelope, response: ResponseHead) -> Self {
        Self {
            code: envelope.errors.first().map(|e| e.code).unwrap_or(0),
            errors: envelope.errors,
            messages: envelope.messages,
            response,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.first() {
            Some(first) => write!(f, "{} (code {})", first.message, first.code),
            None => write!(f, "HTTP request failed (status {})", self.response.status),
        }
    }
}

impl std::error::Error for ApiError {}

pub type Result<T> = std::result::Result<T, ClientError>;
