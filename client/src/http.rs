use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{ClientError, Result};

/// Transport used to execute requests.
///
/// Implementations only move bytes; status interpretation, envelope
/// decoding and error mapping happen in [`crate::fetch`].
pub trait HttpClient: Send + Sync {
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-formed request, ready for a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    /// Set when the caller can cancel the call; transports may watch it.
    pub cancel: Option<CancellationToken>,
}

/// Status line and headers of a response, kept after the body is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: HashMap<String, String>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A transport response whose body is only read on demand.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    body: BoxFuture<'static, Result<Bytes>>,
}

impl HttpResponse {
    /// Response with an already buffered body.
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::deferred(status, headers, async move { Ok(body) })
    }

    /// Response whose body is produced by `body` when first read.
    pub fn deferred<F>(status: u16, headers: HashMap<String, String>, body: F) -> Self
    where
        F: std::future::Future<Output = Result<Bytes>> + Send + 'static,
    {
        Self {
            status,
            headers,
            body: body.boxed(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn head(&self) -> ResponseHead {
        ResponseHead {
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    pub async fn bytes(self) -> Result<Bytes> {
        self.body.await
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.body.await?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.body.await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_options(timeout: Option<Duration>, user_agent: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::GET => reqwest::Method::GET,
            HttpMethod::POST => reqwest::Method::POST,
            HttpMethod::PUT => reqwest::Method::PUT,
            HttpMethod::PATCH => reqwest::Method::PATCH,
            HttpMethod::DELETE => reqwest::Method::DELETE,
        }
    }
}

impl HttpClient for ReqwestClient {
    fn request(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse>> {
        async move {
            let mut builder = self
                .client
                .request(Self::convert_method(request.method), request.url.as_str());

            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|value| (name.as_str().to_string(), value.to_string()))
                })
                .collect();

            Ok::<_, ClientError>(HttpResponse::deferred(status, headers, async move {
                response.bytes().await.map_err(ClientError::from)
            }))
        }
        .boxed()
    }
}
