//! Request building and response normalization shared by every endpoint.

use std::collections::HashMap;
use std::future::Future;

use bytes::Bytes;
use futures::future::{self, Either};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, ResponseHead};
use crate::{ApiError, ClientError, Credentials, Envelope, Result};

static HEADER_CONTENT_TYPE: &str = "Content-Type";
static HEADER_ACCEPT: &str = "Accept";
static APPLICATION_JSON: &str = "application/json";

/// Target of a request, either already parsed or still a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    Parsed(Url),
    Raw(String),
}

impl UrlSource {
    fn resolve(&self) -> Result<Url> {
        match self {
            UrlSource::Parsed(url) => Ok(url.clone()),
            UrlSource::Raw(raw) => Ok(Url::parse(raw)?),
        }
    }
}

impl From<Url> for UrlSource {
    fn from(url: Url) -> Self {
        UrlSource::Parsed(url)
    }
}

impl From<String> for UrlSource {
    fn from(url: String) -> Self {
        UrlSource::Raw(url)
    }
}

impl From<&str> for UrlSource {
    fn from(url: &str) -> Self {
        UrlSource::Raw(url.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentType {
    /// `application/json`
    #[default]
    Json,
    /// Send no `Content-Type` header at all.
    Omit,
    Explicit(String),
}

/// How the body of a successful response is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Response envelope; the call resolves to its `result`.
    #[default]
    Json,
    Text,
    Binary,
}

/// Everything needed to issue one call. Built fresh per call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: UrlSource,
    /// Query parameters in order. `None` values are left out of the URL.
    pub search_params: Vec<(String, Option<String>)>,
    pub content_type: ContentType,
    pub accept: Option<String>,
    pub body: Option<String>,
    /// Only single-response calls honor `Text` and `Binary`; [`page`]
    /// refuses them.
    pub response_type: ResponseType,
    /// Value returned instead of an error when the server answers 404.
    pub not_found: Option<Value>,
    /// Collapse a one-element array result to the element (query mode).
    pub single: bool,
    pub credentials: Credentials,
    pub cancel: Option<CancellationToken>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: impl Into<UrlSource>, credentials: Credentials) -> Self {
        Self {
            method,
            url: url.into(),
            search_params: Vec::new(),
            content_type: ContentType::default(),
            accept: None,
            body: None,
            response_type: ResponseType::default(),
            not_found: None,
            single: false,
            credentials,
            cancel: None,
        }
    }

    pub fn search_param<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.search_params
            .push((key.into(), value.map(|value| value.to_string())));
        self
    }

    pub fn json_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self)
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn not_found(mut self, fallback: Value) -> Self {
        self.not_found = Some(fallback);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Turn a descriptor into a concrete request. Performs no I/O.
pub fn build_request(descriptor: &RequestDescriptor) -> Result<HttpRequest> {
    let mut url = descriptor.url.resolve()?;
    apply_search_params(&mut url, &descriptor.search_params);

    let mut headers = HashMap::new();
    let content_type = match &descriptor.content_type {
        ContentType::Json => Some(APPLICATION_JSON),
        ContentType::Omit => None,
        ContentType::Explicit(value) => Some(value.as_str()),
    };
    if let Some(content_type) = content_type {
        headers.insert(HEADER_CONTENT_TYPE.to_string(), content_type.to_string());
    }
    if let Some(accept) = &descriptor.accept {
        headers.insert(HEADER_ACCEPT.to_string(), accept.clone());
    }
    descriptor.credentials.apply(&mut headers);

    Ok(HttpRequest {
        method: descriptor.method,
        url,
        headers,
        body: descriptor.body.clone(),
        cancel: descriptor.cancel.clone(),
    })
}

// Each present parameter replaces any value of the same key already in the URL.
fn apply_search_params(url: &mut Url, params: &[(String, Option<String>)]) {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    for (key, value) in params {
        if let Some(value) = value {
            pairs.retain(|(existing, _)| existing != key);
            pairs.push((key.clone(), value.clone()));
        }
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
}

/// Decoded outcome of a single-response call.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The envelope's `result`, or the declared 404 fallback.
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl Response {
    pub fn json<R: DeserializeOwned>(self) -> Result<R> {
        match self {
            Response::Json(value) => Ok(serde_json::from_value(value)?),
            Response::Text(_) => Err(ClientError::UnexpectedBody("text")),
            Response::Binary(_) => Err(ClientError::UnexpectedBody("binary")),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Response::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Response::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Execute one request and return its result, or the API failure.
///
/// Order of checks: 404 fallback, HTTP status, declared body type, then
/// the envelope's `success` flag. A cancel token covers the whole call,
/// body read included.
pub async fn response(
    transport: &dyn HttpClient,
    descriptor: RequestDescriptor,
) -> Result<Response> {
    let cancel = descriptor.cancel.clone();
    cancellable(cancel, async move {
        let response = match send(transport, &descriptor).await? {
            Sent::Fallback(fallback) => return Ok(Response::Json(fallback)),
            Sent::Response(response) => response,
        };

        match descriptor.response_type {
            ResponseType::Text => Ok(Response::Text(response.text().await?)),
            ResponseType::Binary => Ok(Response::Binary(response.bytes().await?)),
            ResponseType::Json => {
                let envelope = decode_envelope(response).await?;
                Ok(Response::Json(envelope.result))
            }
        }
    })
    .await
}

/// Execute one request and return the whole envelope, for paged results.
///
/// Pages are always envelopes; a descriptor declaring a text or binary
/// response is rejected before anything is sent.
pub async fn page(transport: &dyn HttpClient, descriptor: RequestDescriptor) -> Result<Envelope> {
    match descriptor.response_type {
        ResponseType::Json => {}
        ResponseType::Text => return Err(ClientError::UnexpectedBody("text")),
        ResponseType::Binary => return Err(ClientError::UnexpectedBody("binary")),
    }

    let cancel = descriptor.cancel.clone();
    cancellable(cancel, async move {
        let envelope = match send(transport, &descriptor).await? {
            Sent::Fallback(fallback) => Envelope::from_result(fallback),
            Sent::Response(response) => decode_envelope(response).await?,
        };

        if descriptor.single {
            Ok(envelope.into_single())
        } else {
            Ok(envelope)
        }
    })
    .await
}

enum Sent {
    Fallback(Value),
    Response(HttpResponse),
}

// Dispatches the request and applies the status checks. The body is only
// read here when the status is an error.
async fn send(transport: &dyn HttpClient, descriptor: &RequestDescriptor) -> Result<Sent> {
    let request = build_request(descriptor)?;
    debug!(method = %request.method, url = %request.url, "sending request");

    let response = transport.request(request).await?;
    debug!(status = response.status, "received response");

    if response.status == 404 {
        if let Some(fallback) = &descriptor.not_found {
            debug!("not found, returning declared fallback");
            return Ok(Sent::Fallback(fallback.clone()));
        }
    }

    if !response.is_success() {
        let head = response.head();
        let envelope: Envelope = response.json().await?;
        return Err(request_failed(envelope, head));
    }

    Ok(Sent::Response(response))
}

// Runs `work` until it finishes or `cancel` fires. An already cancelled
// token fails without polling `work`.
async fn cancellable<T, F>(cancel: Option<CancellationToken>, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(token) = cancel else {
        return work.await;
    };
    if token.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    let cancelled = Box::pin(token.cancelled());
    let work = Box::pin(work);
    let outcome = match future::select(cancelled, work).await {
        Either::Left(_) => {
            debug!("request cancelled");
            Err(ClientError::Cancelled)
        }
        Either::Right((result, _)) => result,
    };
    outcome
}

async fn decode_envelope(response: HttpResponse) -> Result<Envelope> {
    let head = response.head();
    let envelope: Envelope = response.json().await?;
    if !envelope.success {
        return Err(request_failed(envelope, head));
    }
    Ok(envelope)
}

fn request_failed(envelope: Envelope, head: ResponseHead) -> ClientError {
    let err = ApiError::new(envelope, head);
    warn!(status = err.response.status, code = err.code, "request failed: {}", err);
    ClientError::RequestFailed(Box::new(err))
}
