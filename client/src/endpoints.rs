use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fetch::RequestDescriptor;
use crate::http::HttpMethod;
use crate::{Credentials, DeletedImage, DirectUploadUrl, Image, ListImagesResult, Result, BASE_URL};

/// An API operation: maps the caller's parameters to a request.
pub trait Endpoint {
    /// Type of the envelope's `result` on success.
    type Output: DeserializeOwned;

    fn descriptor(&self, credentials: &Credentials) -> Result<RequestDescriptor>;
}

fn images_url(credentials: &Credentials, path: &str) -> String {
    format!(
        "{}/accounts/{}/images/{}",
        BASE_URL,
        urlencoding::encode(credentials.account_id()),
        path
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// `GET /images/v2`: one page of images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListImagesRequest {
    /// Token returned by the previous page.
    pub continuation_token: Option<String>,
    /// Images per page; the API defaults to 1000 and accepts 10 to 10000.
    pub per_page: Option<u32>,
    /// Order by upload time; the API defaults to descending.
    pub sort_order: Option<SortOrder>,
}

impl ListImagesRequest {
    pub fn after(continuation_token: impl Into<String>) -> Self {
        Self {
            continuation_token: Some(continuation_token.into()),
            ..Self::default()
        }
    }
}

impl Endpoint for ListImagesRequest {
    type Output = ListImagesResult;

    fn descriptor(&self, credentials: &Credentials) -> Result<RequestDescriptor> {
        Ok(RequestDescriptor::new(
            HttpMethod::GET,
            images_url(credentials, "v2"),
            credentials.clone(),
        )
        .search_param("continuation_token", self.continuation_token.as_deref())
        .search_param("per_page", self.per_page)
        .search_param("sort_order", self.sort_order))
    }
}

/// `POST /images/v2/direct_upload`: a one-time URL for an unauthenticated upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectUploadRequest {
    /// Upload deadline, between now + 2 minutes and now + 6 hours. The API
    /// defaults to now + 30 minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(rename = "requireSignedURLs", skip_serializing_if = "Option::is_none")]
    pub require_signed_urls: Option<bool>,
}

impl Endpoint for DirectUploadRequest {
    type Output = DirectUploadUrl;

    fn descriptor(&self, credentials: &Credentials) -> Result<RequestDescriptor> {
        RequestDescriptor::new(
            HttpMethod::POST,
            images_url(credentials, "v2/direct_upload"),
            credentials.clone(),
        )
        .json_body(self)
    }
}

/// `PATCH /images/v1/{identifier}`. Fields left as `None` are not sent and
/// stay unchanged on the server. Changing `require_signed_urls` gives the
/// image a new id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateImageRequest {
    #[serde(skip)]
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(rename = "requireSignedURLs", skip_serializing_if = "Option::is_none")]
    pub require_signed_urls: Option<bool>,
}

impl UpdateImageRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }
}

impl Endpoint for UpdateImageRequest {
    type Output = Image;

    fn descriptor(&self, credentials: &Credentials) -> Result<RequestDescriptor> {
        let path = format!("v1/{}", urlencoding::encode(&self.identifier));
        RequestDescriptor::new(
            HttpMethod::PATCH,
            images_url(credentials, &path),
            credentials.clone(),
        )
        .json_body(self)
    }
}

/// `DELETE /images/v1/{identifier}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteImageRequest {
    pub identifier: String,
}

impl DeleteImageRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl Endpoint for DeleteImageRequest {
    type Output = DeletedImage;

    fn descriptor(&self, credentials: &Credentials) -> Result<RequestDescriptor> {
        let path = format!("v1/{}", urlencoding::encode(&self.identifier));
        Ok(RequestDescriptor::new(
            HttpMethod::DELETE,
            images_url(credentials, &path),
            credentials.clone(),
        ))
    }
}
