use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::endpoints::Endpoint;
use crate::fetch::{self, RequestDescriptor};
use crate::http::{HttpClient, ReqwestClient};
use crate::query::Query;
use crate::{
    ClientConfig, Credentials, DeleteImageRequest, DeletedImage, DirectUploadRequest,
    DirectUploadUrl, Image, ListImagesRequest, ListImagesResult, Result, UpdateImageRequest,
};

/// Cloudflare Images client bound to one account's credentials.
///
/// Cloning is cheap; clones share the credentials and the transport.
#[derive(Clone)]
pub struct Client {
    credentials: Arc<Credentials>,
    transport: Arc<dyn HttpClient>,
    cancel: Option<CancellationToken>,
}

impl Client {
    /// Client using the default reqwest transport.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_transport(credentials, Arc::new(ReqwestClient::new()))
    }

    pub fn with_transport(credentials: Credentials, transport: Arc<dyn HttpClient>) -> Self {
        Self {
            credentials: Arc::new(credentials),
            transport,
            cancel: None,
        }
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestClient::with_options(config.timeout, config.user_agent.as_deref())?;
        Ok(Self::with_transport(config.credentials, Arc::new(transport)))
    }

    /// Read the whole configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// A client whose calls fail with [`crate::ClientError::Cancelled`] once
    /// `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            credentials: self.credentials.clone(),
            transport: self.transport.clone(),
            cancel: Some(token),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// List one page of images. Pass the returned continuation token back
    /// in the next request to continue.
    pub async fn list_images(&self, params: ListImagesRequest) -> Result<ListImagesResult> {
        self.send(&params).await
    }

    pub async fn create_direct_upload_url(
        &self,
        params: DirectUploadRequest,
    ) -> Result<DirectUploadUrl> {
        self.send(&params).await
    }

    pub async fn update_image(&self, params: UpdateImageRequest) -> Result<Image> {
        self.send(&params).await
    }

    pub async fn delete_image(&self, params: DeleteImageRequest) -> Result<DeletedImage> {
        self.send(&params).await
    }

    /// Run any endpoint and decode its result.
    pub async fn send<E: Endpoint>(&self, endpoint: &E) -> Result<E::Output> {
        let descriptor = self.descriptor(endpoint)?;
        fetch::response(self.transport.as_ref(), descriptor)
            .await?
            .json()
    }

    /// Build a lazy [`Query`] over the items of an endpoint's array result.
    pub fn query<E: Endpoint, T: DeserializeOwned>(&self, endpoint: &E) -> Query<T> {
        Query::new(self.transport.clone(), self.descriptor(endpoint))
    }

    fn descriptor<E: Endpoint>(&self, endpoint: &E) -> Result<RequestDescriptor> {
        let descriptor = endpoint.descriptor(&self.credentials)?;
        Ok(match &self.cancel {
            Some(token) => descriptor.cancel_token(token.clone()),
            None => descriptor,
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}
