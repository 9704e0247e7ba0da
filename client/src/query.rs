//! Lazily executed, memoized view over one page of results.

use std::future::IntoFuture;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;

use crate::fetch::{self, RequestDescriptor};
use crate::http::HttpClient;
use crate::{ClientError, Envelope, Result};

type SharedPage = Shared<BoxFuture<'static, Result<Arc<Envelope>>>>;

/// One call whose page can be awaited, streamed item by item, or drained.
///
/// The request is sent the first time any of [`Query::page`],
/// [`Query::stream`], [`Query::all`] or [`Query::first`] is polled, and only
/// once: every observer, concurrent or later, shares that outcome. Failures
/// are shared the same way.
///
/// Items are the elements of the envelope's `result` when it is an array;
/// any other result yields no items.
pub struct Query<T> {
    page: SharedPage,
    _item: PhantomData<fn() -> T>,
}

impl<T> Query<T> {
    pub fn new(transport: Arc<dyn HttpClient>, descriptor: Result<RequestDescriptor>) -> Self {
        let page = async move {
            let envelope = fetch::page(transport.as_ref(), descriptor?).await?;
            Ok::<_, ClientError>(Arc::new(envelope))
        }
        .boxed()
        .shared();

        Self {
            page,
            _item: PhantomData,
        }
    }

    /// The page envelope (`success`, `messages`, `result`, `result_info`).
    pub async fn page(&self) -> Result<Arc<Envelope>> {
        self.page.clone().await
    }
}

impl<T: DeserializeOwned> Query<T> {
    /// Stream the page's items in order.
    ///
    /// Each returned stream is a single pass; once exhausted it stays
    /// exhausted. Call `stream()` again for a new pass over the same page.
    pub fn stream(&self) -> impl Stream<Item = Result<T>> {
        stream::once(self.page.clone())
            .map(|page| {
                let items = match page {
                    Ok(envelope) => match envelope.items::<T>() {
                        Ok(items) => items.into_iter().map(Ok).collect(),
                        Err(err) => vec![Err(err)],
                    },
                    Err(err) => vec![Err(err)],
                };
                stream::iter(items)
            })
            .flatten()
    }

    pub async fn all(&self) -> Result<Vec<T>> {
        self.stream().try_collect().await
    }

    pub async fn first(&self) -> Result<Option<T>> {
        let stream = self.stream();
        futures::pin_mut!(stream);
        stream.next().await.transpose()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            page: self.page.clone(),
            _item: PhantomData,
        }
    }
}

impl<T> IntoFuture for Query<T> {
    type Output = Result<Arc<Envelope>>;
    type IntoFuture = SharedPage;

    fn into_future(self) -> Self::IntoFuture {
        self.page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::StubTransport;
    use crate::{Credentials, HttpMethod};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Item {
        id: String,
    }

    fn item(id: &str) -> Item {
        Item { id: id.to_string() }
    }

    fn query(transport: &Arc<StubTransport>, single: bool) -> Query<Item> {
        let mut descriptor = RequestDescriptor::new(
            HttpMethod::GET,
            "https://example.com/items",
            Credentials::token("acct", "tok"),
        );
        if single {
            descriptor = descriptor.single();
        }
        Query::new(transport.clone(), Ok(descriptor))
    }

    fn two_items() -> Arc<StubTransport> {
        Arc::new(StubTransport::json(
            200,
            json!({ "success": true, "errors": [], "messages": [], "result": [{ "id": "a" }, { "id": "b" }] }),
        ))
    }

    #[tokio::test]
    async fn test_stream_yields_items_in_order() {
        let transport = two_items();
        let query = query(&transport, false);

        let items: Vec<Item> = query.stream().try_collect().await.unwrap();
        assert_eq!(items, vec![item("a"), item("b")]);
        assert_eq!(query.all().await.unwrap(), vec![item("a"), item("b")]);
        assert_eq!(query.first().await.unwrap(), Some(item("a")));
    }

    #[tokio::test]
    async fn test_single_flight_across_access_paths() {
        let transport = two_items();
        let query = query(&transport, false);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        let (all, first, page) = futures::join!(query.all(), query.first(), query.page());
        assert_eq!(all.unwrap().len(), 2);
        assert_eq!(first.unwrap(), Some(item("a")));
        assert!(page.unwrap().success);

        let awaited = query.clone().await.unwrap();
        assert_eq!(awaited.items::<Item>().unwrap().len(), 2);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausted_stream_stays_empty() {
        let transport = two_items();
        let query = query(&transport, false);

        let stream = query.stream();
        futures::pin_mut!(stream);
        assert_eq!(stream.next().await.unwrap().unwrap(), item("a"));
        assert_eq!(stream.next().await.unwrap().unwrap(), item("b"));
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_non_array_result_yields_nothing() {
        let transport = Arc::new(StubTransport::json(
            200,
            json!({ "success": true, "result": { "id": "a" } }),
        ));
        let query = query(&transport, false);

        assert!(query.all().await.unwrap().is_empty());
        assert_eq!(query.first().await.unwrap(), None);
        assert_eq!(query.page().await.unwrap().result, json!({ "id": "a" }));
    }

    #[tokio::test]
    async fn test_single_mode_collapses_result() {
        let transport = Arc::new(StubTransport::json(
            200,
            json!({ "success": true, "result": [{ "id": "a" }, { "id": "b" }], "result_info": { "page": 1 } }),
        ));
        let query = query(&transport, true);

        let page = query.clone().await.unwrap();
        assert_eq!(page.result_as::<Item>().unwrap(), item("a"));
        assert!(page.result_info.is_none());
        assert!(query.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_shared() {
        let transport = Arc::new(StubTransport::json(
            200,
            json!({ "success": false, "errors": [{ "code": 7003, "message": "No route" }] }),
        ));
        let query = query(&transport, false);

        let err = query.all().await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, 7003);
        let err = query.first().await.unwrap_err();
        assert_eq!(err.api_error().unwrap().code, 7003);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_item_decode_error_surfaces_in_stream() {
        let transport = Arc::new(StubTransport::json(
            200,
            json!({ "success": true, "result": [{ "name": "no id" }] }),
        ));
        let query = query(&transport, false);
        assert!(matches!(query.all().await, Err(ClientError::Json(_))));
    }

    #[tokio::test]
    async fn test_descriptor_error_is_reported() {
        let transport = two_items();
        let query: Query<Item> = Query::new(
            transport.clone(),
            Err(ClientError::Config("bad descriptor".to_string())),
        );
        assert!(matches!(query.page().await, Err(ClientError::Config(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
