//! The `DocumentStore` trait — list/get/create/update/delete over named
//! collections plus a live-update subscription. The aggregation core only
//! depends on this seam, never on a concrete transport.

use crate::query::Query;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;
use vecivendo_core::VeciResult;

/// One page of documents from a `list` call.
#[derive(Debug, Clone)]
pub struct DocumentList {
    pub documents: Vec<Value>,
    pub total: u64,
}

/// A create/update/delete notification scoped to one collection.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub collection: String,
    pub kind: StoreEventKind,
    pub document_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    Created,
    Updated,
    Deleted,
}

/// A live-update subscription to one collection. Dropping the value
/// releases the subscription.
pub struct Subscription {
    collection: String,
    receiver: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub fn new(collection: impl Into<String>, receiver: broadcast::Receiver<StoreEvent>) -> Self {
        Self {
            collection: collection.into(),
            receiver,
        }
    }

    /// Await the next event for this subscription's collection. Returns
    /// `None` once the feed is closed. A lagged receiver skips ahead
    /// rather than erroring: a missed notification only costs one refresh.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.collection == self.collection => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        collection = %self.collection,
                        skipped = skipped,
                        "Subscription lagged behind the event feed"
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Document-database client: list/get/create/update/delete by id with a
/// filter/sort/paginate query, plus collection-scoped subscriptions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: &str, query: &Query) -> VeciResult<DocumentList>;

    async fn get(&self, collection: &str, id: &str) -> VeciResult<Value>;

    async fn create(&self, collection: &str, id: Option<&str>, data: Value) -> VeciResult<Value>;

    async fn update(&self, collection: &str, id: &str, patch: Value) -> VeciResult<Value>;

    async fn delete(&self, collection: &str, id: &str) -> VeciResult<()>;

    /// Subscribe to create/update/delete events on one collection.
    fn subscribe(&self, collection: &str) -> Subscription;
}
