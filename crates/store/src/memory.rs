//! In-memory `DocumentStore` used by tests. Evaluates the full filter
//! vocabulary over JSON documents and emits live-update events on
//! mutation, so orchestrator behavior can be exercised without a backend.

use crate::client::{DocumentList, DocumentStore, StoreEvent, StoreEventKind, Subscription};
use crate::query::{Filter, Query, Sort};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::cmp::Ordering;
use tokio::sync::broadcast;
use uuid::Uuid;
use vecivendo_core::{VeciError, VeciResult};

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct MemoryStore {
    collections: DashMap<String, Vec<Value>>,
    events: broadcast::Sender<StoreEvent>,
    /// Collections forced to fail, keyed to the error message returned.
    failures: DashMap<String, String>,
    /// Artificial per-collection list latency, for exercising overlapping
    /// fetch cycles in tests.
    latencies: DashMap<String, std::time::Duration>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            collections: DashMap::new(),
            events,
            failures: DashMap::new(),
            latencies: DashMap::new(),
        }
    }

    /// Bulk-load documents without emitting events.
    pub fn seed(&self, collection: &str, documents: Vec<Value>) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Force every subsequent operation on `collection` to fail until
    /// `clear_failure` is called.
    pub fn set_failure(&self, collection: &str, message: &str) {
        self.failures
            .insert(collection.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, collection: &str) {
        self.failures.remove(collection);
    }

    /// Delay every `list` on `collection` until `clear_latency`.
    pub fn set_latency(&self, collection: &str, latency: std::time::Duration) {
        self.latencies.insert(collection.to_string(), latency);
    }

    pub fn clear_latency(&self, collection: &str) {
        self.latencies.remove(collection);
    }

    fn check_failure(&self, collection: &str) -> VeciResult<()> {
        if let Some(message) = self.failures.get(collection) {
            return Err(VeciError::Fetch(message.clone()));
        }
        Ok(())
    }

    fn emit(&self, collection: &str, kind: StoreEventKind, document_id: &str) {
        // No receivers is fine.
        let _ = self.events.send(StoreEvent {
            collection: collection.to_string(),
            kind,
            document_id: document_id.to_string(),
        });
    }
}

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("$id").and_then(Value::as_str)
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn value_equals(doc_value: &Value, wanted: &Value) -> bool {
    match doc_value {
        // A list field matches when any element equals the wanted value.
        Value::Array(items) => items.iter().any(|item| item == wanted),
        other => other == wanted,
    }
}

fn matches_filter(doc: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Equal { field, value } => doc
            .get(field)
            .map(|dv| value_equals(dv, value))
            .unwrap_or(false),
        Filter::In { field, values } => doc
            .get(field)
            .map(|dv| values.iter().any(|v| value_equals(dv, v)))
            .unwrap_or(false),
        Filter::GreaterThanEqual { field, value } => doc
            .get(field)
            .and_then(|dv| compare_values(dv, value))
            .map(|ord| ord != Ordering::Less)
            .unwrap_or(false),
        Filter::LessThanEqual { field, value } => doc
            .get(field)
            .and_then(|dv| compare_values(dv, value))
            .map(|ord| ord != Ordering::Greater)
            .unwrap_or(false),
        Filter::Search { field, term } => doc
            .get(field)
            .and_then(Value::as_str)
            .map(|s| s.to_lowercase().contains(&term.to_lowercase()))
            .unwrap_or(false),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str, query: &Query) -> VeciResult<DocumentList> {
        let latency = self.latencies.get(collection).map(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_failure(collection)?;

        let mut matched: Vec<Value> = self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.filters.iter().all(|f| matches_filter(doc, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.sort {
            let (field, descending) = match sort {
                Sort::Asc(field) => (field, false),
                Sort::Desc(field) => (field, true),
            };
            matched.sort_by(|a, b| {
                let ord = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let total = matched.len() as u64;
        let documents: Vec<Value> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();

        Ok(DocumentList { documents, total })
    }

    async fn get(&self, collection: &str, id: &str) -> VeciResult<Value> {
        self.check_failure(collection)?;

        self.collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| doc_id(d) == Some(id)).cloned())
            .ok_or_else(|| VeciError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    async fn create(&self, collection: &str, id: Option<&str>, data: Value) -> VeciResult<Value> {
        self.check_failure(collection)?;

        let mut doc = data;
        let assigned = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();

        if let Some(map) = doc.as_object_mut() {
            map.insert("$id".to_string(), json!(assigned));
            map.entry("$createdAt".to_string())
                .or_insert_with(|| json!(now));
            map.insert("$updatedAt".to_string(), json!(now));
        } else {
            return Err(VeciError::Fetch(
                "document payload must be a JSON object".to_string(),
            ));
        }

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        self.emit(collection, StoreEventKind::Created, &assigned);

        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> VeciResult<Value> {
        self.check_failure(collection)?;

        let mut docs = self
            .collections
            .entry(collection.to_string())
            .or_default();
        let doc = docs
            .iter_mut()
            .find(|d| doc_id(d) == Some(id))
            .ok_or_else(|| VeciError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if let (Some(target), Some(changes)) = (doc.as_object_mut(), patch.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
            target.insert("$updatedAt".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let updated = doc.clone();
        drop(docs);
        self.emit(collection, StoreEventKind::Updated, id);

        Ok(updated)
    }

    async fn delete(&self, collection: &str, id: &str) -> VeciResult<()> {
        self.check_failure(collection)?;

        let removed = self
            .collections
            .entry(collection.to_string())
            .or_default()
            .iter()
            .position(|d| doc_id(d) == Some(id));

        match removed {
            Some(index) => {
                self.collections
                    .entry(collection.to_string())
                    .or_default()
                    .remove(index);
                self.emit(collection, StoreEventKind::Deleted, id);
                Ok(())
            }
            None => Err(VeciError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }

    fn subscribe(&self, collection: &str) -> Subscription {
        Subscription::new(collection, self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections;

    #[tokio::test]
    async fn test_list_with_range_and_equality_filters() {
        let store = MemoryStore::new();
        store.seed(
            collections::LOGS,
            vec![
                json!({"$id": "l1", "type": "view", "timestamp": "2026-08-01T10:00:00Z"}),
                json!({"$id": "l2", "type": "click", "timestamp": "2026-08-02T10:00:00Z"}),
                json!({"$id": "l3", "type": "view", "timestamp": "2026-08-10T10:00:00Z"}),
            ],
        );

        let query = Query::new()
            .limit(100)
            .equal("type", "view")
            .greater_than_equal("timestamp", "2026-08-01T00:00:00Z")
            .less_than_equal("timestamp", "2026-08-05T00:00:00Z");
        let result = store.list(collections::LOGS, &query).await.unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.documents[0]["$id"], "l1");
    }

    #[tokio::test]
    async fn test_in_filter_matches_tenant_set() {
        let store = MemoryStore::new();
        store.seed(
            collections::ADS,
            vec![
                json!({"$id": "a1", "residencial_id": "res-1"}),
                json!({"$id": "a2", "residencial_id": "res-2"}),
                json!({"$id": "a3", "residencial_id": "res-3"}),
            ],
        );

        let query = Query::new()
            .limit(100)
            .equal_any("residencial_id", vec![json!("res-1"), json!("res-3")]);
        let result = store.list(collections::ADS, &query).await.unwrap();

        assert_eq!(result.total, 2);
    }

    #[tokio::test]
    async fn test_sort_and_pagination() {
        let store = MemoryStore::new();
        store.seed(
            collections::ORDERS,
            vec![
                json!({"$id": "o1", "total": 300.0}),
                json!({"$id": "o2", "total": 100.0}),
                json!({"$id": "o3", "total": 200.0}),
            ],
        );

        let query = Query::new().limit(2).order_desc("total");
        let result = store.list(collections::ORDERS, &query).await.unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.documents.len(), 2);
        assert_eq!(result.documents[0]["$id"], "o1");
        assert_eq!(result.documents[1]["$id"], "o3");
    }

    #[tokio::test]
    async fn test_crud_round_trip_and_events() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe(collections::ADS);

        let created = store
            .create(collections::ADS, Some("ad-1"), json!({"activo": true}))
            .await
            .unwrap();
        assert_eq!(created["$id"], "ad-1");

        let event = subscription.next().await.unwrap();
        assert_eq!(event.kind, StoreEventKind::Created);
        assert_eq!(event.document_id, "ad-1");

        store
            .update(collections::ADS, "ad-1", json!({"activo": false}))
            .await
            .unwrap();
        let fetched = store.get(collections::ADS, "ad-1").await.unwrap();
        assert_eq!(fetched["activo"], false);

        store.delete(collections::ADS, "ad-1").await.unwrap();
        let missing = store.get(collections::ADS, "ad-1").await;
        assert!(matches!(missing, Err(VeciError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_collections() {
        let store = MemoryStore::new();
        let mut subscription = store.subscribe(collections::ADS);

        store
            .create(collections::ORDERS, Some("o-1"), json!({"total": 10}))
            .await
            .unwrap();
        store
            .create(collections::ADS, Some("ad-1"), json!({"activo": true}))
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.collection, collections::ADS);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.set_failure(collections::LOGS, "network unreachable");

        let result = store.list(collections::LOGS, &Query::new()).await;
        assert!(matches!(result, Err(VeciError::Fetch(_))));

        store.clear_failure(collections::LOGS);
        assert!(store.list(collections::LOGS, &Query::new()).await.is_ok());
    }
}
