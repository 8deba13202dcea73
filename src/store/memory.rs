//! In-process document store.
//!
//! Keeps a local replica of each collection that best-available reads are served from
//! while the store is offline. Fault switches let callers exercise every failure path.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RemoteStore;
use crate::errors::StoreError;
use crate::models::{Document, Fields, ReadSource};

#[derive(Default)]
struct Collections {
    live: HashMap<String, Vec<Document>>,
    replica: HashMap<String, Vec<Document>>,
    identity: Option<String>,
}

/// Document store held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
    offline: AtomicBool,
    fail_server_reads: AtomicBool,
    deny_reads: AtomicBool,
    deny_writes: AtomicBool,
    deny_auth: AtomicBool,
    latency: Mutex<Duration>,
    list_delays: Mutex<VecDeque<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server reads and writes fail; best-available reads use the replica.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Server-authoritative reads fail; best-available reads and writes still work.
    pub fn set_fail_server_reads(&self, fail: bool) {
        self.fail_server_reads.store(fail, Ordering::SeqCst);
    }

    /// Reject every read in both consistency modes.
    pub fn set_deny_reads(&self, deny: bool) {
        self.deny_reads.store(deny, Ordering::SeqCst);
    }

    pub fn set_deny_writes(&self, deny: bool) {
        self.deny_writes.store(deny, Ordering::SeqCst);
    }

    pub fn set_deny_auth(&self, deny: bool) {
        self.deny_auth.store(deny, Ordering::SeqCst);
    }

    /// Delay applied to every call.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Hold back the response of the next list call after its data has been read.
    ///
    /// Queued delays are consumed in order, one per list call.
    pub fn delay_next_list(&self, delay: Duration) {
        if let Ok(mut guard) = self.list_delays.lock() {
            guard.push_back(delay);
        }
    }

    /// Store a document verbatim, bypassing the write path.
    pub async fn insert_document(&self, collection: &str, document: Document) {
        let mut data = self.data.write().await;
        data.live
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Live documents of a collection.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let data = self.data.read().await;
        data.live.get(collection).cloned().unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        let latency = self.latency.lock().map(|g| *g).unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    async fn read_collection(
        &self,
        collection: &str,
        source: ReadSource,
    ) -> Result<Vec<Document>, StoreError> {
        if self.deny_reads.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(format!(
                "reads of {} are not permitted",
                collection
            )));
        }

        if source == ReadSource::Server && self.fail_server_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("server did not answer".to_string()));
        }

        if self.offline.load(Ordering::SeqCst) {
            return match source {
                ReadSource::Server => Err(StoreError::Unavailable("store is offline".to_string())),
                ReadSource::Default => {
                    let data = self.data.read().await;
                    data.replica.get(collection).cloned().ok_or_else(|| {
                        StoreError::Unavailable(format!("no local replica of {}", collection))
                    })
                }
            };
        }

        let mut data = self.data.write().await;
        let documents = data.live.get(collection).cloned().unwrap_or_default();
        data.replica
            .insert(collection.to_string(), documents.clone());
        Ok(documents)
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        if self.deny_writes.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(
                "writes are not permitted".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn current_identity(&self) -> Option<String> {
        self.simulate_latency().await;
        self.data.read().await.identity.clone()
    }

    async fn authenticate_anonymously(&self) -> Result<String, StoreError> {
        self.simulate_latency().await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        if self.deny_auth.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied(
                "anonymous sign-in is disabled".to_string(),
            ));
        }

        let identity = uuid::Uuid::new_v4().to_string();
        self.data.write().await.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn list_documents(
        &self,
        collection: &str,
        source: ReadSource,
    ) -> Result<Vec<Document>, StoreError> {
        self.simulate_latency().await;

        let result = self.read_collection(collection, source).await;

        let response_delay = self
            .list_delays
            .lock()
            .ok()
            .and_then(|mut g| g.pop_front());
        if let Some(delay) = response_delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.simulate_latency().await;
        self.ensure_writable()?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut data = self.data.write().await;
        data.live
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.ensure_writable()?;

        let mut data = self.data.write().await;
        let document = data
            .live
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound(format!("Document {} not found", id)))?;
        document.fields.extend(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => Fields::new(),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let store = MemoryStore::new();
        let id = store
            .add_document("spots", fields(json!({ "spotName": "Library" })))
            .await
            .unwrap();

        let docs = store.list_documents("spots", ReadSource::Server).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, id);
        assert!(store
            .list_documents("other", ReadSource::Server)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let id = store
            .add_document(
                "spots",
                fields(json!({ "spotName": "Library", "currentStatus": "Empty" })),
            )
            .await
            .unwrap();
        store
            .update_document("spots", &id, fields(json!({ "currentStatus": "Packed" })))
            .await
            .unwrap();

        let docs = store.documents("spots").await;
        assert_eq!(docs[0].fields["spotName"], "Library");
        assert_eq!(docs[0].fields["currentStatus"], "Packed");
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_document("spots", "nope", Fields::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_offline_default_read_uses_replica() {
        let store = MemoryStore::new();
        store
            .add_document("spots", fields(json!({ "spotName": "Library" })))
            .await
            .unwrap();

        store.set_offline(true);
        assert!(store
            .list_documents("spots", ReadSource::Default)
            .await
            .is_err());

        store.set_offline(false);
        store.list_documents("spots", ReadSource::Server).await.unwrap();
        store.set_offline(true);

        assert!(matches!(
            store.list_documents("spots", ReadSource::Server).await,
            Err(StoreError::Unavailable(_))
        ));
        let cached = store
            .list_documents("spots", ReadSource::Default)
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_failing_server_reads_leave_default_reads() {
        let store = MemoryStore::new();
        store.set_fail_server_reads(true);
        assert!(matches!(
            store.list_documents("spots", ReadSource::Server).await,
            Err(StoreError::Unavailable(_))
        ));
        store
            .add_document("spots", fields(json!({ "spotName": "Library" })))
            .await
            .unwrap();
        let docs = store.list_documents("spots", ReadSource::Default).await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_identity_is_kept() {
        let store = MemoryStore::new();
        assert!(store.current_identity().await.is_none());
        let identity = store.authenticate_anonymously().await.unwrap();
        assert_eq!(store.current_identity().await, Some(identity));

        store.set_deny_auth(true);
        assert!(store.authenticate_anonymously().await.is_err());
    }
}
