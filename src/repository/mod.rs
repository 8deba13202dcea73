//! Spot repository.
//!
//! The only component that talks to the remote store. Every call is bounded by a
//! timeout, documents are normalized into [`StudySpot`] records, and each operation
//! comes in two forms: a `try_` variant returning the classified [`StoreError`], and a
//! collapsed variant (`bool` or empty list) for callers that only need success/failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::errors::StoreError;
use crate::models::{new_spot_fields, status_update_fields, Document, ReadSource, StudySpot};
use crate::store::RemoteStore;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Repository for study spot documents in a single collection.
#[derive(Clone)]
pub struct SpotRepository {
    store: Arc<dyn RemoteStore>,
    collection: String,
    timeout: Duration,
    seed_spot_name: Option<String>,
}

impl SpotRepository {
    pub fn new(store: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            timeout: DEFAULT_TIMEOUT,
            seed_spot_name: None,
        }
    }

    /// Bound every remote call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Write a spot with this name when an authoritative read finds no documents.
    pub fn with_seed_spot(mut self, name: Option<String>) -> Self {
        self.seed_spot_name = name;
        self
    }

    async fn call<T>(
        &self,
        operation: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, operation).await?
    }

    /// Make sure the store knows who we are.
    ///
    /// Returns `true` immediately when an identity already exists. The lookup and the
    /// sign-in are both bounded by the timeout. A failure is logged and reported as
    /// `false`; callers continue unauthenticated.
    pub async fn ensure_identity(&self) -> bool {
        let current = self
            .call(async { Ok(self.store.current_identity().await) })
            .await;
        match current {
            Ok(Some(identity)) => {
                tracing::debug!("Already signed in as {}", identity);
                return true;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Identity lookup failed: {}", e),
        }

        match self.call(self.store.authenticate_anonymously()).await {
            Ok(identity) => {
                tracing::info!("Signed in anonymously as {}", identity);
                true
            }
            Err(e) => {
                tracing::warn!("Anonymous sign-in failed: {}", e);
                false
            }
        }
    }

    // ==================== LIST ====================

    /// List every spot, preferring a server-authoritative read.
    ///
    /// Falls back to a best-available read when the authoritative one fails. Errors only
    /// when both reads fail. Documents that cannot be normalized are dropped.
    pub async fn try_list_spots(&self) -> Result<Vec<StudySpot>, StoreError> {
        let server_read = self
            .call(self.store.list_documents(&self.collection, ReadSource::Server))
            .await;

        let documents = match server_read {
            Ok(documents) => {
                if documents.is_empty() {
                    tracing::warn!("Collection {} returned no documents", self.collection);
                    self.seed_empty_collection().await;
                }
                documents
            }
            Err(e) => {
                tracing::warn!("Server read of {} failed: {}", self.collection, e);
                tracing::debug!("Falling back to best-available read");
                self.call(self.store.list_documents(&self.collection, ReadSource::Default))
                    .await?
            }
        };

        let spots = normalize_documents(&documents);
        tracing::debug!(
            "Fetched {} study spots ({} documents)",
            spots.len(),
            documents.len()
        );
        Ok(spots)
    }

    /// List every spot; an unreadable collection yields an empty list.
    pub async fn list_spots(&self) -> Vec<StudySpot> {
        self.try_list_spots().await.unwrap_or_else(|e| {
            tracing::error!("Failed to list study spots: {}", e);
            Vec::new()
        })
    }

    async fn seed_empty_collection(&self) {
        let Some(name) = self.seed_spot_name.as_deref() else {
            return;
        };

        match self.try_create_spot(name).await {
            Ok(id) => tracing::info!("Seeded empty collection with {} ({})", name, id),
            Err(e) => tracing::error!("Failed to seed empty collection: {}", e),
        }
    }

    // ==================== WRITES ====================

    /// Create a spot named `name` with status Empty; returns the new id.
    pub async fn try_create_spot(&self, name: &str) -> Result<String, StoreError> {
        let fields = new_spot_fields(name, Utc::now());
        let id = self
            .call(self.store.add_document(&self.collection, fields))
            .await?;
        tracing::info!("Created study spot {} with id {}", name, id);
        Ok(id)
    }

    pub async fn create_spot(&self, name: &str) -> bool {
        match self.try_create_spot(name).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to create study spot {}: {}", name, e);
                false
            }
        }
    }

    /// Write `status` and a fresh timestamp to the spot `id`.
    ///
    /// The status is not checked against the known labels. A missing document is
    /// reported by the store as [`StoreError::NotFound`].
    pub async fn try_update_status(&self, id: &str, status: &str) -> Result<(), StoreError> {
        let fields = status_update_fields(status, Utc::now());
        self.call(self.store.update_document(&self.collection, id, fields))
            .await?;
        tracing::info!("Updated study spot {} to {:?}", id, status);
        Ok(())
    }

    pub async fn update_status(&self, id: &str, status: &str) -> bool {
        match self.try_update_status(id, status).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to update study spot {}: {}", id, e);
                false
            }
        }
    }
}

fn normalize_documents(documents: &[Document]) -> Vec<StudySpot> {
    documents
        .iter()
        .filter_map(|document| match StudySpot::from_document(document) {
            Ok(spot) => Some(spot),
            Err(e) => {
                tracing::warn!("Dropping document {:?}: {}", document.id, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SpotStatus, STATUS_UNKNOWN};
    use crate::store::MemoryStore;
    use serde_json::{json, Value};

    const COLLECTION: &str = "study_spots";

    fn setup() -> (Arc<MemoryStore>, SpotRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = SpotRepository::new(store.clone(), COLLECTION);
        (store, repo)
    }

    fn document(id: &str, fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new(id, map),
            _ => Document::new(id, Default::default()),
        }
    }

    #[tokio::test]
    async fn test_ensure_identity_is_idempotent() {
        let (store, repo) = setup();
        assert!(repo.ensure_identity().await);
        let first = store.current_identity().await;

        // Already identified: no new sign-in even when sign-in would now fail
        store.set_deny_auth(true);
        assert!(repo.ensure_identity().await);
        assert_eq!(store.current_identity().await, first);
    }

    #[tokio::test]
    async fn test_ensure_identity_failure_is_false() {
        let (store, repo) = setup();
        store.set_deny_auth(true);
        assert!(!repo.ensure_identity().await);
    }

    #[tokio::test]
    async fn test_create_then_list_includes_new_spot() {
        let (_store, repo) = setup();
        assert!(repo.create_spot("Cafe").await);
        let before = repo.list_spots().await;

        assert!(repo.create_spot("Library").await);
        let after = repo.list_spots().await;

        assert_eq!(after.len(), before.len() + 1);
        let library: Vec<_> = after.iter().filter(|s| s.spot_name == "Library").collect();
        assert_eq!(library.len(), 1);
        assert_eq!(library[0].status(), Some(SpotStatus::Empty));
        assert!(library[0].last_updated.is_some());
        assert!(!library[0].id.is_empty());
    }

    #[tokio::test]
    async fn test_update_status_changes_status_and_timestamp() {
        let (_store, repo) = setup();
        let id = repo.try_create_spot("Library").await.unwrap();
        let created = repo.list_spots().await[0].last_updated.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(repo.update_status(&id, "Packed").await);

        let spots = repo.list_spots().await;
        assert_eq!(spots[0].current_status, "Packed");
        assert!(spots[0].last_updated.unwrap() > created);
    }

    #[tokio::test]
    async fn test_update_missing_spot_fails() {
        let (_store, repo) = setup();
        assert!(!repo.update_status("does-not-exist", "Packed").await);
        assert!(matches!(
            repo.try_update_status("does-not-exist", "Packed").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(repo.list_spots().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_accepts_unknown_status_label() {
        let (_store, repo) = setup();
        let id = repo.try_create_spot("Library").await.unwrap();
        assert!(repo.update_status(&id, "Closed for exams").await);
        assert_eq!(repo.list_spots().await[0].current_status, "Closed for exams");
    }

    #[tokio::test]
    async fn test_list_normalizes_and_drops_bad_documents() {
        let (store, repo) = setup();
        store
            .insert_document(COLLECTION, document("no-name", json!({ "currentStatus": "Packed" })))
            .await;
        store
            .insert_document(COLLECTION, document("no-status", json!({ "spotName": "Quad" })))
            .await;
        store
            .insert_document(COLLECTION, document("bad-name", json!({ "spotName": 7 })))
            .await;
        store
            .insert_document(COLLECTION, document("", json!({ "spotName": "Ghost" })))
            .await;

        let spots = repo.list_spots().await;
        assert_eq!(spots.len(), 2);
        assert_eq!(spots[0].id, "no-name");
        assert_eq!(spots[0].spot_name, "");
        assert_eq!(spots[1].id, "no-status");
        assert_eq!(spots[1].current_status, STATUS_UNKNOWN);
        assert!(spots.iter().all(|s| !s.id.is_empty()));
    }

    #[tokio::test]
    async fn test_list_falls_back_to_replica() {
        let (store, repo) = setup();
        repo.create_spot("Library").await;
        assert_eq!(repo.list_spots().await.len(), 1);

        store.set_offline(true);
        let spots = repo.try_list_spots().await.unwrap();
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].spot_name, "Library");
    }

    #[tokio::test]
    async fn test_list_failure_in_both_modes_is_empty() {
        let (store, repo) = setup();
        repo.create_spot("Library").await;
        store.set_deny_reads(true);

        assert!(repo.list_spots().await.is_empty());
        assert!(matches!(
            repo.try_list_spots().await,
            Err(StoreError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_false() {
        let (store, repo) = setup();
        store.set_deny_writes(true);
        assert!(!repo.create_spot("Library").await);

        store.set_deny_writes(false);
        let id = repo.try_create_spot("Library").await.unwrap();
        store.set_offline(true);
        assert!(!repo.update_status(&id, "Packed").await);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let (store, repo) = setup();
        let repo = repo.with_timeout(Duration::from_millis(20));
        store.set_latency(Duration::from_millis(500));

        assert!(matches!(
            repo.try_create_spot("Library").await,
            Err(StoreError::Timeout)
        ));
        assert!(matches!(repo.try_list_spots().await, Err(StoreError::Timeout)));
        assert!(repo.list_spots().await.is_empty());
        assert!(!repo.ensure_identity().await);
    }

    #[tokio::test]
    async fn test_identity_lookup_is_bounded_by_timeout() {
        let (store, repo) = setup();
        assert!(repo.ensure_identity().await);

        let repo = repo.with_timeout(Duration::from_millis(20));
        store.set_latency(Duration::from_millis(500));
        let started = std::time::Instant::now();
        assert!(!repo.ensure_identity().await);
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_seed_on_empty_collection() {
        let (store, repo) = setup();
        let repo = repo.with_seed_spot(Some("Library".to_string()));

        // The seeded spot shows up on the following read
        assert!(repo.list_spots().await.is_empty());
        let spots = repo.list_spots().await;
        assert_eq!(spots.len(), 1);
        assert_eq!(spots[0].spot_name, "Library");
        assert_eq!(spots[0].status(), Some(SpotStatus::Empty));

        repo.list_spots().await;
        assert_eq!(store.documents(COLLECTION).await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_seed_when_server_read_fails() {
        let (store, repo) = setup();
        let repo = repo.with_seed_spot(Some("Library".to_string()));
        store.set_fail_server_reads(true);

        // The fallback read is empty but not authoritative
        let spots = repo.try_list_spots().await.unwrap();
        assert!(spots.is_empty());
        assert!(store.documents(COLLECTION).await.is_empty());

        store.set_fail_server_reads(false);
        assert!(repo.list_spots().await.is_empty());
        assert_eq!(store.documents(COLLECTION).await.len(), 1);
    }

    #[tokio::test]
    async fn test_no_seed_by_default() {
        let (store, repo) = setup();
        assert!(repo.list_spots().await.is_empty());
        assert!(store.documents(COLLECTION).await.is_empty());
    }
}
