//! Remote document store contract and its implementations.
//!
//! The repository only talks to the store through [`RemoteStore`], so the concrete
//! backend can be swapped without touching the spot logic.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{init_database, SqliteStore};

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{Document, Fields, ReadSource};

/// Collection-scoped document store with anonymous identities.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Identity established for this client, if any.
    async fn current_identity(&self) -> Option<String>;

    /// Obtain a fresh anonymous identity and make it current.
    async fn authenticate_anonymously(&self) -> Result<String, StoreError>;

    /// Read every document in `collection`.
    async fn list_documents(
        &self,
        collection: &str,
        source: ReadSource,
    ) -> Result<Vec<Document>, StoreError>;

    /// Insert a document and return its store-assigned id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when the document does not exist.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;
}
