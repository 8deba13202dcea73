//! SQLite-backed document store.
//!
//! Documents are stored as JSON field maps keyed by `(collection, id)`. The database is
//! local, so both read sources are served from the same table.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::RwLock;

use super::RemoteStore;
use crate::errors::StoreError;
use crate::models::{Document, Fields, ReadSource};

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            fields TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);")
        .execute(pool)
        .await?;

    Ok(())
}

/// Document store persisted in a local SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
    identity: RwLock<Option<String>>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            identity: RwLock::new(None),
        }
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn current_identity(&self) -> Option<String> {
        self.identity.read().await.clone()
    }

    async fn authenticate_anonymously(&self) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO sessions (id, created_at) VALUES (?, ?)")
            .bind(&id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        *self.identity.write().await = Some(id.clone());
        Ok(id)
    }

    async fn list_documents(
        &self,
        collection: &str,
        source: ReadSource,
    ) -> Result<Vec<Document>, StoreError> {
        tracing::trace!(collection, source = source.as_str(), "Listing documents");

        let rows = sqlx::query("SELECT id, fields FROM documents WHERE collection = ? ORDER BY rowid")
            .bind(collection)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(document_from_row).collect())
    }

    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now().to_rfc3339();
        let fields_json = serde_json::to_string(&fields)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, fields, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(&id)
        .bind(&fields_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT fields FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Document {} not found", id)))?;

        let existing: String = row.get("fields");
        let mut merged: Fields = serde_json::from_str(&existing)?;
        merged.extend(fields);

        sqlx::query("UPDATE documents SET fields = ?, updated_at = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&merged)?)
            .bind(Utc::now().to_rfc3339())
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Option<Document> {
    let id: String = row.get("id");
    let raw: String = row.get("fields");
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(fields)) => Some(Document::new(id, fields)),
        _ => {
            tracing::warn!("Skipping document {} with unreadable fields", id);
            None
        }
    }
}
