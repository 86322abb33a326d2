use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument, warn};

use crate::application::ports::{CollectionStats, SearchResult, VectorStore, VectorStoreError};
use crate::domain::{Chunk, ChunkId, DocumentId, Embedding};

const DATABASE_FILE: &str = "vectors.db";

/// Embedded vector store: one SQLite file under the persist directory, chunks
/// stored with their embeddings as little-endian `f32` blobs, searched by
/// brute-force cosine similarity.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection_name: String,
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn open(
        persist_dir: &Path,
        collection_name: String,
    ) -> Result<Self, VectorStoreError> {
        std::fs::create_dir_all(persist_dir)
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;
        let db_path = persist_dir.join(DATABASE_FILE);

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        let store = Self {
            pool,
            collection_name,
            db_path,
        };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn init_schema(&self) -> Result<(), VectorStoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimensions INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                completed_at TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        // Databases written before builds were marked complete lack the column.
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('collections')")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;
        if !columns.iter().any(|c| c == "completed_at") {
            sqlx::query("ALTER TABLE collections ADD COLUMN completed_at TEXT")
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;
            info!("collections table migrated with completed_at column");
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                collection TEXT NOT NULL,
                chunk_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                page INTEGER,
                char_offset INTEGER NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, chunk_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| VectorStoreError::ConnectionFailed(e.to_string()))?;

        Ok(())
    }

    fn query_error(&self, e: sqlx::Error) -> VectorStoreError {
        VectorStoreError::classify(&self.collection_name, e.to_string(), VectorStoreError::QueryFailed)
    }

    async fn dimensions(&self) -> Result<usize, VectorStoreError> {
        self.collection_row().await.map(|(dimensions, _)| dimensions)
    }

    /// Dimension and completion flag of this store's collection row.
    async fn collection_row(&self) -> Result<(usize, bool), VectorStoreError> {
        let row = sqlx::query(
            "SELECT dimensions, completed_at IS NOT NULL AS complete FROM collections WHERE name = ?1",
        )
        .bind(&self.collection_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.query_error(e))?
        .ok_or_else(|| VectorStoreError::CollectionNotFound(self.collection_name.clone()))?;

        let dimensions: i64 = row.get("dimensions");
        let complete: i64 = row.get("complete");
        Ok((dimensions as usize, complete != 0))
    }

    fn row_to_chunk(row: &SqliteRow) -> Option<Chunk> {
        let chunk_id: String = row.get("chunk_id");
        let document_id: String = row.get("document_id");
        let page: Option<i64> = row.get("page");
        let offset: i64 = row.get("char_offset");

        Some(Chunk {
            id: ChunkId::parse(&chunk_id)?,
            text: row.get("content"),
            document_id: DocumentId::parse(&document_id)?,
            page: page.map(|p| p as u32),
            offset: offset as usize,
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn create_collection(&self, dimensions: usize) -> Result<bool, VectorStoreError> {
        self.init_schema().await?;

        let result = sqlx::query("INSERT OR IGNORE INTO collections (name, dimensions) VALUES (?1, ?2)")
            .bind(&self.collection_name)
            .bind(dimensions as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::CollectionCreationFailed(e.to_string()))?;

        let created = result.rows_affected() > 0;
        if created {
            info!(collection = %self.collection_name, dimensions, "collection_created");
            return Ok(true);
        }

        // A row without chunks, e.g. one whose chunks table was dropped, starts a new build.
        let reset = sqlx::query(
            "UPDATE collections SET completed_at = NULL, dimensions = ?2
             WHERE name = ?1
               AND NOT EXISTS (SELECT 1 FROM chunks WHERE collection = ?1)",
        )
        .bind(&self.collection_name)
        .bind(dimensions as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| VectorStoreError::CollectionCreationFailed(e.to_string()))?;

        if reset.rows_affected() > 0 {
            info!(collection = %self.collection_name, dimensions, "empty collection reset");
        } else {
            info!(collection = %self.collection_name, "collection already exists");
        }
        Ok(false)
    }

    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        let count: Result<i64, _> = sqlx::query_scalar("SELECT COUNT(*) FROM collections WHERE name = ?1")
            .bind(&self.collection_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                VectorStoreError::classify(&self.collection_name, e.to_string(), VectorStoreError::ConnectionFailed)
            });
        match count {
            Ok(count) => Ok(count > 0),
            Err(e) if e.is_collection_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn collection_stats(&self) -> Result<CollectionStats, VectorStoreError> {
        let (dimensions, complete) = self.collection_row().await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?1")
            .bind(&self.collection_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.query_error(e))?;

        Ok(CollectionStats {
            name: self.collection_name.clone(),
            total_chunks: total as usize,
            dimensions: Some(dimensions),
            complete,
        })
    }

    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn delete_collection(&self) -> Result<(), VectorStoreError> {
        // Recreates a table dropped underneath the store so both deletes can run.
        self.init_schema().await?;

        let deletion_failed = |e: sqlx::Error| {
            VectorStoreError::classify(
                &self.collection_name,
                e.to_string(),
                VectorStoreError::CollectionDeletionFailed,
            )
        };

        let removed = async {
            let mut tx = self.pool.begin().await.map_err(deletion_failed)?;
            sqlx::query("DELETE FROM chunks WHERE collection = ?1")
                .bind(&self.collection_name)
                .execute(&mut *tx)
                .await
                .map_err(deletion_failed)?;
            let removed = sqlx::query("DELETE FROM collections WHERE name = ?1")
                .bind(&self.collection_name)
                .execute(&mut *tx)
                .await
                .map_err(deletion_failed)?;
            tx.commit().await.map_err(deletion_failed)?;
            Ok::<_, VectorStoreError>(removed.rows_affected())
        }
        .await;

        match removed {
            Ok(0) => Ok(()),
            Ok(_) => {
                info!(collection = %self.collection_name, "collection_deleted");
                Ok(())
            }
            Err(e) if e.is_collection_not_found() => {
                warn!(collection = %self.collection_name, error = %e, "Collection already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn mark_complete(&self) -> Result<(), VectorStoreError> {
        let result = sqlx::query(
            "UPDATE collections SET completed_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE name = ?1",
        )
        .bind(&self.collection_name)
        .execute(&self.pool)
        .await
        .map_err(|e| self.query_error(e))?;

        if result.rows_affected() == 0 {
            return Err(VectorStoreError::CollectionNotFound(self.collection_name.clone()));
        }
        info!(collection = %self.collection_name, "collection_completed");
        Ok(())
    }

    #[instrument(skip(self, chunks, embeddings), fields(collection = %self.collection_name, count = chunks.len()))]
    async fn upsert(
        &self,
        chunks: &[Chunk],
        embeddings: &[Embedding],
    ) -> Result<(), VectorStoreError> {
        if chunks.len() != embeddings.len() {
            return Err(VectorStoreError::UpsertFailed(
                "chunks and embeddings count mismatch".to_string(),
            ));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let expected = self.dimensions().await?;
        if let Some(bad) = embeddings.iter().find(|e| e.dimensions() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: bad.dimensions(),
            });
        }

        let upsert_failed = |e: sqlx::Error| {
            VectorStoreError::classify(&self.collection_name, e.to_string(), VectorStoreError::UpsertFailed)
        };
        let mut tx = self.pool.begin().await.map_err(upsert_failed)?;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            sqlx::query(
                "INSERT OR REPLACE INTO chunks
                    (collection, chunk_id, document_id, page, char_offset, content, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&self.collection_name)
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(chunk.page.map(i64::from))
            .bind(chunk.offset as i64)
            .bind(&chunk.text)
            .bind(embedding.to_le_bytes())
            .execute(&mut *tx)
            .await
            .map_err(upsert_failed)?;
        }

        tx.commit().await.map_err(upsert_failed)?;

        info!(collection = %self.collection_name, count = chunks.len(), "points_upserted");
        Ok(())
    }

    #[instrument(skip(self, embedding), fields(collection = %self.collection_name, top_k = top_k))]
    async fn search(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, VectorStoreError> {
        let expected = self.dimensions().await?;
        if embedding.dimensions() != expected {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: embedding.dimensions(),
            });
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, document_id, page, char_offset, content, embedding
             FROM chunks
             WHERE collection = ?1",
        )
        .bind(&self.collection_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            VectorStoreError::classify(&self.collection_name, e.to_string(), VectorStoreError::SearchFailed)
        })?;

        let mut scored: Vec<SearchResult> = rows
            .iter()
            .filter_map(|row| {
                let Some(chunk) = Self::row_to_chunk(row) else {
                    warn!("Skipping stored chunk with malformed identifiers");
                    return None;
                };
                let bytes: Vec<u8> = row.get("embedding");
                let stored = Embedding::from_le_bytes(&bytes);
                Some(SearchResult {
                    score: embedding.cosine_similarity(&stored),
                    chunk,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);

        Ok(scored)
    }

    #[instrument(skip(self), fields(collection = %self.collection_name))]
    async fn peek(&self, limit: usize) -> Result<Vec<Chunk>, VectorStoreError> {
        self.dimensions().await?;

        let rows = sqlx::query(
            "SELECT chunk_id, document_id, page, char_offset, content
             FROM chunks
             WHERE collection = ?1
             ORDER BY page, char_offset
             LIMIT ?2",
        )
        .bind(&self.collection_name)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.query_error(e))?;

        Ok(rows.iter().filter_map(Self::row_to_chunk).collect())
    }
}
