use std::path::{Path, PathBuf};
use std::sync::Arc;

use docqa::application::ports::{EmbedderError, FileLoaderError, VectorStore, VectorStoreError};
use docqa::application::services::{IndexingError, IndexingService};
use docqa::domain::{Chunk, DocumentId, Embedding};
use docqa::infrastructure::persistence::SqliteVectorStore;
use docqa::infrastructure::text_processing::{CompositeFileLoader, FixedSizeSplitter};
use tempfile::TempDir;

use crate::helpers::{FlakyEmbedder, HASH_DIMENSIONS, HashEmbedder};

const DOCUMENT: &str = "Solar panels convert sunlight into electricity using photovoltaic cells.
Wind turbines capture kinetic energy from moving air.
Batteries store surplus energy for use at night.";

type Service = IndexingService<CompositeFileLoader, SqliteVectorStore, FixedSizeSplitter>;

async fn setup(dir: &TempDir, batch_size: usize) -> (Service, Arc<SqliteVectorStore>) {
    let store = Arc::new(
        SqliteVectorStore::open(&dir.path().join("db"), "docs".to_string())
            .await
            .unwrap(),
    );
    let service = IndexingService::new(
        Arc::new(CompositeFileLoader::default()),
        Arc::new(HashEmbedder::new()),
        store.clone(),
        Arc::new(FixedSizeSplitter::new(40, 5)),
        batch_size,
    );
    (service, store)
}

fn write_document(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn given_text_document_when_indexing_then_stores_every_chunk_in_batches() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 2).await;
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    let report = service.index_file(&path).await.unwrap();

    let stats = store.collection_stats().await.unwrap();
    assert_eq!(report.document, "energy.txt");
    assert_eq!(report.pages, 1);
    assert!(report.chunks > 2);
    assert_eq!(report.dimensions, HASH_DIMENSIONS);
    assert_eq!(stats.total_chunks, report.chunks);
    assert_eq!(stats.dimensions, Some(HASH_DIMENSIONS));
    assert!(stats.complete);
}

#[tokio::test]
async fn given_missing_file_when_indexing_then_returns_document_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = setup(&dir, 8).await;

    let result = service.index_file(Path::new("/nonexistent/doc.pdf")).await;

    assert!(matches!(result, Err(IndexingError::DocumentNotFound(_))));
}

#[tokio::test]
async fn given_unsupported_extension_when_indexing_then_returns_unsupported_document() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = setup(&dir, 8).await;
    let path = write_document(&dir, "image.png", "not really an image");

    let result = service.index_file(&path).await;

    assert!(matches!(result, Err(IndexingError::UnsupportedDocument(_))));
}

#[tokio::test]
async fn given_blank_document_when_indexing_then_returns_file_loading_error() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 8).await;
    let path = write_document(&dir, "blank.txt", "   \n\n  ");

    let result = service.index_file(&path).await;

    assert!(matches!(
        result,
        Err(IndexingError::FileLoading(FileLoaderError::NoTextFound(_)))
    ));
    assert!(!store.collection_exists().await.unwrap());
}

#[tokio::test]
async fn given_empty_collection_with_other_dimension_when_indexing_then_recreates_it() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 8).await;
    store.create_collection(3).await.unwrap();
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    service.index_file(&path).await.unwrap();

    let stats = store.collection_stats().await.unwrap();
    assert_eq!(stats.dimensions, Some(HASH_DIMENSIONS));
    assert!(stats.total_chunks > 0);
}

#[tokio::test]
async fn given_populated_collection_with_other_dimension_when_indexing_then_returns_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 8).await;
    store.create_collection(3).await.unwrap();
    store
        .upsert(
            &[Chunk::new("old".to_string(), DocumentId::new(), Some(1), 0)],
            &[Embedding::new(vec![1.0, 0.0, 0.0])],
        )
        .await
        .unwrap();
    store.mark_complete().await.unwrap();
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    let result = service.index_file(&path).await;

    assert!(matches!(
        result,
        Err(IndexingError::Storage(VectorStoreError::DimensionMismatch {
            expected: 3,
            actual: HASH_DIMENSIONS
        }))
    ));
    assert_eq!(store.collection_stats().await.unwrap().total_chunks, 1);
}

#[tokio::test]
async fn given_chunks_from_interrupted_build_when_indexing_then_discards_them() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 8).await;
    store.create_collection(HASH_DIMENSIONS).await.unwrap();
    store
        .upsert(
            &[Chunk::new("stale".to_string(), DocumentId::new(), Some(9), 0)],
            &[HashEmbedder::new().vector("stale")],
        )
        .await
        .unwrap();
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    let report = service.index_file(&path).await.unwrap();

    let stats = store.collection_stats().await.unwrap();
    assert_eq!(stats.total_chunks, report.chunks);
    assert!(stats.complete);
    assert!(store.peek(100).await.unwrap().iter().all(|c| c.page == Some(1)));
}

#[tokio::test]
async fn given_embedder_failing_mid_build_when_indexing_then_collection_stays_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(
        SqliteVectorStore::open(&dir.path().join("db"), "docs".to_string())
            .await
            .unwrap(),
    );
    let service = IndexingService::new(
        Arc::new(CompositeFileLoader::default()),
        Arc::new(FlakyEmbedder::failing_on_batch(2)),
        store.clone(),
        Arc::new(FixedSizeSplitter::new(40, 5)),
        2,
    );
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    let result = service.index_file(&path).await;

    assert!(matches!(
        result,
        Err(IndexingError::Embedding(EmbedderError::RateLimited))
    ));
    let stats = store.collection_stats().await.unwrap();
    assert_eq!(stats.total_chunks, 2);
    assert!(!stats.complete);
}

#[tokio::test]
async fn given_document_when_extracting_then_does_not_touch_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let (service, store) = setup(&dir, 8).await;
    let path = write_document(&dir, "energy.txt", DOCUMENT);

    let (document, pages) = service.extract(&path).await.unwrap();

    assert_eq!(document.filename, "energy.txt");
    assert_eq!(pages.len(), 1);
    assert!(!store.collection_exists().await.unwrap());
}
