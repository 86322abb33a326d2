mod sqlite_vector_store;

pub use sqlite_vector_store::SqliteVectorStore;
