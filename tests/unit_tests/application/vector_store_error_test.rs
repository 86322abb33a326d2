use docqa::application::ports::VectorStoreError;

#[test]
fn given_missing_table_message_when_classifying_then_returns_collection_not_found() {
    let error = VectorStoreError::classify(
        "docs",
        "error returned from database: (code: 1) no such table: chunks",
        VectorStoreError::SearchFailed,
    );

    assert!(matches!(error, VectorStoreError::CollectionNotFound(ref name) if name == "docs"));
}

#[test]
fn given_does_not_exist_message_in_any_case_when_classifying_then_returns_collection_not_found() {
    let error = VectorStoreError::classify(
        "docs",
        "Collection docs Does Not Exist",
        VectorStoreError::QueryFailed,
    );

    assert!(error.is_collection_not_found());
}

#[test]
fn given_unrelated_message_when_classifying_then_wraps_it_with_fallback() {
    let error = VectorStoreError::classify(
        "docs",
        "disk I/O error",
        VectorStoreError::UpsertFailed,
    );

    assert!(matches!(error, VectorStoreError::UpsertFailed(ref message) if message == "disk I/O error"));
    assert!(!error.is_collection_not_found());
}

#[test]
fn given_connection_fallback_when_classifying_locked_database_then_keeps_connection_failed() {
    let error = VectorStoreError::classify(
        "docs",
        "database is locked",
        VectorStoreError::ConnectionFailed,
    );

    assert!(matches!(error, VectorStoreError::ConnectionFailed(_)));
}
