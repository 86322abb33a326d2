use docqa::domain::Embedding;

#[test]
fn given_identical_vectors_when_computing_similarity_then_returns_one() {
    let a = Embedding::new(vec![1.0, 2.0, 3.0]);

    assert!((a.cosine_similarity(&a.clone()) - 1.0).abs() < 1e-6);
}

#[test]
fn given_orthogonal_vectors_when_computing_similarity_then_returns_zero() {
    let a = Embedding::new(vec![1.0, 0.0]);
    let b = Embedding::new(vec![0.0, 1.0]);

    assert!(a.cosine_similarity(&b).abs() < 1e-6);
}

#[test]
fn given_mismatched_or_zero_vectors_when_computing_similarity_then_returns_zero() {
    let a = Embedding::new(vec![1.0, 0.0]);
    let b = Embedding::new(vec![1.0, 0.0, 0.0]);
    let zero = Embedding::new(vec![0.0, 0.0]);

    assert_eq!(a.cosine_similarity(&b), 0.0);
    assert_eq!(a.cosine_similarity(&zero), 0.0);
}

#[test]
fn given_embedding_when_encoded_to_bytes_then_decodes_to_same_values() {
    let embedding = Embedding::new(vec![0.25, -1.5, 3.0]);

    let bytes = embedding.to_le_bytes();

    assert_eq!(bytes.len(), 12);
    assert_eq!(Embedding::from_le_bytes(&bytes), embedding);
}
