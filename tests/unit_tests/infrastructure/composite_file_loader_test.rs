use docqa::application::ports::{FileLoader, FileLoaderError};
use docqa::domain::{ContentType, Document};
use docqa::infrastructure::text_processing::CompositeFileLoader;

#[tokio::test]
async fn given_text_document_when_extracting_then_routes_to_text_adapter() {
    let loader = CompositeFileLoader::default();
    let document = Document::new("notes.md".to_string(), ContentType::Text, 5);

    let pages = loader.extract_pages(b"hello", &document).await.unwrap();

    assert_eq!(pages[0].text, "hello");
}

#[tokio::test]
async fn given_unregistered_content_type_when_extracting_then_returns_unsupported() {
    let loader = CompositeFileLoader::new(Vec::new());
    let document = Document::new("notes.txt".to_string(), ContentType::Text, 5);

    let result = loader.extract_pages(b"hello", &document).await;

    assert!(matches!(
        result,
        Err(FileLoaderError::UnsupportedContentType(ref mime)) if mime == "text/plain"
    ));
}
