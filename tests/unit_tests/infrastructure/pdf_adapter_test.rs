use std::time::Duration;

use docqa::application::ports::{FileLoader, FileLoaderError};
use docqa::domain::{ContentType, Document};
use docqa::infrastructure::text_processing::PdfAdapter;

#[tokio::test]
async fn given_bytes_that_are_not_a_pdf_when_extracting_then_returns_extraction_failed() {
    let adapter = PdfAdapter::with_timeout(Duration::from_secs(5));
    let data = b"definitely not a pdf";
    let document = Document::new("fake.pdf".to_string(), ContentType::Pdf, data.len() as u64);

    let result = adapter.extract_pages(data, &document).await;

    assert!(matches!(result, Err(FileLoaderError::ExtractionFailed(_))));
}

#[tokio::test]
async fn given_text_document_when_extracting_then_returns_unsupported() {
    let adapter = PdfAdapter::new();
    let document = Document::new("notes.txt".to_string(), ContentType::Text, 4);

    let result = adapter.extract_pages(b"text", &document).await;

    assert!(matches!(
        result,
        Err(FileLoaderError::UnsupportedContentType(_))
    ));
}

#[tokio::test]
#[ignore = "requires a sample PDF at tests/fixtures/sample.pdf"]
async fn given_sample_pdf_when_extracting_then_returns_numbered_pages() {
    let data = std::fs::read("tests/fixtures/sample.pdf").unwrap();
    let document = Document::new("sample.pdf".to_string(), ContentType::Pdf, data.len() as u64);

    let pages = PdfAdapter::new().extract_pages(&data, &document).await.unwrap();

    assert!(!pages.is_empty());
    assert!(pages.windows(2).all(|w| w[0].number < w[1].number));
    assert!(pages.iter().all(|p| !p.text.trim().is_empty()));
}
