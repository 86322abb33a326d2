use docqa::application::ports::{TextSplitter, TextSplitterError};
use docqa::domain::{DocumentId, Page};
use docqa::infrastructure::text_processing::FixedSizeSplitter;

#[tokio::test]
async fn given_overlap_when_splitting_then_windows_advance_by_size_minus_overlap() {
    let splitter = FixedSizeSplitter::new(4, 1);
    let pages = vec![Page::new(1, "abcdefghij")];

    let chunks = splitter.split(&pages, DocumentId::new()).await.unwrap();

    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    let offsets: Vec<usize> = chunks.iter().map(|c| c.offset).collect();
    assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
    assert_eq!(offsets, vec![0, 3, 6]);
}

#[tokio::test]
async fn given_multiple_pages_when_splitting_then_chunks_keep_their_page_numbers() {
    let splitter = FixedSizeSplitter::new(100, 10);
    let pages = vec![Page::new(1, "first page"), Page::new(4, "fourth page")];
    let document_id = DocumentId::new();

    let chunks = splitter.split(&pages, document_id).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].page, Some(1));
    assert_eq!(chunks[1].page, Some(4));
    assert!(chunks.iter().all(|c| c.document_id == document_id));
}

#[tokio::test]
async fn given_multibyte_text_when_splitting_then_splits_on_char_boundaries() {
    let splitter = FixedSizeSplitter::new(3, 0);
    let pages = vec![Page::new(1, "ééééé")];

    let chunks = splitter.split(&pages, DocumentId::new()).await.unwrap();

    assert_eq!(chunks[0].text, "ééé");
    assert_eq!(chunks[1].text, "éé");
}

#[tokio::test]
async fn given_whitespace_window_when_splitting_then_skips_it() {
    let splitter = FixedSizeSplitter::new(3, 0);
    let pages = vec![Page::new(1, "abc   def")];

    let chunks = splitter.split(&pages, DocumentId::new()).await.unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].offset, 6);
}

#[tokio::test]
async fn given_zero_chunk_size_when_splitting_then_returns_invalid_parameters() {
    let splitter = FixedSizeSplitter::new(0, 0);

    let result = splitter.split(&[Page::new(1, "text")], DocumentId::new()).await;

    assert!(matches!(result, Err(TextSplitterError::InvalidParameters(_))));
}
