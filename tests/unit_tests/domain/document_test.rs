use std::path::Path;

use docqa::domain::{ContentType, Document};

#[test]
fn given_pdf_extension_in_any_case_when_detecting_then_returns_pdf() {
    assert_eq!(
        ContentType::from_path(Path::new("notes/Lecture.PDF")),
        Some(ContentType::Pdf)
    );
}

#[test]
fn given_text_extensions_when_detecting_then_returns_text() {
    assert_eq!(ContentType::from_path(Path::new("a.txt")), Some(ContentType::Text));
    assert_eq!(ContentType::from_path(Path::new("a.md")), Some(ContentType::Text));
}

#[test]
fn given_unknown_or_missing_extension_when_detecting_then_returns_none() {
    assert_eq!(ContentType::from_path(Path::new("image.png")), None);
    assert_eq!(ContentType::from_path(Path::new("README")), None);
}

#[test]
fn given_mime_type_when_parsing_then_round_trips_through_as_mime() {
    assert_eq!(ContentType::from_mime("application/pdf"), Some(ContentType::Pdf));
    assert_eq!(ContentType::Pdf.as_mime(), "application/pdf");
    assert_eq!(ContentType::from_mime("image/png"), None);
}

#[test]
fn given_new_document_when_created_then_keeps_metadata() {
    let document = Document::new("guide.pdf".to_string(), ContentType::Pdf, 1024);

    assert_eq!(document.filename, "guide.pdf");
    assert_eq!(document.size_bytes, 1024);
}
