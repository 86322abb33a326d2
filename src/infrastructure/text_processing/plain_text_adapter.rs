use async_trait::async_trait;

use crate::application::ports::{FileLoader, FileLoaderError};
use crate::domain::{ContentType, Document, Page};

use super::text_sanitizer::sanitize_extracted_text;

/// Loads UTF-8 text files as a single page.
pub struct PlainTextAdapter;

#[async_trait]
impl FileLoader for PlainTextAdapter {
    async fn extract_pages(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<Vec<Page>, FileLoaderError> {
        if document.content_type != ContentType::Text {
            return Err(FileLoaderError::UnsupportedContentType(
                document.content_type.as_mime().to_string(),
            ));
        }

        let raw = std::str::from_utf8(data)
            .map_err(|e| FileLoaderError::ExtractionFailed(e.to_string()))?;
        let text = sanitize_extracted_text(raw);
        if text.is_empty() {
            return Err(FileLoaderError::NoTextFound(document.filename.clone()));
        }

        Ok(vec![Page::new(1, text)])
    }
}
