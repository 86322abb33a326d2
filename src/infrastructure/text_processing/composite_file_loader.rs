use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::ports::{FileLoader, FileLoaderError};
use crate::domain::{ContentType, Document, Page};

use super::{PdfAdapter, PlainTextAdapter};

pub struct CompositeFileLoader {
    adapters: HashMap<ContentType, Arc<dyn FileLoader>>,
}

impl CompositeFileLoader {
    pub fn new(adapters: Vec<(ContentType, Arc<dyn FileLoader>)>) -> Self {
        Self {
            adapters: adapters.into_iter().collect(),
        }
    }
}

impl Default for CompositeFileLoader {
    fn default() -> Self {
        Self::new(vec![
            (
                ContentType::Pdf,
                Arc::new(PdfAdapter::new()) as Arc<dyn FileLoader>,
            ),
            (ContentType::Text, Arc::new(PlainTextAdapter) as Arc<dyn FileLoader>),
        ])
    }
}

#[async_trait]
impl FileLoader for CompositeFileLoader {
    async fn extract_pages(
        &self,
        data: &[u8],
        document: &Document,
    ) -> Result<Vec<Page>, FileLoaderError> {
        let adapter = self.adapters.get(&document.content_type).ok_or_else(|| {
            FileLoaderError::UnsupportedContentType(document.content_type.as_mime().to_string())
        })?;

        adapter.extract_pages(data, document).await
    }
}
