use std::path::Path;

use super::{Document, LoaderError, read_file};

/// Reads an uploaded plain-text file into a single document.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextFileLoader;

impl TextFileLoader {
    /// Create a text loader.
    pub const fn new() -> Self {
        Self
    }

    /// Load the file at `path`. Invalid UTF-8 sequences are replaced rather than rejected.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError> {
        let bytes = read_file(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        tracing::debug!(bytes = bytes.len(), "Read text upload");
        Ok(vec![
            Document::new(text).with_metadata("source", path.display().to_string()),
        ])
    }
}
