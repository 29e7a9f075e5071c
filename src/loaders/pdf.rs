//! PDF text extraction backed by `lopdf`.
//!
//! Parsing runs on the blocking pool with a fixed time budget; a malformed or image-only PDF
//! must not stall the request forever.

use lopdf::Document as PdfDocument;
use std::path::Path;
use std::time::Duration;

use super::{Document, LoaderError, read_file};

const EXTRACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads an uploaded PDF, producing one document per page that contains text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PdfLoader {
    /// Create a PDF loader.
    pub const fn new() -> Self {
        Self
    }

    /// Load the PDF stored at `path`.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub async fn load(&self, path: &Path) -> Result<Vec<Document>, LoaderError> {
        let bytes = read_file(path).await?;
        let source = path.display().to_string();
        let pages = extract_pages(bytes).await?;
        let total_pages = pages.len();

        let documents: Vec<Document> = pages
            .into_iter()
            .enumerate()
            .filter(|(_, text)| !text.is_empty())
            .map(|(index, text)| {
                Document::new(text)
                    .with_metadata("source", source.clone())
                    .with_metadata("page", index)
                    .with_metadata("total_pages", total_pages)
            })
            .collect();

        tracing::info!(total_pages, text_pages = documents.len(), "PDF text extraction complete");
        if documents.is_empty() {
            return Err(LoaderError::NoText(source));
        }
        Ok(documents)
    }
}

/// Extract cleaned text for every page, in page order, off the async runtime.
pub(crate) async fn extract_pages(bytes: Vec<u8>) -> Result<Vec<String>, LoaderError> {
    tokio::time::timeout(
        EXTRACTION_TIMEOUT,
        tokio::task::spawn_blocking(move || extract_pages_blocking(&bytes)),
    )
    .await
    .map_err(|_| LoaderError::Timeout("PDF extraction".to_string()))?
    .map_err(|err| LoaderError::Pdf(format!("extraction task failed: {err}")))?
}

fn extract_pages_blocking(bytes: &[u8]) -> Result<Vec<String>, LoaderError> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|err| LoaderError::Pdf(format!("failed to parse PDF: {err}")))?;

    // `get_pages` is keyed by 1-based page number and iterates in order.
    let pages = doc
        .get_pages()
        .keys()
        .map(|page_number| {
            doc.extract_text(&[*page_number])
                .map(|text| clean_text(&text))
                .unwrap_or_else(|err| {
                    tracing::debug!(page_number, error = %err, "Skipping unreadable PDF page");
                    String::new()
                })
        })
        .collect();
    Ok(pages)
}

/// Collapse whitespace runs, keeping a newline when the run started with one.
fn clean_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_whitespace = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(if c == '\n' { '\n' } else { ' ' });
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result.trim().to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::pdf_with_pages;
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Hello   World  \n\n  Test  "), "Hello World Test");
        assert_eq!(clean_text("line one\n  line two"), "line one\nline two");
    }

    #[tokio::test]
    async fn rejects_bytes_that_are_not_a_pdf() {
        let error = extract_pages(b"plain text pretending".to_vec())
            .await
            .expect_err("not a pdf");
        assert!(matches!(error, LoaderError::Pdf(_)));
    }

    #[tokio::test]
    async fn missing_upload_is_an_io_error() {
        let error = PdfLoader::new()
            .load(Path::new("/nonexistent/paper.pdf"))
            .await
            .expect_err("missing");
        assert!(matches!(error, LoaderError::Io { .. }));
    }

    #[tokio::test]
    async fn one_document_per_page_with_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, pdf_with_pages(&["Quarterly results", "", "Outlook"]))
            .expect("write pdf");

        let documents = PdfLoader::new().load(&path).await.expect("loaded");

        assert_eq!(documents.len(), 2);
        assert!(documents[0].page_content.contains("Quarterly results"));
        assert!(documents[1].page_content.contains("Outlook"));
        assert_eq!(documents[0].metadata["page"], json!(0));
        assert_eq!(documents[1].metadata["page"], json!(2));
        for document in &documents {
            assert_eq!(document.metadata["total_pages"], json!(3));
            assert_eq!(
                document.metadata["source"],
                json!(path.display().to_string())
            );
        }
    }

    #[tokio::test]
    async fn pdf_without_text_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, pdf_with_pages(&["", ""])).expect("write pdf");

        let error = PdfLoader::new().load(&path).await.expect_err("no text");

        assert!(matches!(error, LoaderError::NoText(_)));
    }
}
