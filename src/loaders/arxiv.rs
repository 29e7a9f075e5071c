//! arXiv papers: Atom metadata lookup followed by PDF text extraction.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use std::borrow::Cow;

use super::{Document, LoaderError, ensure_success, pdf, squash_whitespace};

const MAX_RESULTS: usize = 2;
const ERROR_ENTRY_MARKER: &str = "/api/errors";

/// Loads arXiv papers by identifier.
#[derive(Debug, Clone)]
pub struct ArxivLoader {
    http: Client,
    api_url: String,
}

/// One `<entry>` of the Atom feed.
#[derive(Debug, Default, Clone, PartialEq)]
struct Entry {
    entry_id: String,
    published: String,
    title: String,
    summary: String,
    authors: Vec<String>,
    pdf_url: Option<String>,
}

impl Entry {
    fn pdf_url(&self) -> String {
        self.pdf_url
            .clone()
            .unwrap_or_else(|| self.entry_id.replacen("/abs/", "/pdf/", 1))
    }

    fn into_document(self, page_content: String) -> Document {
        let published = self
            .published
            .split('T')
            .next()
            .unwrap_or_default()
            .to_string();
        Document::new(page_content)
            .with_metadata("Published", published)
            .with_metadata("Title", self.title)
            .with_metadata("Authors", self.authors.join(", "))
            .with_metadata("Summary", self.summary)
            .with_metadata("entry_id", self.entry_id)
    }
}

impl ArxivLoader {
    /// Create a loader against the Atom query endpoint.
    pub fn new(http: Client, api_url: String) -> Self {
        Self { http, api_url }
    }

    /// Look up `paper_id` and return the text of each matching paper.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, paper_id: &str) -> Result<Vec<Document>, LoaderError> {
        let max_results = MAX_RESULTS.to_string();
        let feed = ensure_success(
            self.http
                .get(&self.api_url)
                .query(&[("id_list", paper_id), ("max_results", max_results.as_str())])
                .send()
                .await?,
        )?
        .text()
        .await?;

        let entries = parse_feed(&feed)?;
        if entries.is_empty() {
            return Err(LoaderError::NoResults(paper_id.to_string()));
        }

        let mut documents = Vec::with_capacity(entries.len());
        for entry in entries {
            let text = match self.fetch_pdf_text(&entry.pdf_url()).await {
                Ok(text) if !text.is_empty() => text,
                Ok(_) => {
                    tracing::warn!(entry_id = %entry.entry_id, "PDF had no text; using abstract");
                    entry.summary.clone()
                }
                Err(err) => {
                    tracing::warn!(
                        entry_id = %entry.entry_id,
                        error = %err,
                        "Failed to read paper PDF; using abstract"
                    );
                    entry.summary.clone()
                }
            };
            documents.push(entry.into_document(text));
        }
        Ok(documents)
    }

    async fn fetch_pdf_text(&self, url: &str) -> Result<String, LoaderError> {
        let bytes = ensure_success(self.http.get(url).send().await?)?
            .bytes()
            .await?;
        let pages = pdf::extract_pages(bytes.to_vec()).await?;
        Ok(pages
            .into_iter()
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Id,
    Published,
    Title,
    Summary,
    AuthorName,
}

/// Parse an Atom feed into entries, dropping the error entries arXiv uses for bad ids.
fn parse_feed(xml: &str) -> Result<Vec<Entry>, LoaderError> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"entry" => current = Some(Entry::default()),
                b"author" => in_author = true,
                b"link" => record_link(current.as_mut(), e),
                name if current.is_some() => {
                    field = match name {
                        b"id" => Some(Field::Id),
                        b"published" => Some(Field::Published),
                        b"title" => Some(Field::Title),
                        b"summary" => Some(Field::Summary),
                        b"name" if in_author => Some(Field::AuthorName),
                        _ => None,
                    };
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"link" => {
                record_link(current.as_mut(), e);
            }
            Ok(Event::Text(e)) if field.is_some() => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                let unescaped = quick_xml::escape::unescape(&raw)
                    .unwrap_or(Cow::Borrowed(raw.as_str()))
                    .into_owned();
                text.push_str(&unescaped);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take() {
                        if entry.entry_id.contains(ERROR_ENTRY_MARKER) {
                            tracing::debug!(entry_id = %entry.entry_id, "Skipping arXiv error entry");
                        } else if !entry.entry_id.is_empty() {
                            entries.push(entry);
                        }
                    }
                }
                b"author" => in_author = false,
                _ => {
                    if let (Some(kind), Some(entry)) = (field.take(), current.as_mut()) {
                        let value = squash_whitespace(&text);
                        match kind {
                            Field::Id => entry.entry_id = value,
                            Field::Published => entry.published = value,
                            Field::Title => entry.title = value,
                            Field::Summary => entry.summary = value,
                            Field::AuthorName => entry.authors.push(value),
                        }
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(LoaderError::Parse {
                    what: "arXiv feed",
                    message: err.to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(entries)
}

fn record_link(entry: Option<&mut Entry>, element: &BytesStart) {
    let Some(entry) = entry else {
        return;
    };
    let mut href = None;
    let mut is_pdf = false;
    for attribute in element.attributes().flatten() {
        let value = String::from_utf8_lossy(&attribute.value).into_owned();
        match attribute.key.as_ref() {
            b"href" => href = Some(value),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }
    if is_pdf {
        entry.pdf_url = href;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::pdf::fixtures::pdf_with_pages;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    fn feed(pdf_href: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>  The dominant sequence transduction models are based on
      recurrent &amp; convolutional networks.</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
    <link href="http://arxiv.org/abs/1706.03762v7" rel="alternate" type="text/html"/>
    <link title="pdf" href="{pdf_href}" rel="related" type="application/pdf"/>
  </entry>
</feed>"#
        )
    }

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999.99999</id>
    <title>Error</title>
    <summary>incorrect id format for 9999.99999</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_entry_fields() {
        let entries = parse_feed(&feed("http://arxiv.org/pdf/1706.03762v7")).expect("parsed");
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.entry_id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(entry.title, "Attention Is All You Need");
        assert_eq!(
            entry.summary,
            "The dominant sequence transduction models are based on recurrent & convolutional networks."
        );
        assert_eq!(entry.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(entry.pdf_url(), "http://arxiv.org/pdf/1706.03762v7");
    }

    #[test]
    fn error_entries_are_dropped() {
        assert!(parse_feed(ERROR_FEED).expect("parsed").is_empty());
    }

    #[test]
    fn pdf_url_falls_back_to_entry_id() {
        let entry = Entry {
            entry_id: "http://arxiv.org/abs/2101.00001v1".into(),
            ..Entry::default()
        };
        assert_eq!(entry.pdf_url(), "http://arxiv.org/pdf/2101.00001v1");
    }

    #[tokio::test]
    async fn unreadable_pdf_falls_back_to_abstract() {
        let server = MockServer::start_async().await;
        let pdf_url = server.url("/pdf/1706.03762v7");
        let query = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/query")
                    .query_param("id_list", "1706.03762")
                    .query_param("max_results", "2");
                then.status(200).body(feed(&pdf_url));
            })
            .await;
        let download = server
            .mock_async(|when, then| {
                when.method(GET).path("/pdf/1706.03762v7");
                then.status(200).body("not really a pdf");
            })
            .await;

        let loader = ArxivLoader::new(Client::new(), server.url("/api/query"));
        let documents = loader.load("1706.03762").await.expect("loaded");

        query.assert_async().await;
        download.assert_async().await;
        assert_eq!(documents.len(), 1);
        let document = &documents[0];
        assert!(document.page_content.starts_with("The dominant sequence"));
        assert_eq!(document.metadata["Published"], json!("2017-06-12"));
        assert_eq!(document.metadata["Title"], json!("Attention Is All You Need"));
        assert_eq!(
            document.metadata["Authors"],
            json!("Ashish Vaswani, Noam Shazeer")
        );
        assert_eq!(
            document.metadata["entry_id"],
            json!("http://arxiv.org/abs/1706.03762v7")
        );
    }

    #[tokio::test]
    async fn readable_pdf_text_is_used() {
        let server = MockServer::start_async().await;
        let pdf_url = server.url("/pdf/1706.03762v7");
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/query");
                then.status(200).body(feed(&pdf_url));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/pdf/1706.03762v7");
                then.status(200)
                    .header("content-type", "application/pdf")
                    .body(pdf_with_pages(&["Scaled dot-product attention", "Multi-head attention"]));
            })
            .await;

        let loader = ArxivLoader::new(Client::new(), server.url("/api/query"));
        let documents = loader.load("1706.03762").await.expect("loaded");

        assert_eq!(documents.len(), 1);
        let text = &documents[0].page_content;
        assert!(text.contains("Scaled dot-product attention"));
        assert!(text.contains("Multi-head attention"));
        assert!(!text.contains("dominant sequence"));
        assert_eq!(documents[0].metadata["Title"], json!("Attention Is All You Need"));
    }

    #[tokio::test]
    async fn unknown_identifier_reports_no_results() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/query");
                then.status(200).body(ERROR_FEED);
            })
            .await;

        let loader = ArxivLoader::new(Client::new(), server.url("/api/query"));
        let error = loader.load("9999.99999").await.expect_err("no results");
        assert!(matches!(error, LoaderError::NoResults(ref id) if id == "9999.99999"));
    }
}
