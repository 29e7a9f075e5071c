//! Wikipedia lookups through the MediaWiki action API.

use reqwest::Client;
use serde::Deserialize;

use super::{Document, LoaderError, ensure_success};

const SEARCH_LIMIT: &str = "2";
const MAX_CONTENT_CHARS: usize = 4000;

/// Searches Wikipedia and returns the plain-text extract of each hit.
#[derive(Debug, Clone)]
pub struct WikipediaLoader {
    http: Client,
    api_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    fullurl: Option<String>,
    #[serde(default)]
    missing: bool,
}

impl WikipediaLoader {
    /// Create a loader against a MediaWiki `api.php` URL.
    pub fn new(http: Client, api_url: String) -> Self {
        Self { http, api_url }
    }

    /// Search for `query` and load the top hits.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, query: &str) -> Result<Vec<Document>, LoaderError> {
        let titles = self.search(query).await?;
        tracing::debug!(hits = titles.len(), "Wikipedia search complete");

        let mut documents = Vec::with_capacity(titles.len());
        for title in &titles {
            match self.page(title).await? {
                Some(document) => documents.push(document),
                None => tracing::debug!(%title, "Skipping page without extract"),
            }
        }

        if documents.is_empty() {
            return Err(LoaderError::NoResults(query.to_string()));
        }
        Ok(documents)
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, LoaderError> {
        let response: SearchResponse = ensure_success(
            self.http
                .get(&self.api_url)
                .query(&[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query),
                    ("srlimit", SEARCH_LIMIT),
                    ("srprop", ""),
                    ("format", "json"),
                    ("formatversion", "2"),
                ])
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| LoaderError::Parse {
            what: "Wikipedia search response",
            message: err.to_string(),
        })?;

        Ok(response
            .query
            .map(|query| query.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn page(&self, title: &str) -> Result<Option<Document>, LoaderError> {
        let response: PageResponse = ensure_success(
            self.http
                .get(&self.api_url)
                .query(&[
                    ("action", "query"),
                    ("prop", "extracts|info"),
                    ("explaintext", "1"),
                    ("inprop", "url"),
                    ("redirects", "1"),
                    ("titles", title),
                    ("format", "json"),
                    ("formatversion", "2"),
                ])
                .send()
                .await?,
        )?
        .json()
        .await
        .map_err(|err| LoaderError::Parse {
            what: "Wikipedia page response",
            message: err.to_string(),
        })?;

        let Some(page) = response
            .query
            .and_then(|query| query.pages.into_iter().find(|page| !page.missing))
        else {
            return Ok(None);
        };
        let extract = page.extract.unwrap_or_default();
        let extract = extract.trim();
        if extract.is_empty() {
            return Ok(None);
        }

        let summary = first_paragraph(extract);
        let content: String = extract.chars().take(MAX_CONTENT_CHARS).collect();
        Ok(Some(
            Document::new(content)
                .with_metadata("title", page.title)
                .with_metadata("summary", summary)
                .with_metadata("source", page.fullurl.unwrap_or_default()),
        ))
    }
}

fn first_paragraph(extract: &str) -> String {
    extract
        .split("\n\n")
        .map(str::trim)
        .find(|paragraph| !paragraph.is_empty())
        .unwrap_or_default()
        .to_string()
}
