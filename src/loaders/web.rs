//! Generic web page loader: fetch HTML and keep the readable text.

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use super::{Document, LoaderError, ensure_success};

const SKIPPED_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];
const BLOCK_TAGS: [&str; 16] = [
    "p", "div", "br", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "header", "footer", "blockquote",
];

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));
static HTML_ROOT: LazyLock<Selector> = LazyLock::new(|| selector("html"));
static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector parses")
}

/// Fetches a URL and converts the page into one document.
#[derive(Debug, Clone)]
pub struct WebPageLoader {
    http: Client,
}

/// Readable parts of an HTML page.
#[derive(Debug, Default, PartialEq)]
struct PageContent {
    text: String,
    title: Option<String>,
    description: Option<String>,
    language: Option<String>,
}

impl WebPageLoader {
    /// Create a loader using the shared HTTP client.
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Fetch `url` and extract its text and page metadata.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, url: &str) -> Result<Vec<Document>, LoaderError> {
        let parsed = Url::parse(url).map_err(|err| LoaderError::Parse {
            what: "URL",
            message: format!("{url}: {err}"),
        })?;

        let html = ensure_success(self.http.get(parsed.as_str()).send().await?)?
            .text()
            .await?;
        let page = parse_html(&html);
        tracing::debug!(
            characters = page.text.len(),
            title = page.title.as_deref().unwrap_or_default(),
            "Extracted web page"
        );
        if page.text.is_empty() {
            return Err(LoaderError::NoText(url.to_string()));
        }

        Ok(vec![
            Document::new(page.text)
                .with_metadata("source", url)
                .with_metadata(
                    "title",
                    page.title.unwrap_or_else(|| "No title found.".into()),
                )
                .with_metadata(
                    "description",
                    page.description
                        .unwrap_or_else(|| "No description found.".into()),
                )
                .with_metadata(
                    "language",
                    page.language
                        .unwrap_or_else(|| "No language found.".into()),
                ),
        ])
    }
}

fn parse_html(html: &str) -> PageContent {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());
    let description = document
        .select(&DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());
    let language = document
        .select(&HTML_ROOT)
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string);

    let raw = document
        .select(&BODY)
        .next()
        .map(|body| element_text(&body))
        .unwrap_or_default();

    PageContent {
        text: clean_text(&raw),
        title,
        description,
        language,
    }
}

fn element_text(element: &ElementRef) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let tag = child_element.value().name();
            if SKIPPED_TAGS.contains(&tag) {
                continue;
            }
            text.push_str(&element_text(&child_element));
            if BLOCK_TAGS.contains(&tag) {
                text.push('\n');
            }
        } else if let Some(text_node) = child.value().as_text() {
            text.push_str(text_node);
        }
    }
    text
}

/// Collapse spaces inside lines and drop blank lines.
fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
