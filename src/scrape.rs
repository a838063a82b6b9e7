use crate::error::{GridError, Result};
use crate::source::{Attributes, QuoteSource};
use async_trait::async_trait;
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

lazy_static! {
    static ref COMMENT_REGEX: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref SCRIPT_REGEX: Regex =
        Regex::new(&format!(r"(?is)<script\b{}>.*?</script\s*>", ATTRS)).unwrap();
    static ref ROW_REGEX: Regex =
        Regex::new(&format!(r"(?is)<tr\b{}>(.*?)</tr\s*>", ATTRS)).unwrap();
    static ref CELL_REGEX: Regex =
        Regex::new(&format!(r"(?is)<td\b{}>(.*?)</td\s*>", ATTRS)).unwrap();
    static ref TAG_REGEX: Regex = Regex::new(&format!(r"(?s)<{}>", ATTRS)).unwrap();
}

// Rest of a tag up to its closing `>`; quoted attribute values may hold `>`.
const ATTRS: &str = r#"(?:[^>"']|"[^"]*"|'[^']*')*"#;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Scrapes the quote summary and key statistics pages of a ticker.
///
/// Every table row with at least two cells becomes one attribute: the first
/// cell's text is the label and the second cell's text is the value. Pages
/// are read in order and later pages win on duplicate labels.
pub struct PageScraper {
    client: Client,
    base_url: String,
}

impl PageScraper {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(PageScraper {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The pages scraped for `ticker`, in the order they are read.
    pub fn page_urls(&self, ticker: &str) -> Vec<String> {
        vec![
            format!("{}/{}", self.base_url, ticker),
            format!("{}/{}/key-statistics?p={}", self.base_url, ticker, ticker),
        ]
    }

    async fn download(&self, url: &str) -> Result<String> {
        debug!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GridError::Scrape(format!("{} answered {}", url, status)));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl QuoteSource for PageScraper {
    async fn fetch(&self, ticker: &str, _nocache: bool) -> Result<Attributes> {
        let mut attributes = Attributes::new();
        for url in self.page_urls(ticker) {
            let html = self.download(&url).await?;
            extract_rows(&html, &mut attributes);
        }
        Ok(attributes)
    }
}

/// Collects `label -> value` pairs from every `<tr>` of `html`.
///
/// Comments and script blocks are dropped first. Rows with fewer than two cells, or with
/// an empty label or value, are skipped.
pub fn extract_rows(html: &str, attributes: &mut Attributes) {
    let html = COMMENT_REGEX.replace_all(html, "");
    let html = SCRIPT_REGEX.replace_all(&html, "");

    for row in ROW_REGEX.captures_iter(&html) {
        let cells: Vec<String> = CELL_REGEX
            .captures_iter(&row[1])
            .map(|cell| cell_text(&cell[1]))
            .collect();

        if cells.len() < 2 {
            continue;
        }

        let label = cells[0].trim();
        let value = cells[1].trim();
        if !label.is_empty() && !value.is_empty() {
            attributes.insert(label.to_string(), value.to_string());
        }
    }
}

/// Text content of a cell: tags removed, common entities decoded.
fn cell_text(inner: &str) -> String {
    let text = TAG_REGEX.replace_all(inner, "");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
