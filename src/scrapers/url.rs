//! Product page scraping.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::user_agent::resolve_user_agent;
use crate::models::{EvidenceError, UrlInfo};

/// Fetches a page and pulls its title and description.
#[derive(Clone)]
pub struct UrlScraper {
    client: Client,
}

impl UrlScraper {
    /// Create a scraper whose every fetch is bounded by `timeout`.
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent_config))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url`. Errors describe why no information could be gathered.
    pub async fn scrape(&self, url: &str) -> Result<UrlInfo, EvidenceError> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failure(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned HTTP {}", url, status);
            return Err(EvidenceError::NetworkFetchFailure(format!(
                "{}: HTTP {}",
                url, status
            )));
        }

        let html = response.text().await.map_err(|e| {
            if e.is_timeout() {
                fetch_failure(url, e)
            } else {
                EvidenceError::ScrapeParseFailure(format!("{}: {}", url, e))
            }
        })?;

        parse_page(url, &html)
    }
}

fn fetch_failure(url: &str, e: reqwest::Error) -> EvidenceError {
    warn!("Failed to fetch {}: {}", url, e);
    let reason = if e.is_timeout() {
        "timed out".to_string()
    } else {
        e.to_string()
    };
    EvidenceError::NetworkFetchFailure(format!("{}: {}", url, reason))
}

fn selector(css: &str) -> Result<Selector, EvidenceError> {
    Selector::parse(css).map_err(|e| EvidenceError::ScrapeParseFailure(e.to_string()))
}

/// Extract title and description from a page.
///
/// Title falls back to the URL; description comes from
/// `<meta name="description">`, then the first `<p>`, else none.
pub fn parse_page(url: &str, html: &str) -> Result<UrlInfo, EvidenceError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let meta = document
        .select(&selector(r#"meta[name="description"]"#)?)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|d| !d.is_empty());

    let description = match meta {
        Some(d) => Some(d),
        None => document
            .select(&selector("p")?)
            .next()
            .map(|el| collapse_whitespace(&el.text().collect::<String>())),
    };

    Ok(UrlInfo {
        url: url.to_string(),
        title,
        description,
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::Html as HtmlResponse;
    use axum::routing::get;
    use axum::Router;

    const URL: &str = "https://shop.example/p/1";

    #[test]
    fn test_title_and_meta_description() {
        let info = parse_page(
            URL,
            r#"<html><head><title> Radiateur  ACME </title>
            <meta name="description" content="Radiateur 1000W IP24">
            </head><body><p>Ignored</p></body></html>"#,
        )
        .unwrap();
        assert_eq!(info.title, "Radiateur ACME");
        assert_eq!(info.description.as_deref(), Some("Radiateur 1000W IP24"));
    }

    #[test]
    fn test_description_falls_back_to_first_paragraph() {
        let info = parse_page(
            URL,
            "<html><head><title>T</title></head><body><p>First one</p><p>Second</p></body></html>",
        )
        .unwrap();
        assert_eq!(info.description.as_deref(), Some("First one"));
    }

    #[test]
    fn test_missing_title_uses_url_and_no_description() {
        let info = parse_page(URL, "<html><body><div>nothing</div></body></html>").unwrap();
        assert_eq!(info.title, URL);
        assert_eq!(info.description, None);
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_scrape_local_page() {
        let base = serve(Router::new().route(
            "/product",
            get(|| async { HtmlResponse("<title>Lampe</title><p>LED 12V</p>") }),
        ))
        .await;

        let scraper = UrlScraper::new(Duration::from_secs(5), None).unwrap();
        let info = scraper.scrape(&format!("{}/product", base)).await.unwrap();
        assert_eq!(info.title, "Lampe");
        assert_eq!(info.description.as_deref(), Some("LED 12V"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_failure() {
        let base = serve(Router::new().route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, "missing") }),
        ))
        .await;

        let scraper = UrlScraper::new(Duration::from_secs(5), None).unwrap();
        let err = scraper.scrape(&format!("{}/gone", base)).await.unwrap_err();
        assert!(matches!(err, EvidenceError::NetworkFetchFailure(ref m) if m.contains("404")));
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let base = serve(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                "late"
            }),
        ))
        .await;

        let scraper = UrlScraper::new(Duration::from_millis(200), None).unwrap();
        let err = scraper.scrape(&format!("{}/slow", base)).await.unwrap_err();
        assert!(matches!(err, EvidenceError::NetworkFetchFailure(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_failure() {
        let scraper = UrlScraper::new(Duration::from_secs(2), None).unwrap();
        let err = scraper.scrape("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(err, EvidenceError::NetworkFetchFailure(_)));
    }
}
