//! Company logos by ticker. Fetching is best-effort: a missing or broken
//! image never fails the caller.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use crate::logging::{log, log_logo_miss, obj, v_str, Domain, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl LogoImage {
    /// Identify the format from magic bytes; unknown formats are refused.
    pub fn sniff(bytes: Vec<u8>) -> Option<Self> {
        let format = if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else {
            return None;
        };
        Some(Self { format, bytes })
    }
}

#[async_trait]
pub trait LogoSource: Send + Sync {
    /// `Ok(None)` when the service has no image for the ticker.
    async fn fetch(&self, ticker: &str) -> Result<Option<LogoImage>>;
}

/// Used when no logo token is configured.
pub struct NullLogoSource;

#[async_trait]
impl LogoSource for NullLogoSource {
    async fn fetch(&self, _ticker: &str) -> Result<Option<LogoImage>> {
        Ok(None)
    }
}

/// In-memory logos, keyed by upper-case ticker.
#[derive(Debug, Clone, Default)]
pub struct StaticLogoSource {
    logos: HashMap<String, LogoImage>,
}

impl StaticLogoSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ticker: &str, image: LogoImage) -> Self {
        self.logos.insert(ticker.to_uppercase(), image);
        self
    }
}

#[async_trait]
impl LogoSource for StaticLogoSource {
    async fn fetch(&self, ticker: &str) -> Result<Option<LogoImage>> {
        Ok(self.logos.get(&ticker.to_uppercase()).cloned())
    }
}

/// Ticker-based image service (`{base}/ticker/{TICKER}?token=...`).
pub struct LogoDevClient {
    client: Client,
    base: Url,
    token: String,
}

impl LogoDevClient {
    pub fn new(base: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: Url::parse(base)?,
            token: token.to_string(),
        })
    }

    pub fn logo_url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("logo base {} cannot take a path", self.base))?
            .pop_if_empty()
            .push("ticker")
            .push(&ticker.to_uppercase());
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url)
    }
}

#[async_trait]
impl LogoSource for LogoDevClient {
    async fn fetch(&self, ticker: &str) -> Result<Option<LogoImage>> {
        let url = self.logo_url(ticker)?;
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            log(
                Level::Debug,
                Domain::Logo,
                "logo_status",
                obj(&[("ticker", v_str(ticker)), ("status", v_str(resp.status().as_str()))]),
            );
            return Ok(None);
        }
        let bytes = resp.bytes().await?;
        Ok(LogoImage::sniff(bytes.to_vec()))
    }
}

/// Fetch every distinct ticker once, concurrently, with no retry. Failures
/// and misses are logged and left out of the result.
pub async fn fetch_logos(source: &dyn LogoSource, tickers: &[String]) -> HashMap<String, LogoImage> {
    let mut distinct: Vec<&str> = Vec::new();
    for t in tickers {
        if !t.is_empty() && !distinct.contains(&t.as_str()) {
            distinct.push(t.as_str());
        }
    }

    let results = join_all(distinct.iter().map(|t| source.fetch(t))).await;

    let mut out = HashMap::new();
    for (ticker, result) in distinct.into_iter().zip(results) {
        match result {
            Ok(Some(image)) => {
                out.insert(ticker.to_string(), image);
            }
            Ok(None) => log_logo_miss(ticker, "no image"),
            Err(err) => log_logo_miss(ticker, &err.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> LogoImage {
        LogoImage::sniff(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]).unwrap()
    }

    struct FailingSource;

    #[async_trait]
    impl LogoSource for FailingSource {
        async fn fetch(&self, ticker: &str) -> Result<Option<LogoImage>> {
            if ticker == "RDDT" {
                Err(anyhow!("connection reset"))
            } else {
                Ok(Some(png()))
            }
        }
    }

    #[test]
    fn test_sniff() {
        assert_eq!(png().format, ImageFormat::Png);
        assert_eq!(
            LogoImage::sniff(vec![0xFF, 0xD8, 0xFF, 0xE0]).unwrap().format,
            ImageFormat::Jpeg
        );
        assert!(LogoImage::sniff(b"<svg/>".to_vec()).is_none());
    }

    #[test]
    fn test_logo_url() {
        let client = LogoDevClient::new("https://img.logo.dev", "pk_test", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.logo_url("rddt").unwrap().as_str(),
            "https://img.logo.dev/ticker/RDDT?token=pk_test"
        );
    }

    #[tokio::test]
    async fn test_failures_are_dropped() {
        let tickers = vec!["RBRK".to_string(), "RDDT".to_string(), "RBRK".to_string()];
        let logos = fetch_logos(&FailingSource, &tickers).await;
        assert_eq!(logos.len(), 1);
        assert!(logos.contains_key("RBRK"));
    }

    #[tokio::test]
    async fn test_static_source_is_case_insensitive() {
        let source = StaticLogoSource::new().with("rbrk", png());
        assert!(source.fetch("RBRK").await.unwrap().is_some());
        assert!(source.fetch("RDDT").await.unwrap().is_none());
        assert!(NullLogoSource.fetch("RBRK").await.unwrap().is_none());
    }
}
