//! Page fetching.
//!
//! The run loop only needs "URL in, rendered markup out". [`Fetcher`] is that
//! seam; [`HttpFetcher`] is the plain-HTTP implementation used by the binary.

use crate::error::{Result, ScrapeError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Markers of the engine's unusual-traffic interstitial
const CAPTCHA_MARKERS: [&str; 2] = ["Solving the above CAPTCHA", "unusual traffic"];

/// Source of rendered page markup.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its markup.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher, optionally routed through a proxy
    /// (e.g. `socks5://127.0.0.1:9050`).
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .cookie_store(true);

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                ScrapeError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScrapeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(url = url, "Fetching");

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ScrapeError::RateLimited(60));
        }

        if !status.is_success() {
            return Err(ScrapeError::Http {
                code: status.as_u16(),
                message: status.to_string(),
            });
        }

        let body = response.text().await?;
        if looks_like_captcha(&body) {
            return Err(ScrapeError::Captcha);
        }

        Ok(body)
    }
}

fn looks_like_captcha(body: &str) -> bool {
    CAPTCHA_MARKERS.iter().any(|marker| body.contains(marker))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies by exact URL; unknown URLs fail like a dead link.
    #[derive(Default)]
    pub struct StaticFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(url.to_string());
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ScrapeError::Fetch(format!("no page for {}", url)))
        }
    }
}
