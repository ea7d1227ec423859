use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::redirect::Policy;
use tracing::debug;

use nfchecker_core::config::HttpConfig;
use nfchecker_core::CookieSet;

use crate::error::SessionError;

/// Page fetched over plain HTTP, used when the browser path fails.
pub struct ProbeResponse {
    /// URL after redirects.
    pub final_url: String,
    pub body: String,
}

/// Lightweight HTTP fallback. No script execution, so pages render their
/// server-side shell only; good enough to spot a login redirect and to read
/// the embedded context blob.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(config: &HttpConfig) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(Policy::limited(10))
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client })
    }

    /// Fetch `url` carrying `cookies` in a single Cookie header.
    pub async fn fetch(&self, url: &str, cookies: &CookieSet) -> Result<ProbeResponse, SessionError> {
        let header = cookies.header_value();
        let response = self.client.get(url).header(COOKIE, header).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!(status, %final_url, "http probe complete");

        Ok(ProbeResponse { final_url, body })
    }
}
