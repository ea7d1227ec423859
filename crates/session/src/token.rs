use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, COOKIE, ORIGIN, REFERER};
use serde_json::{json, Value};
use tracing::{debug, warn};

use nfchecker_core::config::TokenConfig;
use nfchecker_core::{CookieSet, MintOutcome, TokenMinter};

/// Deep link that logs a device in with a freshly minted token.
pub fn token_link(token: &str) -> String {
    format!("https://netflix.com/?nftoken={}", token)
}

/// Mints auto-login tokens through the persisted-query GraphQL endpoint.
/// The endpoint only answers requests that look like the mobile app, so
/// the user agent and query hash come from config rather than anything
/// harvested from the session.
pub struct GraphqlTokenMinter {
    client: reqwest::Client,
    config: TokenConfig,
}

impl GraphqlTokenMinter {
    pub fn new(config: TokenConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    fn payload(&self) -> Value {
        json!({
            "operationName": "CreateAutoLoginToken",
            "variables": { "scope": self.config.scope },
            "extensions": {
                "persistedQuery": {
                    "version": self.config.persisted_query_version,
                    "id": self.config.persisted_query_id,
                }
            }
        })
    }
}

#[async_trait]
impl TokenMinter for GraphqlTokenMinter {
    async fn mint(&self, cookies: &CookieSet) -> MintOutcome {
        // Fail fast before touching the network; the endpoint rejects
        // sessions missing either identity cookie anyway.
        let missing = cookies.missing_identity_cookies();
        if !missing.is_empty() {
            return MintOutcome::Failed(format!(
                "Missing required cookies: {}",
                missing.join(", ")
            ));
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(COOKIE, cookies.header_value())
            .header(
                ACCEPT,
                HeaderValue::from_static(
                    "multipart/mixed;deferSpec=20220824, application/graphql-response+json, application/json",
                ),
            )
            .header(ORIGIN, HeaderValue::from_static("https://www.netflix.com"))
            .header(REFERER, HeaderValue::from_static("https://www.netflix.com/"))
            .json(&self.payload())
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("token request failed: {}", e);
                return MintOutcome::Failed(format!("Request error: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return MintOutcome::Failed(format!("HTTP {}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(v) => v,
            Err(e) => return MintOutcome::Failed(format!("Invalid response body: {}", e)),
        };

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let message = errors
                .first()
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return MintOutcome::Failed(format!("API Error: {}", message));
        }

        match body
            .pointer("/data/createAutoLoginToken")
            .and_then(Value::as_str)
        {
            Some(token) if !token.is_empty() => {
                debug!("minted auto-login token");
                MintOutcome::Minted(token.to_string())
            }
            _ => MintOutcome::Failed("No token in response".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig {
            endpoint: "https://android13.prod.ftl.netflix.com/graphql".into(),
            user_agent: "nf-mobile".into(),
            scope: "WEBVIEW_MOBILE_STREAMING".into(),
            persisted_query_version: 102,
            persisted_query_id: "76e97129-f4b5-41a0-a73c-12e674896849".into(),
            request_timeout_seconds: 30,
        }
    }

    #[tokio::test]
    async fn test_mint_fails_fast_without_identity_cookies() {
        let minter = GraphqlTokenMinter::new(test_config()).unwrap();
        let mut cookies = CookieSet::new();
        cookies.insert("flwssn", "abc");

        let outcome = minter.mint(&cookies).await;
        let reason = outcome.reason().unwrap();
        assert!(reason.contains("Missing required cookies"));
        assert!(reason.contains("NetflixId"));
        assert!(reason.contains("SecureNetflixId"));
    }

    #[tokio::test]
    async fn test_mint_accepts_case_variant_cookie_names() {
        let minter = GraphqlTokenMinter::new(test_config()).unwrap();
        let mut cookies = CookieSet::new();
        cookies.insert("netflixid", "abc");

        // Only one of the two present; the report should name the other.
        let outcome = minter.mint(&cookies).await;
        let reason = outcome.reason().unwrap();
        assert!(!reason.contains("NetflixId,"));
        assert!(reason.contains("SecureNetflixId"));
    }

    #[test]
    fn test_payload_shape() {
        let minter = GraphqlTokenMinter::new(test_config()).unwrap();
        let payload = minter.payload();
        assert_eq!(payload["operationName"], "CreateAutoLoginToken");
        assert_eq!(payload["variables"]["scope"], "WEBVIEW_MOBILE_STREAMING");
        assert_eq!(payload["extensions"]["persistedQuery"]["version"], 102);
    }

    #[test]
    fn test_token_link() {
        assert_eq!(token_link("t0k"), "https://netflix.com/?nftoken=t0k");
    }
}
