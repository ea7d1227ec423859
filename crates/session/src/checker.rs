use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use nfchecker_core::config::AppConfig;
use nfchecker_core::{CheckStatus, CookieChecker, CookieFormat, CookieSet, TokenMinter, ValidationResult};
use nfchecker_parser::cookie;

use crate::token::token_link;
use crate::validate::SessionValidator;

/// End-to-end pipeline for one cookie block: parse, validate, enrich,
/// mint. Ties the crates together behind the `CookieChecker` seam so
/// orchestration code never sees browsers or HTTP clients.
pub struct Checker {
    config: AppConfig,
    validator: SessionValidator,
    minter: Arc<dyn TokenMinter>,
}

impl Checker {
    pub fn new(config: AppConfig, minter: Arc<dyn TokenMinter>) -> Self {
        let validator = SessionValidator::new(config.clone());
        Self {
            config,
            validator,
            minter,
        }
    }

    /// Minting prefers the browser-harvested cookies because the target
    /// rotates identity cookies server-side; the originals are the backup.
    async fn mint_token(&self, result: &mut ValidationResult, original: &CookieSet) {
        let mut attempts: Vec<CookieSet> = Vec::new();

        if !result.browser_cookies.is_empty() {
            attempts.push(cookie::parse(&result.browser_cookies, CookieFormat::Auto));
        }
        attempts.push(original.clone());

        for cookies in attempts {
            let outcome = self.minter.mint(&cookies).await;
            if let Some(token) = outcome.token() {
                result.nftoken = Some(token.to_string());
                result.nftoken_link = Some(token_link(token));
                return;
            }
            debug!(reason = ?outcome.reason(), "token mint attempt failed");
        }
    }
}

#[async_trait]
impl CookieChecker for Checker {
    async fn check(&self, cookie_text: &str, format: CookieFormat) -> ValidationResult {
        let cookies = cookie::parse(cookie_text, format);
        if cookies.is_empty() {
            let preview: String = cookie_text
                .chars()
                .take(self.config.checker.invalid_preview_len)
                .collect();
            return ValidationResult::invalid(preview);
        }

        let mut result = self.validator.validate(&cookies, cookie_text).await;

        if result.status == CheckStatus::Valid {
            self.mint_token(&mut result, &cookies).await;
            info!(
                email = ?result.email,
                minted = result.nftoken.is_some(),
                "cookie check: valid"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfchecker_core::MintOutcome;

    /// Accepts only sets carrying a marker cookie, so the browser-harvested
    /// attempt and the original-input attempt can be told apart.
    struct MarkerMinter {
        marker: &'static str,
    }

    #[async_trait]
    impl TokenMinter for MarkerMinter {
        async fn mint(&self, cookies: &CookieSet) -> MintOutcome {
            if cookies.get(self.marker).is_some() {
                MintOutcome::Minted("tok-123".to_string())
            } else {
                MintOutcome::Failed("marker missing".to_string())
            }
        }
    }

    fn config() -> AppConfig {
        toml::from_str(include_str!("../../../config/default.toml")).unwrap()
    }

    #[tokio::test]
    async fn test_mint_falls_back_to_original_cookies() {
        let checker = Checker::new(
            config(),
            Arc::new(MarkerMinter { marker: "original_only" }),
        );

        let mut result = ValidationResult::pending("stub");
        result.status = CheckStatus::Valid;
        result.browser_cookies = "NetflixId=harvested; SecureNetflixId=harvested".to_string();

        let original = cookie::parse("original_only=1; NetflixId=x", CookieFormat::Auto);
        checker.mint_token(&mut result, &original).await;

        assert_eq!(result.nftoken.as_deref(), Some("tok-123"));
        assert_eq!(
            result.nftoken_link.as_deref(),
            Some("https://netflix.com/?nftoken=tok-123")
        );
    }

    #[tokio::test]
    async fn test_double_mint_failure_leaves_no_token() {
        let checker = Checker::new(config(), Arc::new(MarkerMinter { marker: "never_set" }));

        let mut result = ValidationResult::pending("stub");
        result.status = CheckStatus::Valid;

        let original = cookie::parse("NetflixId=x; SecureNetflixId=y", CookieFormat::Auto);
        checker.mint_token(&mut result, &original).await;

        assert!(result.nftoken.is_none());
        assert!(result.nftoken_link.is_none());
    }
}
