use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use nfchecker_core::config::RefreshConfig;
use nfchecker_core::{CookieFormat, CookieSet, FreeCookie, TokenMinter};
use nfchecker_parser::cookie;
use nfchecker_store::{collections, decode, Store, Update};

/// Aggregate counts from one refresh cycle.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub dead: usize,
    pub total: usize,
}

/// Background liveness sweep over the free-cookie pool. Re-mints tokens on
/// a fixed interval and stamps each entry's `is_alive`/`last_refreshed`,
/// communicating with everything else only through the store.
pub struct RefreshLoop {
    store: Arc<dyn Store>,
    minter: Arc<dyn TokenMinter>,
    config: RefreshConfig,
}

impl RefreshLoop {
    pub fn new(store: Arc<dyn Store>, minter: Arc<dyn TokenMinter>, config: RefreshConfig) -> Self {
        Self {
            store,
            minter,
            config,
        }
    }

    /// Run until the shutdown channel fires. Observes cancellation at
    /// every wait point; per-entry writes are atomic, so stopping between
    /// entries leaves a valid snapshot.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            grace = self.config.startup_grace_seconds,
            interval = self.config.interval_seconds,
            "refresh loop starting"
        );

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(self.config.startup_grace_seconds)) => {}
            _ = shutdown.recv() => {
                info!("refresh loop shutting down before first cycle");
                return;
            }
        }

        loop {
            match self.run_cycle().await {
                Ok(summary) => info!(
                    refreshed = summary.refreshed,
                    dead = summary.dead,
                    total = summary.total,
                    "refresh cycle complete"
                ),
                Err(e) => error!("refresh cycle failed: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.config.interval_seconds)) => {}
                _ = shutdown.recv() => {
                    info!("refresh loop shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep over the whole pool. Entry failures are logged and
    /// counted, never fatal to the cycle.
    pub async fn run_cycle(&self) -> Result<RefreshSummary, nfchecker_store::StoreError> {
        let docs = self
            .store
            .list(collections::FREE_COOKIES, "created_at", None)
            .await?;

        let mut summary = RefreshSummary {
            total: docs.len(),
            ..Default::default()
        };

        for doc in docs {
            let entry: FreeCookie = match decode(doc) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping undecodable pool entry: {}", e);
                    summary.dead += 1;
                    continue;
                }
            };

            if self.refresh_entry(&entry).await {
                summary.refreshed += 1;
            } else {
                summary.dead += 1;
            }
        }

        Ok(summary)
    }

    async fn refresh_entry(&self, entry: &FreeCookie) -> bool {
        let Some(cookies) = usable_cookies(entry) else {
            warn!(id = %entry.id, "pool entry has no usable cookies");
            self.stamp(&entry.id, false, None).await;
            return false;
        };

        let outcome = self.minter.mint(&cookies).await;
        match outcome.token() {
            Some(token) => {
                self.stamp(&entry.id, true, Some(token)).await;
                true
            }
            None => {
                info!(id = %entry.id, reason = ?outcome.reason(), "pool entry went dead");
                self.stamp(&entry.id, false, None).await;
                false
            }
        }
    }

    async fn stamp(&self, id: &str, alive: bool, token: Option<&str>) {
        let mut update = Update::new()
            .set("is_alive", json!(alive))
            .set("last_refreshed", json!(Utc::now()));
        if let Some(token) = token {
            update = update
                .set("nftoken", json!(token))
                .set(
                    "nftoken_link",
                    json!(format!("https://netflix.com/?nftoken={}", token)),
                );
        }

        match self.store.update(collections::FREE_COOKIES, id, update).await {
            Ok(true) => {}
            Ok(false) => warn!(id, "pool entry deleted mid-cycle"),
            Err(e) => error!(id, "pool entry update failed: {}", e),
        }
    }
}

/// Rebuild a cookie set for re-minting: the stored browser cookies are
/// preferred because they are fresher, the original pasted text is the
/// fallback. Either source must carry the primary identity cookie.
fn usable_cookies(entry: &FreeCookie) -> Option<CookieSet> {
    if !entry.browser_cookies.is_empty() {
        let parsed = cookie::parse(&entry.browser_cookies, CookieFormat::Auto);
        if parsed.get_ci("NetflixId").is_some() {
            return Some(parsed);
        }
    }

    if !entry.full_cookie.is_empty() {
        let parsed = cookie::parse(&entry.full_cookie, CookieFormat::Auto);
        if parsed.get_ci("NetflixId").is_some() {
            return Some(parsed);
        }
    }

    None
}
