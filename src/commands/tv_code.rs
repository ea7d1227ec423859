use std::sync::Arc;

use anyhow::{bail, Result};

use nfchecker_core::config::AppConfig;
use nfchecker_core::{CookieFormat, CookieSet, FreeCookie};
use nfchecker_parser::cookie;
use nfchecker_session::submit_tv_code;
use nfchecker_store::{collections, decode, MemoryStore, Store};

pub async fn run(
    config: AppConfig,
    store: Arc<MemoryStore>,
    cookie_id: &str,
    code: &str,
) -> Result<()> {
    let Some(doc) = store.get(collections::FREE_COOKIES, cookie_id).await? else {
        bail!("pool entry {} not found", cookie_id);
    };
    let entry: FreeCookie = decode(doc)?;

    let report = submit_tv_code(&config, &session_cookies(&entry), code).await?;
    if report.success {
        println!("ok: {}", report.message);
    } else {
        println!("failed: {}", report.message);
    }
    Ok(())
}

/// Stored browser cookies first, original pasted text second, same
/// preference the refresh loop uses.
fn session_cookies(entry: &FreeCookie) -> CookieSet {
    let parsed = cookie::parse(&entry.browser_cookies, CookieFormat::Auto);
    if parsed.get_ci("NetflixId").is_some() {
        return parsed;
    }
    cookie::parse(&entry.full_cookie, CookieFormat::Auto)
}
