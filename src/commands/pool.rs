use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use serde_json::{json, Value};

use nfchecker_core::config::AppConfig;
use nfchecker_core::{
    new_id, CheckStatus, CookieChecker, CookieFormat, FreeCookie, Identity, ValidationResult,
};
use nfchecker_jobs::RefreshLoop;
use nfchecker_session::{Checker, GraphqlTokenMinter};
use nfchecker_store::{collections, decode, encode, MemoryStore, Store};

const DISPLAY_LIMIT_ID: &str = "pool_display_limit";

fn require_master(operator: &Identity) -> Result<()> {
    if !operator.is_master {
        bail!("admin access required");
    }
    Ok(())
}

/// Validate the cookie through the full pipeline and add it to the pool.
pub async fn add(
    config: AppConfig,
    store: Arc<MemoryStore>,
    operator: &Identity,
    text: Option<String>,
    file: Option<String>,
    format: &str,
) -> Result<()> {
    require_master(operator)?;

    let format = CookieFormat::from_str(format)?;
    let input = match (text, file) {
        (Some(text), None) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path))?,
        _ => bail!("provide exactly one of --text or --file"),
    };

    let minter = Arc::new(GraphqlTokenMinter::new(config.token.clone())?);
    let checker = Checker::new(config, minter);
    let result = checker.check(&input, format).await;

    if result.status != CheckStatus::Valid {
        bail!(
            "cookie is {} ({}), not adding to pool",
            result.status,
            result.error.as_deref().unwrap_or("no details")
        );
    }

    let entry = pool_entry_from_result(&result, operator);
    let id = entry.id.clone();
    store
        .insert(collections::FREE_COOKIES, encode(&entry)?)
        .await?;

    println!(
        "added {} ({}, {})",
        id,
        entry.email.as_deref().unwrap_or("unknown email"),
        entry.plan.as_deref().unwrap_or("unknown plan"),
    );
    Ok(())
}

fn pool_entry_from_result(result: &ValidationResult, operator: &Identity) -> FreeCookie {
    FreeCookie {
        id: new_id(),
        email: result.email.clone(),
        plan: result.plan.clone(),
        country: result.country.clone(),
        member_since: result.member_since.clone(),
        next_billing: result.next_billing.clone(),
        profiles: result.profiles.clone(),
        browser_cookies: result.browser_cookies.clone(),
        full_cookie: result.full_cookie.clone(),
        nftoken: result.nftoken.clone(),
        nftoken_link: result.nftoken_link.clone(),
        is_alive: None,
        last_refreshed: None,
        added_by: operator.id.clone(),
        created_at: Utc::now(),
    }
}

/// Admin view shows everything; the default view is capped by the stored
/// display limit and never exposes cookie strings.
pub async fn list(
    config: AppConfig,
    store: Arc<MemoryStore>,
    operator: &Identity,
    all: bool,
) -> Result<()> {
    let limit = if all && operator.is_master {
        None
    } else {
        Some(display_limit(&store, &config).await?)
    };

    let docs = store
        .list(collections::FREE_COOKIES, "created_at", limit)
        .await?;

    println!("{} pool entr(ies):\n", docs.len());
    for doc in docs {
        let entry: FreeCookie = decode(doc)?;
        let liveness = match entry.is_alive {
            Some(true) => "alive",
            Some(false) => "dead",
            None => "unchecked",
        };
        println!(
            "  {}  {}  {}  {}  [{}]",
            entry.id,
            entry.email.as_deref().unwrap_or("-"),
            entry.plan.as_deref().unwrap_or("-"),
            entry.country.as_deref().unwrap_or("-"),
            liveness,
        );
        if let Some(link) = &entry.nftoken_link {
            println!("      {}", link);
        }
        if all && operator.is_master && !entry.browser_cookies.is_empty() {
            println!("      cookies: {}", entry.browser_cookies);
        }
    }
    Ok(())
}

pub async fn remove(store: Arc<MemoryStore>, operator: &Identity, id: &str) -> Result<()> {
    require_master(operator)?;
    if !store.delete(collections::FREE_COOKIES, id).await? {
        bail!("pool entry {} not found", id);
    }
    println!("removed {}", id);
    Ok(())
}

pub async fn set_limit(store: Arc<MemoryStore>, operator: &Identity, count: usize) -> Result<()> {
    require_master(operator)?;
    if count == 0 {
        bail!("display limit must be at least 1");
    }

    let doc = json!({ "id": DISPLAY_LIMIT_ID, "value": count });
    store.insert(collections::SETTINGS, doc).await?;
    println!("display limit set to {}", count);
    Ok(())
}

async fn display_limit(store: &Arc<MemoryStore>, config: &AppConfig) -> Result<usize> {
    let stored = store
        .get(collections::SETTINGS, DISPLAY_LIMIT_ID)
        .await?
        .and_then(|doc| doc.get("value").and_then(Value::as_u64))
        .map(|v| v as usize);
    Ok(stored.unwrap_or(config.pool.default_display_limit))
}

/// One synchronous refresh cycle, same work the watch loop does on its
/// timer.
pub async fn refresh(config: AppConfig, store: Arc<MemoryStore>, operator: &Identity) -> Result<()> {
    require_master(operator)?;

    let minter = Arc::new(GraphqlTokenMinter::new(config.token.clone())?);
    let refresher = RefreshLoop::new(store, minter, config.refresh.clone());
    let summary = refresher.run_cycle().await?;

    println!(
        "refreshed {} / dead {} / total {}",
        summary.refreshed, summary.dead, summary.total
    );
    Ok(())
}
