use std::sync::Arc;

use anyhow::{bail, Result};

use nfchecker_core::{Identity, ValidLogEntry};
use nfchecker_store::{collections, decode, MemoryStore, Store};

fn require_master(operator: &Identity) -> Result<()> {
    if !operator.is_master {
        bail!("admin access required");
    }
    Ok(())
}

pub async fn list(store: Arc<MemoryStore>, limit: usize) -> Result<()> {
    let docs = store
        .list(collections::VALID_LOGS, "created_at", Some(limit))
        .await?;

    println!("{} valid check(s):\n", docs.len());
    for doc in docs {
        let entry: ValidLogEntry = decode(doc)?;
        println!(
            "  {}  {}  {}  {}  by {}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.email.as_deref().unwrap_or("-"),
            entry.plan.as_deref().unwrap_or("-"),
            entry.checked_by_label,
        );
    }
    Ok(())
}

pub async fn delete(store: Arc<MemoryStore>, operator: &Identity, id: &str) -> Result<()> {
    require_master(operator)?;
    if !store.delete(collections::VALID_LOGS, id).await? {
        bail!("log entry {} not found", id);
    }
    println!("deleted {}", id);
    Ok(())
}

pub async fn clear(store: Arc<MemoryStore>, operator: &Identity) -> Result<()> {
    require_master(operator)?;
    let removed = store.clear(collections::VALID_LOGS).await?;
    println!("cleared {} log entries", removed);
    Ok(())
}
