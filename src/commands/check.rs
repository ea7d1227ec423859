use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::json;

use nfchecker_core::config::AppConfig;
use nfchecker_core::{CheckJob, CookieFormat, Identity, JobStatus};
use nfchecker_jobs::Orchestrator;
use nfchecker_session::{Checker, GraphqlTokenMinter};
use nfchecker_store::{collections, decode, MemoryStore, Store};

/// Combine --text and any number of --file inputs into one batch. Files
/// are joined with a block delimiter so each keeps its own blocks.
fn gather_input(text: Option<String>, files: &[String]) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();
    if let Some(text) = text {
        parts.push(text);
    }
    for path in files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path))?;
        parts.push(content);
    }
    if parts.is_empty() {
        bail!("provide --text and/or --file");
    }
    Ok(parts.join("\n\n\n\n"))
}

fn build_orchestrator(config: &AppConfig, store: Arc<MemoryStore>) -> Result<Orchestrator> {
    let minter = Arc::new(GraphqlTokenMinter::new(config.token.clone())?);
    let checker = Arc::new(Checker::new(config.clone(), minter));
    Ok(Orchestrator::new(
        store,
        checker,
        config.checker.max_concurrency,
    ))
}

pub async fn run(
    config: AppConfig,
    store: Arc<MemoryStore>,
    operator: &Identity,
    text: Option<String>,
    files: Vec<String>,
    format: &str,
    progress: bool,
) -> Result<()> {
    let format = CookieFormat::from_str(format)?;
    let input = gather_input(text, &files)?;
    let orchestrator = build_orchestrator(&config, Arc::clone(&store))?;

    let job = if progress {
        let job_id = orchestrator.submit(operator, &input, format).await?;
        println!("job {} submitted", job_id);
        poll_until_done(&store, &job_id).await?
    } else {
        orchestrator.run_sync(operator, &input, format).await?
    };

    print_job(&job, false);
    Ok(())
}

async fn poll_until_done(store: &Arc<MemoryStore>, job_id: &str) -> Result<CheckJob> {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let Some(doc) = store.get(collections::CHECKS, job_id).await? else {
            bail!("job {} disappeared", job_id);
        };
        let job: CheckJob = decode(doc)?;
        println!(
            "  {}/{} checked ({} valid, {} expired, {} invalid)",
            job.checked_count, job.total, job.valid_count, job.expired_count, job.invalid_count
        );
        if job.status == JobStatus::Done {
            return Ok(job);
        }
    }
}

pub async fn show_job(store: Arc<MemoryStore>, id: &str, summary: bool) -> Result<()> {
    let Some(doc) = store.get(collections::CHECKS, id).await? else {
        bail!("job {} not found", id);
    };
    let job: CheckJob = decode(doc)?;
    print_job(&job, summary);
    Ok(())
}

pub async fn history(store: Arc<MemoryStore>, operator: &Identity, limit: usize) -> Result<()> {
    let docs = store
        .find_eq(
            collections::CHECKS,
            "owner_id",
            &json!(operator.id),
            "created_at",
            Some(limit),
        )
        .await?;

    println!("{} job(s):\n", docs.len());
    for doc in docs {
        let job: CheckJob = decode(doc)?;
        println!(
            "  {}  {}  {}/{} checked, {} valid  [{}]",
            job.id,
            job.created_at.format("%Y-%m-%d %H:%M"),
            job.checked_count,
            job.total,
            job.valid_count,
            match job.status {
                JobStatus::Processing => "processing",
                JobStatus::Done => "done",
            }
        );
    }
    Ok(())
}

fn print_job(job: &CheckJob, summary: bool) {
    println!(
        "\njob {}: {} blocks, {} valid, {} expired, {} invalid",
        job.id, job.total, job.valid_count, job.expired_count, job.invalid_count
    );

    if summary {
        return;
    }

    for result in &job.results {
        println!("\n[{}]", result.status);
        if let Some(email) = &result.email {
            println!("  email:        {}", email);
        }
        if let Some(plan) = &result.plan {
            println!("  plan:         {}", plan);
        }
        if let Some(country) = &result.country {
            println!("  country:      {}", country);
        }
        if let Some(member_since) = &result.member_since {
            println!("  member since: {}", member_since);
        }
        if let Some(next_billing) = &result.next_billing {
            println!("  next billing: {}", next_billing);
        }
        if !result.profiles.is_empty() {
            println!("  profiles:     {}", result.profiles.join(", "));
        }
        if let Some(link) = &result.nftoken_link {
            println!("  login link:   {}", link);
        }
        if let Some(error) = &result.error {
            println!("  error:        {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_input_requires_some_source() {
        assert!(gather_input(None, &[]).is_err());
    }

    #[test]
    fn test_gather_input_joins_with_block_delimiter() {
        let joined = gather_input(Some("a=1".to_string()), &[]).unwrap();
        assert_eq!(joined, "a=1");
    }
}
