use std::sync::Arc;

use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use nfchecker_core::{
    CheckError, CheckJob, CheckStatus, CookieChecker, CookieFormat, Identity, ValidLogEntry,
    ValidationResult,
};
use nfchecker_parser::blocks::split_blocks;
use nfchecker_store::{collections, decode, encode, Store, Update};

/// Fans independent cookie blocks out over the checker seam, bounded by a
/// global semaphore shared across all simultaneous jobs. Progress lands in
/// the job record through atomic increments, so two blocks finishing at
/// once never lose a counter.
pub struct Orchestrator {
    store: Arc<dyn Store>,
    checker: Arc<dyn CookieChecker>,
    permits: Arc<Semaphore>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn Store>, checker: Arc<dyn CookieChecker>, max_concurrency: usize) -> Self {
        Self {
            store,
            checker,
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Create the job record and return its id immediately; blocks are
    /// processed in the background.
    pub async fn submit(
        &self,
        owner: &Identity,
        text: &str,
        format: CookieFormat,
    ) -> Result<String, CheckError> {
        let (job_id, blocks) = self.create_job(owner, text).await?;

        let store = Arc::clone(&self.store);
        let checker = Arc::clone(&self.checker);
        let permits = Arc::clone(&self.permits);
        let owner = owner.clone();
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            run_job(store, checker, permits, &spawned_id, &owner, blocks, format).await;
        });

        Ok(job_id)
    }

    /// Synchronous variant: process every block before returning the
    /// finished job record. Valid results are logged identically.
    pub async fn run_sync(
        &self,
        owner: &Identity,
        text: &str,
        format: CookieFormat,
    ) -> Result<CheckJob, CheckError> {
        let (job_id, blocks) = self.create_job(owner, text).await?;

        run_job(
            Arc::clone(&self.store),
            Arc::clone(&self.checker),
            Arc::clone(&self.permits),
            &job_id,
            owner,
            blocks,
            format,
        )
        .await;

        let doc = self
            .store
            .get(collections::CHECKS, &job_id)
            .await
            .map_err(|e| CheckError::Store(e.to_string()))?
            .ok_or_else(|| CheckError::NotFound(format!("job {}", job_id)))?;
        decode(doc).map_err(|e| CheckError::Store(e.to_string()))
    }

    /// Split the input, reject empty batches, and persist the processing
    /// job record before any worker starts.
    async fn create_job(
        &self,
        owner: &Identity,
        text: &str,
    ) -> Result<(String, Vec<String>), CheckError> {
        let blocks = split_blocks(text);
        if blocks.is_empty() {
            return Err(CheckError::Input("No cookies found".to_string()));
        }

        let job = CheckJob::new(owner, blocks.len());
        let job_id = job.id.clone();
        let doc = encode(&job).map_err(|e| CheckError::Store(e.to_string()))?;
        self.store
            .insert(collections::CHECKS, doc)
            .await
            .map_err(|e| CheckError::Store(e.to_string()))?;

        Ok((job_id, blocks))
    }
}

async fn run_job(
    store: Arc<dyn Store>,
    checker: Arc<dyn CookieChecker>,
    permits: Arc<Semaphore>,
    job_id: &str,
    owner: &Identity,
    blocks: Vec<String>,
    format: CookieFormat,
) {
    info!(job_id, total = blocks.len(), "bulk check started");

    let mut workers = JoinSet::new();
    for block in blocks {
        let checker = Arc::clone(&checker);
        let permits = Arc::clone(&permits);
        workers.spawn(async move {
            // Closing the semaphore is not part of this design; treat a
            // closed pool as an empty result rather than panicking.
            let _permit = permits.acquire_owned().await;
            checker.check(&block, format).await
        });
    }

    while let Some(joined) = workers.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => {
                warn!(job_id, "check worker failed: {}", e);
                let mut fallback = ValidationResult::pending("");
                fallback.error = Some(format!("worker failed: {}", e));
                fallback
            }
        };

        record_result(&store, job_id, owner, &result).await;
    }

    let done = Update::new().set("status", json!("done"));
    match store.update(collections::CHECKS, job_id, done).await {
        Ok(true) => info!(job_id, "bulk check done"),
        Ok(false) => warn!(job_id, "job record vanished before completion"),
        Err(e) => error!(job_id, "failed to finalize job: {}", e),
    }
}

/// One atomic progress update per finished block, plus the valid-log side
/// record when the block came back valid.
async fn record_result(
    store: &Arc<dyn Store>,
    job_id: &str,
    owner: &Identity,
    result: &ValidationResult,
) {
    let counter = match result.status {
        CheckStatus::Valid => "valid_count",
        CheckStatus::Expired => "expired_count",
        CheckStatus::Invalid => "invalid_count",
    };

    let result_doc = match serde_json::to_value(result) {
        Ok(doc) => doc,
        Err(e) => {
            error!(job_id, "result encode failed: {}", e);
            return;
        }
    };

    let update = Update::new()
        .push("results", result_doc)
        .inc("checked_count", 1)
        .inc(counter, 1);
    if let Err(e) = store.update(collections::CHECKS, job_id, update).await {
        error!(job_id, "progress update failed: {}", e);
    }

    if result.status == CheckStatus::Valid {
        let entry = ValidLogEntry::from_result(result, owner);
        match encode(&entry) {
            Ok(doc) => {
                if let Err(e) = store.insert(collections::VALID_LOGS, doc).await {
                    error!(job_id, "valid log insert failed: {}", e);
                }
            }
            Err(e) => error!(job_id, "valid log encode failed: {}", e),
        }
    }
}
