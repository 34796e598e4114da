//! Periodic maintenance: cache sweeps, expired token cleanup and weekly log hand-off.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Utc, Weekday};
use modkit::jobs::{Job, JobError, JobScheduler, LogShipper, Trigger};
use modkit::AppContext;
use modkit_cache::CacheAside;
use modkit_db::{CmpOp, Predicate, RecordStore, Scalar};
use runtime::{rotated_log_files, AppConfig, LoggingConfig};
use tracing::{info, instrument};

pub const BLACKLISTED_TOKENS: &str = "blacklisted_tokens";

pub const PURGE_CACHE_JOB: &str = "purge_expired_cache";
pub const DELETE_EXPIRED_TOKENS_JOB: &str = "delete_expired_blacklisted_tokens";
pub const UPLOAD_LOGS_JOB: &str = "upload_logs";

/// Drops cached payloads whose TTL elapsed without a read.
pub struct PurgeExpiredCache {
    cache: CacheAside,
}

impl PurgeExpiredCache {
    pub fn new(cache: CacheAside) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Job for PurgeExpiredCache {
    #[instrument(name = "jobs.purge_expired_cache", skip(self))]
    async fn run(&self) -> anyhow::Result<()> {
        let purged = self
            .cache
            .purge_expired()
            .await
            .context("failed to purge expired cache entries")?;
        if purged > 0 {
            info!(purged, "expired cache entries purged");
        }
        Ok(())
    }
}

/// Removes blacklisted tokens whose `expiration_time` lies before the retention cutoff.
pub struct DeleteExpiredTokens {
    store: Arc<dyn RecordStore>,
    retention: chrono::Duration,
}

impl DeleteExpiredTokens {
    pub fn new(store: Arc<dyn RecordStore>, retention_days: u32) -> Self {
        Self {
            store,
            retention: chrono::Duration::days(i64::from(retention_days)),
        }
    }
}

#[async_trait]
impl Job for DeleteExpiredTokens {
    #[instrument(name = "jobs.delete_expired_blacklisted_tokens", skip(self))]
    async fn run(&self) -> anyhow::Result<()> {
        let cutoff = Utc::now() - self.retention;
        let expired = Predicate::Compare {
            path: "expiration_time".to_string(),
            op: CmpOp::Lt,
            value: Scalar::DateTime(cutoff),
        };
        let deleted = self
            .store
            .delete_many(BLACKLISTED_TOKENS, &expired)
            .await
            .context("failed to delete expired blacklisted tokens")?;
        info!(deleted, %cutoff, "expired blacklisted tokens removed");
        Ok(())
    }
}

/// Hands the newest rotated log files to a [`LogShipper`].
pub struct UploadLogs {
    shipper: Arc<dyn LogShipper>,
    logging: LoggingConfig,
    base_dir: PathBuf,
    count: usize,
}

impl UploadLogs {
    pub fn new(
        shipper: Arc<dyn LogShipper>,
        logging: LoggingConfig,
        base_dir: PathBuf,
        count: usize,
    ) -> Self {
        Self {
            shipper,
            logging,
            base_dir,
            count,
        }
    }
}

#[async_trait]
impl Job for UploadLogs {
    #[instrument(name = "jobs.upload_logs", skip(self))]
    async fn run(&self) -> anyhow::Result<()> {
        let files = rotated_log_files(&self.logging, &self.base_dir, self.count);
        if files.is_empty() {
            info!("no rotated log files to upload");
            return Ok(());
        }
        let n = files.len();
        self.shipper.ship(files).await?;
        info!(files = n, "log files uploaded");
        Ok(())
    }
}

/// Copies log files into a local archive directory.
pub struct ArchiveShipper {
    dir: PathBuf,
}

impl ArchiveShipper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl LogShipper for ArchiveShipper {
    async fn ship(&self, files: Vec<PathBuf>) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("cannot create archive dir {}", self.dir.display()))?;
        for file in files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let target = self.dir.join(name);
            tokio::fs::copy(&file, &target).await.with_context(|| {
                format!("cannot archive {} to {}", file.display(), target.display())
            })?;
        }
        Ok(())
    }
}

/// Register the cache sweep and the maintenance jobs enabled in `config.jobs`.
///
/// The cache sweep runs even when `jobs.enabled` is off.
pub fn register_jobs(
    scheduler: &dyn JobScheduler,
    config: &AppConfig,
    ctx: &AppContext,
) -> Result<(), JobError> {
    scheduler.schedule(
        Arc::new(PurgeExpiredCache::new(ctx.cache().clone())),
        Trigger::every(std::time::Duration::from_secs(config.cache.purge_interval_secs))?,
        PURGE_CACHE_JOB,
    )?;

    let jobs = &config.jobs;
    if !jobs.enabled {
        info!("periodic jobs are disabled");
        return Ok(());
    }

    scheduler.schedule(
        Arc::new(DeleteExpiredTokens::new(ctx.store(), jobs.token_retention_days)),
        Trigger::daily(0, 5)?,
        DELETE_EXPIRED_TOKENS_JOB,
    )?;

    if jobs.upload_logs {
        let archive = resolve(config.home_dir(), &jobs.archive_dir);
        let logging = config
            .logging
            .clone()
            .unwrap_or_else(runtime::config::default_logging_config);
        scheduler.schedule(
            Arc::new(UploadLogs::new(
                Arc::new(ArchiveShipper::new(archive)),
                logging,
                config.home_dir().to_path_buf(),
                jobs.log_upload_count,
            )),
            Trigger::weekly(Weekday::Sun, 0, 5)?,
            UPLOAD_LOGS_JOB,
        )?;
    }
    Ok(())
}

fn resolve(base: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
