//! Backup run orchestration.
//!
//! One run is strictly sequential: archive the source directory, upload the
//! archive, classify the remote backup set, then prune what fell out of
//! retention. Each stage has its own failure policy: archiving and upload
//! abort the run, listing problems degrade to "no prior backups," and
//! deletions fail individually without stopping the loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::naming;
use crate::ports::{Archiver, Confirm, Transport};
use crate::repository;
use crate::retention::{classify, RetentionPolicy};
use crate::utils::errors::Result;

/// Summary of one completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Identifier of the archive uploaded by this run
    pub identifier: String,

    /// Remote backups retained by the policy
    pub kept: usize,

    /// Remote backups classified for deletion
    pub eligible: usize,

    /// Deletions that succeeded
    pub deleted: usize,

    /// Deletions that failed (run still succeeds)
    pub delete_failures: usize,
}

/// Main backup orchestrator. The archiver, transport, and confirmation
/// gate are injected so runs can be driven against in-memory fakes.
pub struct BackupExecutor<A, T, C> {
    archiver: A,
    transport: T,
    confirm: C,
}

impl<A: Archiver, T: Transport, C: Confirm> BackupExecutor<A, T, C> {
    pub fn new(archiver: A, transport: T, confirm: C) -> Self {
        Self {
            archiver,
            transport,
            confirm,
        }
    }

    /// Execute one backup run for the given calendar date.
    ///
    /// With `dry_run` set, the archive is still created and uploaded but
    /// nothing is deleted; the run reports what would have been pruned.
    pub async fn execute(
        &self,
        config: &Config,
        today: NaiveDate,
        dry_run: bool,
    ) -> Result<RunReport> {
        // Tool availability is checked before any side effect
        self.archiver.check_available().await?;
        self.transport.check_available().await?;

        let identifier = naming::build_identifier(today, &config.source.prefix);
        info!(
            archive = %identifier,
            source = %config.source.path.display(),
            "Starting backup run"
        );

        // The staging archive is removed on every exit path below,
        // including the failure returns.
        let staging = StagingArchive::new(&identifier)?;
        self.archiver
            .create_archive(
                &config.source.path,
                staging.path(),
                config.archive.compression_level,
            )
            .await?;
        info!(archive = %identifier, "Archive created");

        self.transport
            .upload(staging.path(), &config.remote.destination)
            .await?;
        info!(destination = %config.remote.destination, "Archive uploaded");
        drop(staging);

        // Retention evaluation is best-effort: a listing failure means we
        // simply have nothing to prune this run.
        let listing = match self.transport.list(&config.remote.destination).await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Could not list remote backups, treating as none");
                Vec::new()
            }
        };

        let records = repository::parse_listing(&listing, &config.source.prefix);
        let policy = RetentionPolicy {
            keep_daily: config.retention.keep_daily,
            keep_weekly: config.retention.keep_weekly,
            keep_monthly: config.retention.keep_monthly,
        };
        let classification = classify(records, &policy);

        for (record, reason) in &classification.kept {
            debug!(entry = %record.identifier, tier = %reason, "Keeping remote backup");
        }

        let kept = classification.kept.len();
        let eligible = classification.to_delete.len();

        if eligible == 0 {
            info!(kept, "No backups eligible for deletion");
            return Ok(RunReport {
                identifier,
                kept,
                eligible,
                deleted: 0,
                delete_failures: 0,
            });
        }

        if dry_run {
            for record in &classification.to_delete {
                info!(entry = %record.identifier, "Would delete remote backup");
            }
            info!(eligible, "Dry run, leaving remote backups untouched");
            return Ok(RunReport {
                identifier,
                kept,
                eligible,
                deleted: 0,
                delete_failures: 0,
            });
        }

        if !config.remote.auto_confirm && !self.confirm.confirm(eligible) {
            info!("Deletion declined, leaving remote backups untouched");
            return Ok(RunReport {
                identifier,
                kept,
                eligible,
                deleted: 0,
                delete_failures: 0,
            });
        }

        // Deletions are independent: one failure does not stop the rest
        let mut deleted = 0;
        let mut delete_failures = 0;
        for record in &classification.to_delete {
            match self
                .transport
                .delete(&config.remote.destination, &record.identifier)
                .await
            {
                Ok(()) => {
                    info!(entry = %record.identifier, "Deleted remote backup");
                    deleted += 1;
                }
                Err(e) => {
                    warn!(entry = %record.identifier, error = %e, "Failed to delete remote backup");
                    delete_failures += 1;
                }
            }
        }

        Ok(RunReport {
            identifier,
            kept,
            eligible,
            deleted,
            delete_failures,
        })
    }
}

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Staging area for the archive being produced.
///
/// The directory (and any partial archive inside it) is removed when the
/// guard drops, on the success and failure paths alike. The path is unique
/// per run, so concurrent runs never share a staging artifact.
struct StagingArchive {
    dir: PathBuf,
    path: PathBuf,
}

impl StagingArchive {
    fn new(identifier: &str) -> Result<Self> {
        let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "backup-rotator-{}-{}",
            std::process::id(),
            seq
        ));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(identifier);
        Ok(Self { dir, path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingArchive {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove staging directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utils::errors::RotatorError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    struct FakeArchiver {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Archiver for FakeArchiver {
        async fn check_available(&self) -> Result<()> {
            Ok(())
        }

        async fn create_archive(&self, _source: &Path, _dest: &Path, _level: u32) -> Result<()> {
            if self.fail {
                return Err(RotatorError::Archive("tar exploded".to_string()));
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct TransportLog {
        uploads: Vec<PathBuf>,
        deleted: Vec<String>,
    }

    struct FakeTransport {
        /// None simulates a listing failure
        listing: Option<Vec<String>>,
        fail_upload: bool,
        fail_delete: HashSet<String>,
        log: Arc<Mutex<TransportLog>>,
    }

    impl FakeTransport {
        fn with_listing(entries: &[&str]) -> (Self, Arc<Mutex<TransportLog>>) {
            let log = Arc::new(Mutex::new(TransportLog::default()));
            let transport = Self {
                listing: Some(entries.iter().map(|s| s.to_string()).collect()),
                fail_upload: false,
                fail_delete: HashSet::new(),
                log: log.clone(),
            };
            (transport, log)
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn check_available(&self) -> Result<()> {
            Ok(())
        }

        async fn upload(&self, local: &Path, _remote: &str) -> Result<()> {
            if self.fail_upload {
                return Err(RotatorError::Upload("connection reset".to_string()));
            }
            self.log.lock().unwrap().uploads.push(local.to_path_buf());
            Ok(())
        }

        async fn list(&self, _remote: &str) -> Result<Vec<String>> {
            match &self.listing {
                Some(names) => Ok(names.clone()),
                None => Err(RotatorError::Listing("remote unreachable".to_string())),
            }
        }

        async fn delete(&self, _remote: &str, entry: &str) -> Result<()> {
            if self.fail_delete.contains(entry) {
                return Err(RotatorError::Deletion(format!("permission denied: {entry}")));
            }
            self.log.lock().unwrap().deleted.push(entry.to_string());
            Ok(())
        }
    }

    struct FakeConfirm {
        answer: bool,
        asked: Arc<AtomicUsize>,
    }

    impl FakeConfirm {
        fn answering(answer: bool) -> (Self, Arc<AtomicUsize>) {
            let asked = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    answer,
                    asked: asked.clone(),
                },
                asked,
            )
        }
    }

    impl Confirm for FakeConfirm {
        fn confirm(&self, _pending_deletions: usize) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn archiver() -> (FakeArchiver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FakeArchiver {
                fail: false,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.source.path = PathBuf::from("/data");
        config.remote.destination = "offsite:backups/host".to_string();
        config.retention.keep_daily = 2;
        config.retention.keep_weekly = 1;
        config.retention.keep_monthly = 1;
        config
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    const LISTING: &[&str] = &[
        "2024-01-10.tar.gz",
        "2024-01-09.tar.gz",
        "2024-01-03.tar.gz",
        "2023-12-15.tar.gz",
        "2023-11-01.tar.gz",
    ];

    #[tokio::test]
    async fn test_full_run_prunes_expired_backups() {
        let (archiver, archive_calls) = archiver();
        let (transport, log) = FakeTransport::with_listing(LISTING);
        let (confirm, asked) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&test_config(), today(), false).await.unwrap();

        assert_eq!(report.identifier, "2024-01-10.tar.gz");
        assert_eq!(report.kept, 2);
        assert_eq!(report.eligible, 3);
        assert_eq!(report.deleted, 3);
        assert_eq!(report.delete_failures, 0);

        assert_eq!(archive_calls.load(Ordering::SeqCst), 1);
        assert_eq!(asked.load(Ordering::SeqCst), 1);

        let log = log.lock().unwrap();
        assert_eq!(log.uploads.len(), 1);
        assert_eq!(
            log.deleted,
            vec![
                "2024-01-03.tar.gz",
                "2023-12-15.tar.gz",
                "2023-11-01.tar.gz",
            ]
        );
    }

    #[tokio::test]
    async fn test_archive_failure_aborts_before_upload() {
        let (_, calls) = archiver();
        let failing = FakeArchiver {
            fail: true,
            calls: calls.clone(),
        };
        let (transport, log) = FakeTransport::with_listing(LISTING);
        let (confirm, asked) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(failing, transport, confirm);
        let err = executor
            .execute(&test_config(), today(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, RotatorError::Archive(_)));
        assert!(log.lock().unwrap().uploads.is_empty());
        assert_eq!(asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_before_retention() {
        let (archiver, _) = archiver();
        let (mut transport, log) = FakeTransport::with_listing(LISTING);
        transport.fail_upload = true;
        let (confirm, asked) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let err = executor
            .execute(&test_config(), today(), false)
            .await
            .unwrap_err();

        assert!(matches!(err, RotatorError::Upload(_)));
        assert!(log.lock().unwrap().deleted.is_empty());
        assert_eq!(asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_listing_failure_is_not_fatal() {
        let (archiver, _) = archiver();
        let log = Arc::new(Mutex::new(TransportLog::default()));
        let transport = FakeTransport {
            listing: None,
            fail_upload: false,
            fail_delete: HashSet::new(),
            log: log.clone(),
        };
        let (confirm, asked) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&test_config(), today(), false).await.unwrap();

        assert_eq!(report.kept, 0);
        assert_eq!(report.eligible, 0);
        assert_eq!(report.deleted, 0);
        assert_eq!(asked.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().deleted.is_empty());
    }

    #[tokio::test]
    async fn test_empty_listing_completes_successfully() {
        let (archiver, _) = archiver();
        let (transport, log) = FakeTransport::with_listing(&[]);
        let (confirm, asked) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&test_config(), today(), false).await.unwrap();

        assert_eq!(report.eligible, 0);
        assert_eq!(asked.load(Ordering::SeqCst), 0);
        assert!(log.lock().unwrap().deleted.is_empty());
    }

    #[tokio::test]
    async fn test_declined_confirmation_leaves_remote_untouched() {
        let (archiver, _) = archiver();
        let (transport, log) = FakeTransport::with_listing(LISTING);
        let (confirm, asked) = FakeConfirm::answering(false);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&test_config(), today(), false).await.unwrap();

        assert_eq!(asked.load(Ordering::SeqCst), 1);
        assert_eq!(report.eligible, 3);
        assert_eq!(report.deleted, 0);
        assert!(log.lock().unwrap().deleted.is_empty());
    }

    #[tokio::test]
    async fn test_auto_confirm_skips_the_prompt() {
        let (archiver, _) = archiver();
        let (transport, log) = FakeTransport::with_listing(LISTING);
        let (confirm, asked) = FakeConfirm::answering(false);

        let mut config = test_config();
        config.remote.auto_confirm = true;

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&config, today(), false).await.unwrap();

        assert_eq!(asked.load(Ordering::SeqCst), 0);
        assert_eq!(report.deleted, 3);
        assert_eq!(log.lock().unwrap().deleted.len(), 3);
    }

    #[tokio::test]
    async fn test_partial_delete_failure_still_succeeds() {
        let (archiver, _) = archiver();
        let (mut transport, log) = FakeTransport::with_listing(LISTING);
        transport.fail_delete.insert("2023-12-15.tar.gz".to_string());
        let (confirm, _) = FakeConfirm::answering(true);

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&test_config(), today(), false).await.unwrap();

        assert_eq!(report.eligible, 3);
        assert_eq!(report.deleted, 2);
        assert_eq!(report.delete_failures, 1);
        assert_eq!(
            log.lock().unwrap().deleted,
            vec!["2024-01-03.tar.gz", "2023-11-01.tar.gz"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_deletes_nothing() {
        let (archiver, _) = archiver();
        let (transport, log) = FakeTransport::with_listing(LISTING);
        let (confirm, asked) = FakeConfirm::answering(true);

        let mut config = test_config();
        config.remote.auto_confirm = true;

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&config, today(), true).await.unwrap();

        assert_eq!(report.eligible, 3);
        assert_eq!(report.deleted, 0);
        assert_eq!(asked.load(Ordering::SeqCst), 0);

        let log = log.lock().unwrap();
        assert_eq!(log.uploads.len(), 1);
        assert!(log.deleted.is_empty());
    }

    #[tokio::test]
    async fn test_prefix_scopes_the_run_to_one_stream() {
        let (archiver, _) = archiver();
        let (transport, log) = FakeTransport::with_listing(&[
            "2024-01-10_www.tar.gz",
            "2024-01-09_www.tar.gz",
            "2024-01-09.tar.gz",
            "2024-01-08_db.tar.gz",
        ]);
        let (confirm, _) = FakeConfirm::answering(true);

        let mut config = test_config();
        config.source.prefix = "www".to_string();
        config.retention.keep_daily = 1;
        config.retention.keep_weekly = 0;
        config.retention.keep_monthly = 0;

        let executor = BackupExecutor::new(archiver, transport, confirm);
        let report = executor.execute(&config, today(), false).await.unwrap();

        assert_eq!(report.identifier, "2024-01-10_www.tar.gz");
        // Only the www stream is accounted; other streams are untouchable
        assert_eq!(report.kept, 1);
        assert_eq!(log.lock().unwrap().deleted, vec!["2024-01-09_www.tar.gz"]);
    }

    #[test]
    fn test_staging_archive_removed_on_drop() {
        let staging = StagingArchive::new("2024-01-10.tar.gz").unwrap();
        let dir = staging.dir.clone();
        std::fs::write(staging.path(), b"partial archive").unwrap();
        assert!(dir.exists());

        drop(staging);
        assert!(!dir.exists());
    }
}
