//! The audit orchestrator: scan, write the report, notify.

use crate::audit;
use crate::core::{
    ArcScanner, AuditError, AuditReport, ResourceScanner, ScanContext, ScanError, ViolationSet,
};
use crate::notify::Notifier;
use crate::report::{archive_name, create_zip, summary_message, thread_message, CsvReportWriter};
use crate::report::ARCHIVE_TITLE;

use chrono::{FixedOffset, Offset, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default output directory for CSV exports and the archive.
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/tagwarden";

/// Default offset used to date reports (+09:00).
pub const DEFAULT_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Configuration for the auditor.
#[derive(Debug, Clone)]
pub struct AuditorConfig {
    /// Directory that receives the CSV files and the archive. Files already
    /// in it are removed at the start of every report.
    pub output_dir: PathBuf,

    /// Offset used to compute the report date.
    pub utc_offset: FixedOffset,

    /// Extension of the files packed into the archive.
    pub report_extension: String,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            utc_offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_SECS).unwrap_or(Utc.fix()),
            report_extension: "csv".to_string(),
        }
    }
}

impl AuditorConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Sets the offset used for the report date.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// Builder for creating a `LabelAuditor`.
#[derive(Default)]
pub struct LabelAuditorBuilder {
    scanner: Option<ArcScanner>,
    notifier: Option<Arc<dyn Notifier>>,
    config: AuditorConfig,
}

impl LabelAuditorBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scanner.
    pub fn with_scanner<S: ResourceScanner + 'static>(mut self, scanner: S) -> Self {
        self.scanner = Some(Arc::new(scanner));
        self
    }

    /// Sets a scanner wrapped in an Arc.
    pub fn with_arc_scanner(mut self, scanner: ArcScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Sets the notifier. Without one, the report is written but not sent.
    pub fn with_notifier<N: Notifier + 'static>(mut self, notifier: N) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Sets a notifier wrapped in an Arc.
    pub fn with_arc_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: AuditorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the auditor.
    pub fn build(self) -> Result<LabelAuditor, ScanError> {
        let scanner = self
            .scanner
            .ok_or_else(|| ScanError::configuration("A scanner is required"))?;

        Ok(LabelAuditor {
            scanner,
            notifier: self.notifier,
            config: self.config,
        })
    }
}

/// Runs one audit: scan, write the report, notify.
///
/// A run either completes every step or stops at the first error. A failed
/// scan leaves the output directory untouched and sends nothing.
pub struct LabelAuditor {
    scanner: ArcScanner,
    notifier: Option<Arc<dyn Notifier>>,
    config: AuditorConfig,
}

impl LabelAuditor {
    /// Creates a new builder.
    pub fn builder() -> LabelAuditorBuilder {
        LabelAuditorBuilder::new()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AuditorConfig {
        &self.config
    }

    /// Runs the audit for `context`.
    pub async fn run(&self, context: &ScanContext) -> Result<AuditReport, AuditError> {
        tracing::info!(
            run_id = %context.run_id,
            scanner = %self.scanner.name(),
            scope = %context.scope,
            "Starting audit"
        );

        match self.run_steps(context).await {
            Ok(report) => {
                tracing::info!(
                    run_id = %report.run_id,
                    missing_required = report.missing_required_count(),
                    banned_present = report.banned_count(),
                    duration_ms = report.duration.as_millis() as u64,
                    "Audit completed"
                );
                Ok(report)
            }
            Err(e) => {
                audit::emit_run_failed(context, self.scanner.provider(), &e);
                Err(e)
            }
        }
    }

    async fn run_steps(&self, context: &ScanContext) -> Result<AuditReport, AuditError> {
        let violations = self.scan(context).await?;

        let date = context
            .started_at
            .with_timezone(&self.config.utc_offset)
            .format("%Y-%m-%d")
            .to_string();

        let archive = self.write_report(&violations, &date, &context.scope).await?;

        let completed_at = Utc::now();
        let report = AuditReport {
            run_id: context.run_id.clone(),
            provider: self.scanner.provider(),
            scope: context.scope.clone(),
            date,
            violations,
            archive_path: Some(archive.clone()),
            started_at: context.started_at,
            completed_at,
            duration: (completed_at - context.started_at)
                .to_std()
                .unwrap_or_default(),
        };
        audit::emit_report_written(&report, &archive);

        if let Some(notifier) = &self.notifier {
            self.notify(notifier.as_ref(), &report, &archive).await?;
        } else {
            tracing::info!(archive = %archive.display(), "No notifier configured, skipping notification");
        }

        Ok(report)
    }

    async fn scan(&self, context: &ScanContext) -> Result<ViolationSet, ScanError> {
        let scanned = self.scanner.scan(context).await;

        if let Err(e) = self.scanner.close().await {
            tracing::warn!(scanner = %self.scanner.name(), error = %e, "Failed to close scanner");
        }

        scanned
    }

    async fn write_report(
        &self,
        violations: &ViolationSet,
        date: &str,
        scope: &str,
    ) -> Result<PathBuf, AuditError> {
        let dir = &self.config.output_dir;
        CsvReportWriter::new(dir).write(violations).await?;

        let archive = dir.join(archive_name(date, scope));
        create_zip(dir, &archive, &self.config.report_extension).await?;

        Ok(archive)
    }

    async fn notify(
        &self,
        notifier: &dyn Notifier,
        report: &AuditReport,
        archive: &Path,
    ) -> Result<(), AuditError> {
        let ts = notifier.post_message(&summary_message(report), None).await?;
        notifier
            .upload_file(archive, ARCHIVE_TITLE, Some(&ts))
            .await?;
        notifier
            .post_message(&thread_message(&report.violations), Some(&ts))
            .await?;

        tracing::info!(notifier = %notifier.name(), thread_ts = %ts, "Notification sent");
        Ok(())
    }
}

impl std::fmt::Debug for LabelAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelAuditor")
            .field("scanner", &self.scanner.name())
            .field("notifier", &self.notifier.as_ref().map(|n| n.name()))
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::gcp::{AssetInventoryScanner, ResourceSearchResult};
    use crate::backends::mock::MockAssetInventory;
    use crate::notify::{RecordingNotifier, SentItem};
    use crate::policy::{ResourcePolicy, ResourceScope};
    use chrono::TimeZone;
    use tempfile::TempDir;

    const INSTANCE: &str = "compute.googleapis.com/Instance";

    fn scanner(api: MockAssetInventory) -> AssetInventoryScanner<MockAssetInventory> {
        let policy = ResourcePolicy::new(
            ResourceScope::Exclude(Default::default()),
            vec!["env".to_string()],
            vec!["temp".to_string()],
        );
        AssetInventoryScanner::new(api, policy)
    }

    fn context() -> ScanContext {
        let mut ctx = ScanContext::new("my-project");
        ctx.started_at = Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap();
        ctx
    }

    #[tokio::test]
    async fn test_run_writes_report_and_notifies_in_order() {
        let dir = TempDir::new().unwrap();
        let api = MockAssetInventory::new().with_page(vec![
            ResourceSearchResult::new(INSTANCE, "vm-1"),
            ResourceSearchResult::new(INSTANCE, "vm-2")
                .with_label("env", "prod")
                .with_label("temp", "1"),
        ]);
        let notifier = Arc::new(RecordingNotifier::new());

        let auditor = LabelAuditor::builder()
            .with_scanner(scanner(api))
            .with_arc_notifier(notifier.clone())
            .with_config(AuditorConfig::new().with_output_dir(dir.path()))
            .build()
            .unwrap();

        let report = auditor.run(&context()).await.unwrap();

        // 20:00 UTC is the next day at +09:00.
        assert_eq!(report.date, "2024-05-02");
        assert_eq!(report.missing_required_count(), 1);
        assert_eq!(report.banned_count(), 1);

        let archive = dir.path().join("2024-05-02_my-project.zip");
        assert_eq!(report.archive_path.as_deref(), Some(archive.as_path()));
        assert!(archive.is_file());
        assert!(dir
            .path()
            .join("no-required-label_compute.googleapis.com-Instance.csv")
            .is_file());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 3);
        assert!(matches!(
            &sent[0],
            SentItem::Message { text, thread_ts: None } if text.contains("*1* resources are missing")
        ));
        assert_eq!(
            sent[1],
            SentItem::File {
                path: archive,
                title: ARCHIVE_TITLE.to_string(),
                thread_ts: Some("1".to_string()),
            }
        );
        assert!(matches!(
            &sent[2],
            SentItem::Message { text, thread_ts: Some(ts) } if ts == "1" && text.contains("vm-1")
        ));
    }

    #[tokio::test]
    async fn test_failed_scan_sends_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("previous.csv"), "Type,Name\n").unwrap();

        let api = MockAssetInventory::new()
            .with_page(vec![ResourceSearchResult::new(INSTANCE, "vm-1")])
            .with_page(vec![])
            .failing_at_page(1, "PERMISSION_DENIED");
        let notifier = Arc::new(RecordingNotifier::new());

        let auditor = LabelAuditor::builder()
            .with_scanner(scanner(api))
            .with_arc_notifier(notifier.clone())
            .with_config(AuditorConfig::new().with_output_dir(dir.path()))
            .build()
            .unwrap();

        let err = auditor.run(&context()).await.unwrap_err();

        assert!(matches!(err, AuditError::Scan(ScanError::FatalApi { .. })));
        assert!(notifier.sent().is_empty());
        assert!(dir.path().join("previous.csv").exists());
    }

    #[tokio::test]
    async fn test_scanner_closed_after_failure() {
        let api = MockAssetInventory::new()
            .with_page(vec![])
            .failing_at_page(0, "boom");
        let scanner = Arc::new(scanner(api));
        let dir = TempDir::new().unwrap();

        let auditor = LabelAuditor::builder()
            .with_arc_scanner(scanner.clone())
            .with_config(AuditorConfig::new().with_output_dir(dir.path()))
            .build()
            .unwrap();

        assert!(auditor.run(&context()).await.is_err());
        assert!(scanner.api().is_closed());
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let auditor = LabelAuditor::builder()
            .with_scanner(scanner(MockAssetInventory::new().with_page(vec![])))
            .with_notifier(RecordingNotifier::new().with_failing_uploads())
            .with_config(AuditorConfig::new().with_output_dir(dir.path()))
            .build()
            .unwrap();

        let err = auditor.run(&context()).await.unwrap_err();
        assert!(matches!(err, AuditError::Notify(_)));
    }

    #[tokio::test]
    async fn test_dry_run_without_notifier() {
        let dir = TempDir::new().unwrap();
        let auditor = LabelAuditor::builder()
            .with_scanner(scanner(MockAssetInventory::new().with_page(vec![])))
            .with_config(AuditorConfig::new().with_output_dir(dir.path()))
            .build()
            .unwrap();

        let report = auditor.run(&context()).await.unwrap();
        assert!(report.violations.is_empty());
        assert!(dir.path().join("2024-05-02_my-project.zip").is_file());
    }

    #[test]
    fn test_builder_requires_scanner() {
        let err = LabelAuditor::builder().build().unwrap_err();
        assert!(matches!(err, ScanError::Configuration { .. }));
    }

    #[test]
    fn test_default_config() {
        let config = AuditorConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/tagwarden"));
        assert_eq!(config.utc_offset.local_minus_utc(), 9 * 3600);
    }
}
