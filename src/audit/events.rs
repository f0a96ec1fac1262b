//! Audit event types and emission functions.

use crate::core::{
    AuditReport, Provider, ScanContext, ScanError, ScanStats, ViolationBucket, ViolationSet,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Summary of a finished audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAuditEvent {
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Unique run ID.
    pub run_id: String,

    /// Provider that was audited.
    pub provider: Provider,

    /// Account or project name.
    pub scope: String,

    /// Report date.
    pub date: String,

    /// Resources missing a required label.
    pub missing_required: usize,

    /// Resources carrying a banned label.
    pub banned_present: usize,

    /// Resource types with at least one violation.
    pub violating_types: Vec<String>,

    /// Run duration in milliseconds.
    pub duration_ms: u64,
}

impl From<&AuditReport> for RunAuditEvent {
    fn from(report: &AuditReport) -> Self {
        let mut violating_types: Vec<String> = report
            .violations
            .groups()
            .map(|(_, resource_type, _)| resource_type.to_string())
            .collect();
        violating_types.sort();
        violating_types.dedup();

        Self {
            timestamp: report.completed_at,
            run_id: report.run_id.clone(),
            provider: report.provider,
            scope: report.scope.clone(),
            date: report.date.clone(),
            missing_required: report.missing_required_count(),
            banned_present: report.banned_count(),
            violating_types,
            duration_ms: report.duration.as_millis() as u64,
        }
    }
}

impl AuditEvent for RunAuditEvent {
    fn event_type(&self) -> &'static str {
        "audit_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a scan starting.
pub fn emit_scan_started(context: &ScanContext, scanner: &str, provider: Provider) {
    tracing::info!(
        target: "tagwarden::audit",
        event_type = "scan_started",
        run_id = %context.run_id,
        scanner = %scanner,
        provider = %provider,
        scope = %context.scope,
        region = ?context.region,
        "Scan started"
    );
}

/// Emits an audit event for a resource that could not be evaluated.
pub fn emit_resource_skipped(context: &ScanContext, identifier: &str, reason: &ScanError) {
    tracing::warn!(
        target: "tagwarden::audit",
        event_type = "resource_skipped",
        run_id = %context.run_id,
        identifier = %identifier,
        reason = %reason,
        "Resource skipped"
    );
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(
    context: &ScanContext,
    scanner: &str,
    stats: &ScanStats,
    violations: &ViolationSet,
) {
    let elapsed_ms = (Utc::now() - context.started_at).num_milliseconds().max(0);

    tracing::info!(
        target: "tagwarden::audit",
        event_type = "scan_completed",
        run_id = %context.run_id,
        scanner = %scanner,
        scope = %context.scope,
        evaluated = stats.evaluated,
        skipped_incomplete = stats.skipped_incomplete,
        skipped_excluded = stats.skipped_excluded,
        decode_failures = stats.decode_failures,
        retries = stats.retries,
        missing_required = violations.count(ViolationBucket::NoRequiredLabel),
        banned_present = violations.count(ViolationBucket::BannedLabelPresent),
        elapsed_ms = elapsed_ms,
        "Scan completed"
    );
}

/// Emits an audit event once the report has been written.
pub fn emit_report_written(report: &AuditReport, archive: &Path) {
    let event = RunAuditEvent::from(report);

    tracing::info!(
        target: "tagwarden::audit",
        event_type = event.event_type(),
        run_id = %event.run_id,
        provider = %event.provider,
        scope = %event.scope,
        date = %event.date,
        missing_required = event.missing_required,
        banned_present = event.banned_present,
        violating_types = ?event.violating_types,
        duration_ms = event.duration_ms,
        archive = %archive.display(),
        "Report written"
    );
}

/// Emits an audit event for a run that ended in error.
///
/// Nothing is reported or posted for such a run.
pub fn emit_run_failed(context: &ScanContext, provider: Provider, error: &dyn std::error::Error) {
    tracing::error!(
        target: "tagwarden::audit",
        event_type = "audit_failed",
        run_id = %context.run_id,
        provider = %provider,
        scope = %context.scope,
        error = %error,
        "Audit run failed"
    );
}
