//! Chat message bodies.

use crate::core::{AuditReport, ViolationBucket, ViolationSet};

use std::fmt::Write;

/// Title shown for the uploaded archive.
pub const ARCHIVE_TITLE: &str = "Resource names by resource type";

/// Builds the top-level summary message.
///
/// ```text
/// 2024-05-01 results for *prod* :mag:
/// :label: *3* resources are missing required labels
/// :no_entry: *1* resources carry banned labels
/// ```
pub fn summary_message(report: &AuditReport) -> String {
    let mut message = format!("{} results for *{}* :mag:\n", report.date, report.scope);
    let _ = write!(
        message,
        ":label: *{}* resources are missing required labels",
        report.missing_required_count()
    );

    let banned = report.banned_count();
    if banned > 0 {
        let _ = write!(message, "\n:no_entry: *{}* resources carry banned labels", banned);
    }

    message
}

/// Builds the thread message listing every violating resource.
///
/// Each non-empty bucket gets a heading, then one `:pushpin:` line per
/// resource type (sorted) followed by its identifiers in recording order.
pub fn thread_message(violations: &ViolationSet) -> String {
    if violations.is_empty() {
        return "No violations found".to_string();
    }

    let mut sections = Vec::new();
    for bucket in ViolationBucket::ALL {
        let groups = violations.bucket(bucket);
        if groups.is_empty() {
            continue;
        }

        let mut section = bucket.title().to_string();
        for (resource_type, ids) in groups {
            let _ = write!(section, "\n\n:pushpin: {}\n{}", resource_type, ids.join("\n"));
        }
        sections.push(section);
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Provider;
    use chrono::Utc;
    use std::time::Duration;

    fn report(violations: ViolationSet) -> AuditReport {
        let now = Utc::now();
        AuditReport {
            run_id: "run".into(),
            provider: Provider::Gcp,
            scope: "my-project".into(),
            date: "2024-05-01".into(),
            violations,
            archive_path: None,
            started_at: now,
            completed_at: now,
            duration: Duration::ZERO,
        }
    }

    #[test]
    fn test_summary_message() {
        let mut violations = ViolationSet::new();
        violations.record(ViolationBucket::NoRequiredLabel, "T1", "a");
        violations.record(ViolationBucket::NoRequiredLabel, "T2", "b");

        assert_eq!(
            summary_message(&report(violations.clone())),
            "2024-05-01 results for *my-project* :mag:\n\
             :label: *2* resources are missing required labels"
        );

        violations.record(ViolationBucket::BannedLabelPresent, "T1", "c");
        assert!(summary_message(&report(violations))
            .ends_with(":no_entry: *1* resources carry banned labels"));
    }

    #[test]
    fn test_thread_message_sorts_types() {
        let mut violations = ViolationSet::new();
        violations.record(ViolationBucket::NoRequiredLabel, "storage.googleapis.com/Bucket", "logs");
        violations.record(ViolationBucket::NoRequiredLabel, "compute.googleapis.com/Instance", "vm-2");
        violations.record(ViolationBucket::NoRequiredLabel, "compute.googleapis.com/Instance", "vm-1");

        assert_eq!(
            thread_message(&violations),
            "Resources missing required labels\n\n\
             :pushpin: compute.googleapis.com/Instance\nvm-2\nvm-1\n\n\
             :pushpin: storage.googleapis.com/Bucket\nlogs"
        );
    }

    #[test]
    fn test_thread_message_both_buckets() {
        let mut violations = ViolationSet::new();
        violations.record(ViolationBucket::BannedLabelPresent, "T", "x");
        violations.record(ViolationBucket::NoRequiredLabel, "T", "y");

        let message = thread_message(&violations);
        let missing = message.find("Resources missing required labels").unwrap();
        let banned = message.find("Resources carrying banned labels").unwrap();
        assert!(missing < banned);
    }

    #[test]
    fn test_thread_message_empty() {
        assert_eq!(thread_message(&ViolationSet::new()), "No violations found");
    }
}
