//! Structured audit logging.
//!
//! Events are emitted with `tracing` on the `tagwarden::audit` target, so a
//! subscriber can route them separately from operational logs (JSON file,
//! log shipper, etc.).

mod events;

pub use events::{
    emit_report_written, emit_resource_skipped, emit_run_failed, emit_scan_completed,
    emit_scan_started, AuditEvent, RunAuditEvent,
};
