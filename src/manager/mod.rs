//! Orchestration of an audit run.
//!
//! The `LabelAuditor` drives one scanner through a complete run, writing the
//! report and notifying on success. `retry` holds the retry loop the
//! paginated scanner wraps around every API call.

mod auditor;
pub mod retry;

pub use auditor::{
    AuditorConfig, LabelAuditor, LabelAuditorBuilder, DEFAULT_OUTPUT_DIR, DEFAULT_UTC_OFFSET_SECS,
};
pub use retry::RetryConfig;
