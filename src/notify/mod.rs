//! Delivery of audit results to a chat channel.
//!
//! The orchestrator posts a summary message, uploads the archive into the
//! thread it anchors, then posts the per-type listing in the same thread.
//! Any [`Notifier`] can carry that conversation; Slack is provided behind
//! the `slack` feature and [`RecordingNotifier`] keeps messages in memory.

mod recording;

#[cfg(feature = "slack")]
pub mod slack;

pub use recording::{RecordingNotifier, SentItem};

#[cfg(feature = "slack")]
pub use slack::SlackNotifier;

use crate::core::NotifyError;

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;

/// A messaging channel that supports threaded replies and file uploads.
#[async_trait]
pub trait Notifier: Send + Sync + Debug {
    /// Returns the name of this notifier.
    fn name(&self) -> &str;

    /// Posts `text`, optionally as a reply in `thread_ts`.
    ///
    /// Returns the timestamp of the posted message, which identifies the
    /// thread for subsequent replies.
    async fn post_message(&self, text: &str, thread_ts: Option<&str>)
        -> Result<String, NotifyError>;

    /// Uploads the file at `path` with a display `title`.
    async fn upload_file(
        &self,
        path: &Path,
        title: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), NotifyError>;
}
