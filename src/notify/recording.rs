//! In-memory notifier for testing and dry runs.

use crate::core::NotifyError;
use crate::notify::Notifier;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Something a [`RecordingNotifier`] was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentItem {
    /// A posted message.
    Message {
        /// Message text.
        text: String,
        /// Thread the message was posted into.
        thread_ts: Option<String>,
    },
    /// An uploaded file.
    File {
        /// Uploaded file path.
        path: PathBuf,
        /// Display title.
        title: String,
        /// Thread the file was shared into.
        thread_ts: Option<String>,
    },
}

/// A notifier that records every call instead of sending it.
///
/// Message timestamps are sequential (`"1"`, `"2"`, ...). Uploads can be
/// made to fail to exercise error paths.
///
/// # Examples
///
/// ```rust
/// use tagwarden::notify::RecordingNotifier;
///
/// let notifier = RecordingNotifier::new();
/// assert!(notifier.sent().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentItem>>,
    fail_uploads: bool,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upload fail.
    pub fn with_failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// Returns everything sent so far, in order.
    pub fn sent(&self) -> Vec<SentItem> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn post_message(
        &self,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, NotifyError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentItem::Message {
            text: text.to_string(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(sent.len().to_string())
    }

    async fn upload_file(
        &self,
        path: &Path,
        title: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), NotifyError> {
        if self.fail_uploads {
            return Err(NotifyError::Api {
                method: "upload".to_string(),
                error: "upload_failed".to_string(),
            });
        }

        self.sent.lock().unwrap().push(SentItem::File {
            path: path.to_path_buf(),
            title: title.to_string(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(())
    }
}
