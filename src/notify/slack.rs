//! Slack Web API notifier.
//!
//! Uses `chat.postMessage` for messages and the external upload flow
//! (`files.getUploadURLExternal`, a raw upload, then
//! `files.completeUploadExternal`) for files.

use crate::core::NotifyError;
use crate::notify::Notifier;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Slack notifier.
///
/// # Example
///
/// ```rust,ignore
/// use tagwarden::notify::SlackNotifier;
///
/// let notifier = SlackNotifier::new(token, "C0123456789")?;
/// let ts = notifier.post_message("hello", None).await?;
/// ```
#[derive(Debug)]
pub struct SlackNotifier {
    token: SecretString,
    channel_id: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PostMessageBody {
    ts: String,
}

#[derive(Debug, Deserialize)]
struct UploadUrlBody {
    upload_url: String,
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    link_names: bool,
}

#[derive(Serialize)]
struct CompletedFile<'a> {
    id: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct CompleteUploadRequest<'a> {
    files: [CompletedFile<'a>; 1],
    channel_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
}

impl SlackNotifier {
    /// Creates a notifier posting to `channel_id`.
    pub fn new(token: SecretString, channel_id: impl Into<String>) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| NotifyError::Http {
                method: "client".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            token,
            channel_id: channel_id.into(),
            base_url: "https://slack.com/api".to_string(),
            http,
        })
    }

    /// Sets the API base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Returns the target channel.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), method)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, NotifyError> {
        let http_error = |e: reqwest::Error| NotifyError::Http {
            method: method.to_string(),
            message: e.to_string(),
        };

        let response: ApiResponse<T> = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(http_error)?;

        unwrap_response(method, response)
    }
}

fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T, NotifyError> {
    match response {
        ApiResponse {
            ok: true,
            body: Some(body),
            ..
        } => Ok(body),
        ApiResponse { error, .. } => Err(NotifyError::Api {
            method: method.to_string(),
            error: error.unwrap_or_else(|| "unknown_error".to_string()),
        }),
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_message(
        &self,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String, NotifyError> {
        const METHOD: &str = "chat.postMessage";

        let request = self.http.post(self.url(METHOD)).json(&PostMessageRequest {
            channel: &self.channel_id,
            text,
            thread_ts,
            link_names: false,
        });
        let body: PostMessageBody = self.send(METHOD, request).await?;

        tracing::debug!(channel = %self.channel_id, ts = %body.ts, thread_ts = ?thread_ts, "Message posted");
        Ok(body.ts)
    }

    async fn upload_file(
        &self,
        path: &Path,
        title: &str,
        thread_ts: Option<&str>,
    ) -> Result<(), NotifyError> {
        let data = tokio::fs::read(path).await.map_err(|e| NotifyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.zip".to_string());

        const GET_URL: &str = "files.getUploadURLExternal";
        let length = data.len().to_string();
        let request = self
            .http
            .post(self.url(GET_URL))
            .form(&[("filename", filename.as_str()), ("length", length.as_str())]);
        let target: UploadUrlBody = self.send(GET_URL, request).await?;

        // The upload URL is pre-signed; it takes the raw bytes without auth.
        self.http
            .post(&target.upload_url)
            .body(data)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| NotifyError::Http {
                method: "upload".to_string(),
                message: e.to_string(),
            })?;

        const COMPLETE: &str = "files.completeUploadExternal";
        let request = self.http.post(self.url(COMPLETE)).json(&CompleteUploadRequest {
            files: [CompletedFile {
                id: &target.file_id,
                title,
            }],
            channel_id: &self.channel_id,
            thread_ts,
        });
        let _: Empty = self.send(COMPLETE, request).await?;

        tracing::debug!(
            channel = %self.channel_id,
            file = %filename,
            thread_ts = ?thread_ts,
            "File uploaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_ok_response() {
        let response: ApiResponse<PostMessageBody> =
            serde_json::from_str(r#"{"ok": true, "channel": "C1", "ts": "1700000000.000100"}"#)
                .unwrap();
        let body = unwrap_response("chat.postMessage", response).unwrap();
        assert_eq!(body.ts, "1700000000.000100");
    }

    #[test]
    fn test_unwrap_error_response() {
        let response: ApiResponse<PostMessageBody> =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        let err = unwrap_response("chat.postMessage", response).unwrap_err();

        match err {
            NotifyError::Api { method, error } => {
                assert_eq!(method, "chat.postMessage");
                assert_eq!(error, "channel_not_found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_complete_upload_request_shape() {
        let request = CompleteUploadRequest {
            files: [CompletedFile {
                id: "F1",
                title: "Report",
            }],
            channel_id: "C1",
            thread_ts: Some("1.2"),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "files": [{"id": "F1", "title": "Report"}],
                "channel_id": "C1",
                "thread_ts": "1.2"
            })
        );
    }

    #[test]
    fn test_url_join() {
        let notifier = SlackNotifier::new(SecretString::new("xoxb-test".into()), "C1")
            .unwrap()
            .with_base_url("http://localhost:9000/api/");
        assert_eq!(notifier.url("chat.postMessage"), "http://localhost:9000/api/chat.postMessage");
        assert_eq!(notifier.channel_id(), "C1");
    }
}
