//! Environment-driven settings.
//!
//! | Variable | Used by | Default |
//! |---|---|---|
//! | `REGION` | aws | `ap-northeast-1` |
//! | `ACCOUNT_NAME` | aws | required |
//! | `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` | aws | required |
//! | `AWS_SESSION_TOKEN` | aws | optional |
//! | `PROJECT_ID` | gcp | required |
//! | `GOOGLE_OAUTH_ACCESS_TOKEN` | gcp | required |
//! | `SLACK_TOKEN`, `SLACK_CHANNEL_ID` | both | required unless notifications are off |
//! | `OUTPUT_DIR` | both | `/tmp/tagwarden` |
//!
//! Values are trimmed; an empty value counts as unset.

use crate::core::{Provider, SettingsError};
use crate::manager::DEFAULT_OUTPUT_DIR;

use secrecy::SecretString;
use std::path::PathBuf;

/// Region used when `REGION` is unset.
pub const DEFAULT_REGION: &str = "ap-northeast-1";

/// AWS settings.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    /// Region of the AWS Config recorder.
    pub region: String,
    /// Account display name, used as the report scope.
    pub account_name: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: SecretString,
    /// Session token for temporary credentials.
    pub session_token: Option<SecretString>,
}

impl AwsSettings {
    /// Reads AWS settings through `lookup`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            region: optional(lookup, "REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            account_name: required(lookup, "ACCOUNT_NAME")?,
            access_key_id: required(lookup, "AWS_ACCESS_KEY_ID")?,
            secret_access_key: secret(required(lookup, "AWS_SECRET_ACCESS_KEY")?),
            session_token: optional(lookup, "AWS_SESSION_TOKEN").map(secret),
        })
    }
}

/// GCP settings.
#[derive(Debug, Clone)]
pub struct GcpSettings {
    /// Project id, used as the search scope and the report scope.
    pub project_id: String,
    /// OAuth2 access token.
    pub access_token: SecretString,
}

impl GcpSettings {
    /// Reads GCP settings through `lookup`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            project_id: required(lookup, "PROJECT_ID")?,
            access_token: secret(required(lookup, "GOOGLE_OAUTH_ACCESS_TOKEN")?),
        })
    }
}

/// Slack settings.
#[derive(Debug, Clone)]
pub struct SlackSettings {
    /// Bot token.
    pub token: SecretString,
    /// Channel that receives the report.
    pub channel_id: String,
}

impl SlackSettings {
    /// Reads Slack settings through `lookup`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            token: secret(required(lookup, "SLACK_TOKEN")?),
            channel_id: required(lookup, "SLACK_CHANNEL_ID")?,
        })
    }
}

/// Settings for one provider.
#[derive(Debug, Clone)]
pub enum ProviderSettings {
    /// AWS Config.
    Aws(AwsSettings),
    /// Cloud Asset Inventory.
    Gcp(GcpSettings),
}

/// Everything a run reads from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Provider settings.
    pub provider: ProviderSettings,
    /// Slack settings; `None` when notifications are off.
    pub slack: Option<SlackSettings>,
    /// Report output directory.
    pub output_dir: PathBuf,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env(provider: Provider, notify: bool) -> Result<Self, SettingsError> {
        Self::from_lookup(provider, notify, &|key: &str| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`.
    pub fn from_lookup<F>(provider: Provider, notify: bool, lookup: &F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match provider {
            Provider::Aws => ProviderSettings::Aws(AwsSettings::from_lookup(lookup)?),
            Provider::Gcp => ProviderSettings::Gcp(GcpSettings::from_lookup(lookup)?),
        };

        let slack = if notify {
            Some(SlackSettings::from_lookup(lookup)?)
        } else {
            None
        };

        Ok(Self {
            provider,
            slack,
            output_dir: optional(lookup, "OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }

    /// Returns the report scope: the account name or the project id.
    pub fn scope(&self) -> &str {
        match &self.provider {
            ProviderSettings::Aws(aws) => &aws.account_name,
            ProviderSettings::Gcp(gcp) => &gcp.project_id,
        }
    }
}

fn optional<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, key).ok_or_else(|| SettingsError::missing(key))
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}
