//! HTTP client for the AWS Config JSON 1.1 API, signed with SigV4.

use crate::backends::aws::{
    BaseConfigurationItem, ConfigServiceApi, ListDiscoveredResourcesPage, ResourceKey,
};
use crate::core::ScanError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

const PROVIDER: &str = "aws";
const SERVICE: &str = "config";
const TARGET_PREFIX: &str = "StarlingDoveService";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Static AWS credentials.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key (kept secret).
    pub secret_access_key: SecretString,
    /// Session token for temporary credentials.
    pub session_token: Option<SecretString>,
}

impl AwsCredentials {
    /// Creates long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into().into()),
            session_token: None,
        }
    }

    /// Adds a session token.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(SecretString::new(token.into().into()));
        self
    }
}

/// AWS Config client configuration.
#[derive(Debug, Clone)]
pub struct AwsConfigSettings {
    /// Region the recorder runs in.
    pub region: String,

    /// Signing credentials.
    pub credentials: AwsCredentials,

    /// Endpoint override; defaults to the regional public endpoint.
    pub endpoint: Option<String>,

    /// Request timeout.
    pub timeout: Duration,
}

impl AwsConfigSettings {
    /// Creates a configuration for `region`.
    pub fn new(region: impl Into<String>, credentials: AwsCredentials) -> Self {
        Self {
            region: region.into(),
            credentials,
            endpoint: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets an endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://config.{}.amazonaws.com", self.region))
    }
}

/// AWS Config client.
///
/// # Example
///
/// ```rust,ignore
/// use tagwarden::backends::aws::{AwsConfigClient, AwsConfigSettings, AwsCredentials};
///
/// let credentials = AwsCredentials::new(key_id, secret);
/// let client = AwsConfigClient::new(AwsConfigSettings::new("ap-northeast-1", credentials))?;
/// ```
#[derive(Debug)]
pub struct AwsConfigClient {
    settings: AwsConfigSettings,
    endpoint: String,
    host: String,
    http: reqwest::Client,
}

impl AwsConfigClient {
    /// Creates a new client.
    pub fn new(settings: AwsConfigSettings) -> Result<Self, ScanError> {
        let endpoint = settings.endpoint().trim_end_matches('/').to_string();
        let host = endpoint
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(endpoint.as_str())
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if host.is_empty() {
            return Err(ScanError::configuration(format!(
                "invalid AWS Config endpoint: {}",
                endpoint
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ScanError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            endpoint,
            host,
            http,
        })
    }

    async fn call<B, R>(&self, operation: &str, body: &B) -> Result<R, ScanError>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ScanError::internal(format!("failed to encode {}: {}", operation, e)))?;
        let now = Utc::now();
        let credentials = &self.settings.credentials;

        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), CONTENT_TYPE.to_string());
        headers.insert("host".to_string(), self.host.clone());
        headers.insert("x-amz-date".to_string(), amz_date(now));
        headers.insert(
            "x-amz-target".to_string(),
            format!("{}.{}", TARGET_PREFIX, operation),
        );
        if let Some(token) = &credentials.session_token {
            headers.insert(
                "x-amz-security-token".to_string(),
                token.expose_secret().to_string(),
            );
        }

        let signer = SigV4Signer::new(credentials, &self.settings.region, SERVICE);
        let authorization = signer.authorization("POST", "/", &headers, &payload, now)?;

        let mut request = self.http.post(format!("{}/", self.endpoint));
        for (name, value) in headers.iter().filter(|(name, _)| name.as_str() != "host") {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .header("authorization", authorization)
            .body(payload)
            .send()
            .await
            .map_err(|e| ScanError::transient(PROVIDER, operation, e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScanError::transient(PROVIDER, operation, e.to_string()))?;

        if !status.is_success() {
            let error: ApiErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
            let kind = error.kind();
            let message = format!("{} ({}): {}", kind, status, error.message());
            let throttled = kind.contains("Throttling") || kind.contains("LimitExceeded");
            return Err(
                if throttled
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
                {
                    ScanError::transient(PROVIDER, operation, message)
                } else {
                    ScanError::fatal(PROVIDER, operation, message)
                },
            );
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ScanError::fatal(PROVIDER, operation, format!("invalid response: {}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListDiscoveredResourcesRequest<'a> {
    resource_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResourceConfigRequest<'a> {
    resource_keys: &'a [ResourceKey],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResourceConfigResponse {
    #[serde(default)]
    base_configuration_items: Vec<BaseConfigurationItem>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "__type", default)]
    kind: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

impl ApiErrorBody {
    /// Error code without the `namespace#` prefix.
    fn kind(&self) -> &str {
        let kind = self.kind.as_deref().unwrap_or("UnknownError");
        kind.rsplit('#').next().unwrap_or(kind)
    }

    fn message(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

#[async_trait]
impl ConfigServiceApi for AwsConfigClient {
    async fn list_discovered_resources(
        &self,
        resource_type: &str,
        next_token: Option<&str>,
    ) -> Result<ListDiscoveredResourcesPage, ScanError> {
        let request = ListDiscoveredResourcesRequest {
            resource_type,
            next_token,
        };
        self.call("ListDiscoveredResources", &request).await
    }

    async fn batch_get_resource_config(
        &self,
        keys: &[ResourceKey],
    ) -> Result<Vec<BaseConfigurationItem>, ScanError> {
        let request = BatchGetResourceConfigRequest {
            resource_keys: keys,
        };
        let response: BatchGetResourceConfigResponse =
            self.call("BatchGetResourceConfig", &request).await?;
        Ok(response.base_configuration_items)
    }
}

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ScanError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| ScanError::internal(format!("invalid HMAC key: {}", e)))?;
    Mac::update(&mut mac, data);
    Ok(Mac::finalize(mac).into_bytes().to_vec())
}

/// Signature Version 4 request signer.
struct SigV4Signer<'a> {
    credentials: &'a AwsCredentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> SigV4Signer<'a> {
    fn new(credentials: &'a AwsCredentials, region: &'a str, service: &'a str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    fn signing_key(&self, date: &str) -> Result<Vec<u8>, ScanError> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key.expose_secret());
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }

    /// Builds the `Authorization` header value.
    ///
    /// `headers` must be keyed by lowercase name and include `host` and
    /// `x-amz-date`; all of them are signed.
    fn authorization(
        &self,
        method: &str,
        path: &str,
        headers: &BTreeMap<String, String>,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<String, ScanError> {
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method,
            path,
            canonical_headers,
            signed_headers,
            sha256_hex(payload)
        );

        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date(now),
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signature = hex::encode(hmac_sha256(
            &self.signing_key(&date)?,
            string_to_sign.as_bytes(),
        )?);

        Ok(format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credentials.access_key_id, scope, signed_headers, signature
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn example_credentials() -> AwsCredentials {
        AwsCredentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    #[test]
    fn test_signing_key_derivation() {
        let credentials = example_credentials();
        let signer = SigV4Signer::new(&credentials, "us-east-1", "iam");

        assert_eq!(
            hex::encode(signer.signing_key("20120215").unwrap()),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_post_vanilla_signature() {
        // "post-vanilla" from the AWS SigV4 test suite.
        let credentials = example_credentials();
        let signer = SigV4Signer::new(&credentials, "us-east-1", "service");
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.amazonaws.com".to_string());
        headers.insert("x-amz-date".to_string(), amz_date(now));

        let auth = signer.authorization("POST", "/", &headers, b"", now).unwrap();
        assert_eq!(
            auth,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5da7c1a2acd57cee7505fc6676e4e544621c30862966e37dddb68e92efbe5d6b"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let credentials = example_credentials();
        let signer = SigV4Signer::new(&credentials, "ap-northeast-1", SERVICE);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let mut headers = BTreeMap::new();
        headers.insert("x-amz-target".to_string(), "StarlingDoveService.ListDiscoveredResources".to_string());
        headers.insert("host".to_string(), "config.ap-northeast-1.amazonaws.com".to_string());
        headers.insert("x-amz-date".to_string(), amz_date(now));

        let auth = signer
            .authorization("POST", "/", &headers, b"{}", now)
            .unwrap();
        let (prefix, signature) = auth.rsplit_once("Signature=").unwrap();

        assert_eq!(
            prefix,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/ap-northeast-1/config/aws4_request, \
             SignedHeaders=host;x-amz-date;x-amz-target, "
        );
        assert_eq!(signature.len(), 64);

        // Signing is deterministic for a fixed request and time.
        let again = signer
            .authorization("POST", "/", &headers, b"{}", now)
            .unwrap();
        assert_eq!(auth, again);
    }

    #[test]
    fn test_error_body_kind_strips_namespace() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"__type":"com.amazonaws.starlingdove#ThrottlingException","message":"Rate exceeded"}"#,
        )
        .unwrap();
        assert_eq!(body.kind(), "ThrottlingException");
        assert_eq!(body.message(), "Rate exceeded");
    }

    #[test]
    fn test_endpoint_host() {
        let client = AwsConfigClient::new(
            AwsConfigSettings::new("eu-west-1", example_credentials())
                .with_endpoint("http://localhost:4566/"),
        )
        .unwrap();
        assert_eq!(client.host, "localhost:4566");
        assert_eq!(client.endpoint, "http://localhost:4566");

        let default = AwsConfigClient::new(AwsConfigSettings::new("eu-west-1", example_credentials()))
            .unwrap();
        assert_eq!(default.host, "config.eu-west-1.amazonaws.com");
    }

    #[test]
    fn test_request_bodies() {
        let list = ListDiscoveredResourcesRequest {
            resource_type: "AWS::S3::Bucket",
            next_token: None,
        };
        assert_eq!(
            serde_json::to_string(&list).unwrap(),
            r#"{"resourceType":"AWS::S3::Bucket"}"#
        );

        let keys = [ResourceKey {
            resource_type: "AWS::S3::Bucket".into(),
            resource_id: "logs".into(),
        }];
        let batch = BatchGetResourceConfigRequest { resource_keys: &keys };
        assert_eq!(
            serde_json::to_string(&batch).unwrap(),
            r#"{"resourceKeys":[{"resourceType":"AWS::S3::Bucket","resourceId":"logs"}]}"#
        );
    }
}
