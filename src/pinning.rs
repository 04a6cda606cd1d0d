//! Pinning-service client: uploads content for content-addressed storage
//! and resolves hashes through the configured gateway.

use crate::error::ClientError;
use crate::transport::http_client;
use crate::types::UploadReceipt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GATEWAY: &str = "gateway.pinata.cloud";
const DEFAULT_API_BASE: &str = "https://api.pinata.cloud";

pub struct PinningClient {
    api_base: String,
    gateway_host: String,
    jwt: String,
    timeout_ms: u64,
}

// Manual impl so the credential never lands in logs or test output.
impl std::fmt::Debug for PinningClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningClient")
            .field("api_base", &self.api_base)
            .field("gateway_host", &self.gateway_host)
            .field("jwt", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Shape of the pinning API's upload response.
#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pin_size: u64,
    #[serde(rename = "Timestamp", default)]
    timestamp: String,
}

impl PinningClient {
    /// Build a client from credentials. A missing JWT fails here, before
    /// any upload is attempted.
    pub fn new(
        jwt: Option<&str>,
        gateway_host: &str,
        timeout_ms: u64,
    ) -> Result<Self, ClientError> {
        let jwt = jwt
            .filter(|j| !j.is_empty())
            .ok_or(ClientError::ConfigurationMissing("PINATA_JWT"))?;
        Ok(PinningClient {
            api_base: DEFAULT_API_BASE.to_string(),
            gateway_host: gateway_host.to_string(),
            jwt: jwt.to_string(),
            timeout_ms,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Retrieval URL for a pinned hash on the configured gateway.
    pub fn gateway_url(&self, hash: &str) -> String {
        format!("https://{}/ipfs/{}", self.gateway_host, hash)
    }

    /// Pin a file and return its content-derived hash and gateway URL.
    pub async fn upload_file(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, ClientError> {
        let size_hint = bytes.len() as u64;
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        log::info!("[pinning] uploading file {file_name} ({size_hint} bytes)");
        let res = http_client()
            .post(format!("{}/pinning/pinFileToIPFS", self.api_base))
            .bearer_auth(&self.jwt)
            .multipart(form)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| ClientError::UploadFailed {
                status: 0,
                message: e.to_string(),
            })?;
        self.decode_upload(res, size_hint).await
    }

    /// Pin a JSON document (post metadata).
    pub async fn upload_json(&self, content: &Value) -> Result<UploadReceipt, ClientError> {
        log::info!("[pinning] uploading json document");
        let res = http_client()
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_base))
            .bearer_auth(&self.jwt)
            .json(&json!({ "pinataContent": content }))
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| ClientError::UploadFailed {
                status: 0,
                message: e.to_string(),
            })?;
        self.decode_upload(res, 0).await
    }

    async fn decode_upload(
        &self,
        res: reqwest::Response,
        size_hint: u64,
    ) -> Result<UploadReceipt, ClientError> {
        let status = res.status();
        if !status.is_success() {
            let message = res.text().await.unwrap_or_else(|_| "unknown error".into());
            return Err(ClientError::UploadFailed {
                status: status.as_u16(),
                message,
            });
        }
        let pin: PinResponse = res.json().await.map_err(|e| ClientError::UploadFailed {
            status: status.as_u16(),
            message: format!("bad upload response: {e}"),
        })?;
        let size = if pin.pin_size > 0 { pin.pin_size } else { size_hint };
        Ok(UploadReceipt {
            url: self.gateway_url(&pin.ipfs_hash),
            ipfs_hash: pin.ipfs_hash,
            size,
            timestamp: pin.timestamp,
        })
    }

    /// Fetch pinned content by hash as raw bytes.
    pub async fn fetch(&self, ipfs_hash: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.gateway_url(ipfs_hash);
        let unavailable = |reason: String| ClientError::MetadataUnavailable {
            uri: url.clone(),
            reason,
        };
        let res = http_client()
            .get(&url)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !res.status().is_success() {
            return Err(unavailable(format!("http {}", res.status())));
        }
        Ok(res.bytes().await.map_err(|e| unavailable(e.to_string()))?.to_vec())
    }

    /// Check the credential against the service. Any failure is reported as
    /// `false` rather than an error.
    pub async fn test_authentication(&self) -> bool {
        let res = http_client()
            .get(format!("{}/data/testAuthentication", self.api_base))
            .bearer_auth(&self.jwt)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await;
        match res {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                log::warn!("[pinning] authentication test failed: {e}");
                false
            }
        }
    }
}

/// Pull the content hash out of a gateway URL, if present.
pub fn extract_ipfs_hash(url: &str) -> Option<&str> {
    let idx = url.find("/ipfs/")?;
    let hash = &url[idx + "/ipfs/".len()..];
    let hash = hash.split(['/', '?', '#']).next()?;
    let hash = if hash.is_empty() { return None } else { hash };
    hash.bytes()
        .all(|b| b.is_ascii_alphanumeric())
        .then_some(hash)
}

/// Match a content type against an allow-list that may contain wildcard
/// entries like `image/*`.
pub fn is_valid_file_type(content_type: &str, allowed: &[&str]) -> bool {
    allowed.iter().any(|t| {
        if let Some(category) = t.strip_suffix("/*") {
            content_type
                .split('/')
                .next()
                .is_some_and(|major| major == category)
        } else {
            content_type == *t
        }
    })
}

/// Human-readable file size with 1024 steps, rounded to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_extracted_from_gateway_url() {
        assert_eq!(
            extract_ipfs_hash("https://gateway.pinata.cloud/ipfs/QmAbC123?img=1"),
            Some("QmAbC123")
        );
        assert_eq!(extract_ipfs_hash("https://gateway.pinata.cloud/ipfs/"), None);
        assert_eq!(extract_ipfs_hash("https://example.com/file.png"), None);
    }

    #[test]
    fn wildcard_type_matching() {
        let allowed = ["image/*", "application/pdf"];
        assert!(is_valid_file_type("image/png", &allowed));
        assert!(is_valid_file_type("application/pdf", &allowed));
        assert!(!is_valid_file_type("video/mp4", &allowed));
        assert!(!is_valid_file_type("imagey/png", &allowed));
    }

    #[test]
    fn file_sizes_format_like_the_ui_expects() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1_048_576), "1 MB");
    }

    #[test]
    fn missing_jwt_fails_fast() {
        let err = PinningClient::new(None, DEFAULT_GATEWAY, 8000).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationMissing("PINATA_JWT")));
        let err = PinningClient::new(Some(""), DEFAULT_GATEWAY, 8000).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationMissing(_)));
    }

    #[test]
    fn debug_output_redacts_the_credential() {
        let client = PinningClient::new(Some("secret-jwt"), DEFAULT_GATEWAY, 8000).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("secret-jwt"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn gateway_url_uses_configured_host() {
        let client = PinningClient::new(Some("jwt"), "my.gateway.example", 8000).unwrap();
        assert_eq!(
            client.gateway_url("Qm1"),
            "https://my.gateway.example/ipfs/Qm1"
        );
    }
}
