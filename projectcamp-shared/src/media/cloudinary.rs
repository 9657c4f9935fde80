//! Cloudinary-compatible media host client
//!
//! Uploads go to `POST {base}/v1_1/{cloud}/auto/upload` as multipart forms;
//! deletions go to `POST {base}/v1_1/{cloud}/{resource_type}/destroy`. Both
//! are signed: the request parameters (except `file`, `api_key`,
//! `resource_type` and `cloud_name`) are sorted by name, joined as
//! `k1=v1&k2=v2`, suffixed with the API secret and hashed. Accounts verify
//! SHA-1 digests unless switched to SHA-256, so SHA-1 is the default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{generate_public_id, MediaError, MediaStore, StoredMedia, UploadFile};

/// Default API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Digest used for request signatures; must match the account setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1",
            SignatureAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(SignatureAlgorithm::Sha256),
            other => Err(format!("Unknown signature algorithm: {}", other)),
        }
    }
}

/// Connection settings
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,

    /// API endpoint, overridable for tests
    pub api_base: String,

    pub signature_algorithm: SignatureAlgorithm,

    /// Per-request timeout
    pub timeout_seconds: u64,
}

impl CloudinaryConfig {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            cloud_name,
            api_key,
            // Secrets pasted into env files often carry whitespace
            api_secret: api_secret.trim().to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            signature_algorithm: SignatureAlgorithm::default(),
            timeout_seconds: 60,
        }
    }
}

/// Media store backed by a Cloudinary account
pub struct CloudinaryStore {
    config: CloudinaryConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| MediaError::Request(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            cloud_name = %config.cloud_name,
            signature_algorithm = %config.signature_algorithm,
            "Cloudinary media store configured"
        );

        Ok(Self { config, client })
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type,
            action
        )
    }

    /// Adds `timestamp`, `api_key` and `signature` to the signed parameters
    fn signed_params(&self, mut params: BTreeMap<&'static str, String>) -> BTreeMap<&'static str, String> {
        params.insert("timestamp", Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret, self.config.signature_algorithm);
        params.insert("api_key", self.config.api_key.clone());
        params.insert("signature", signature);
        params
    }

    async fn error_from(response: reqwest::Response) -> MediaError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        MediaError::Upstream { status, message }
    }
}

/// Signs parameters: sorted `k=v` pairs joined by `&`, then the secret, hex digest
pub fn sign(
    params: &BTreeMap<&'static str, String>,
    api_secret: &str,
    algorithm: SignatureAlgorithm,
) -> String {
    let to_sign = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&to_sign, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&to_sign, api_secret),
    }
}

fn hex_digest<D: Digest>(to_sign: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredMedia, MediaError> {
        let public_id = generate_public_id(&file.file_name);

        let mut params = BTreeMap::new();
        params.insert("folder", folder.to_string());
        params.insert("public_id", public_id);
        let params = self.signed_params(params);

        let part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| MediaError::Request(format!("Invalid content type: {}", e)))?;

        let mut form = reqwest::multipart::Form::new().part("file", part);
        for (key, value) in params {
            form = form.text(key, value);
        }

        debug!(file_name = %file.file_name, size = file.size(), "Uploading attachment");

        let response = self
            .client
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let err = Self::error_from(response).await;
            warn!(file_name = %file.file_name, error = %err, "Attachment upload failed");
            return Err(err);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        info!(public_id = %uploaded.public_id, url = %uploaded.secure_url, "Attachment uploaded");

        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            resource_type: uploaded.resource_type,
        })
    }

    async fn delete(&self, public_id: &str, resource_type: &str) -> Result<(), MediaError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        let params = self.signed_params(params);

        let response = self
            .client
            .post(self.endpoint(resource_type, "destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::InvalidResponse(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" | "not found" => {
                debug!(public_id, result = %destroyed.result, "Attachment removed from media host");
                Ok(())
            }
            other => Err(MediaError::InvalidResponse(format!(
                "Unexpected destroy result: {}",
                other
            ))),
        }
    }
}
