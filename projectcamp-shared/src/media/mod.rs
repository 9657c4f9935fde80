//! Attachment storage on an external media host
//!
//! Task attachments are uploaded to a media host and only their URL and
//! metadata are kept in the database. [`MediaStore`] is the seam between the
//! API and the host:
//!
//! - [`cloudinary::CloudinaryStore`]: signed uploads and deletions against a
//!   Cloudinary-compatible HTTP API
//! - [`memory::MemoryMediaStore`]: keeps uploads in memory, for tests
//! - [`UnconfiguredMediaStore`]: used when no credentials are configured;
//!   every call fails with [`MediaError::NotConfigured`]
//!
//! Deletions are best effort from the API's point of view: callers log a
//! failed delete and carry on.

pub mod cloudinary;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use crate::models::task::NewAttachment;

/// Error type for media host operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// No media host credentials configured
    #[error("Media storage is not configured")]
    NotConfigured,

    /// Request could not be sent or the connection failed
    #[error("Media host request failed: {0}")]
    Request(String),

    /// Media host answered with an error status
    #[error("Media host returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Media host answered with a body we could not understand
    #[error("Invalid media host response: {0}")]
    InvalidResponse(String),
}

/// File received from a client, ready to upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadFile {
    /// Size in bytes
    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    /// Public HTTPS delivery URL
    pub url: String,

    /// Host identifier used for deletion
    pub public_id: String,

    /// Host resource type (`image`, `video`, `raw`)
    pub resource_type: String,
}

impl StoredMedia {
    /// Combines the upload result with the client's file metadata
    pub fn into_attachment(self, file: &UploadFile) -> NewAttachment {
        NewAttachment {
            url: self.url,
            public_id: self.public_id,
            resource_type: self.resource_type,
            original_name: file.file_name.clone(),
            mime_type: file.content_type.clone(),
            size: file.size(),
        }
    }
}

/// Storage backend for attachment bytes
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Uploads a file into `folder`
    async fn upload(&self, file: &UploadFile, folder: &str) -> Result<StoredMedia, MediaError>;

    /// Removes a previously uploaded file
    async fn delete(&self, public_id: &str, resource_type: &str) -> Result<(), MediaError>;
}

/// Media store used when no host is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMediaStore;

#[async_trait]
impl MediaStore for UnconfiguredMediaStore {
    async fn upload(&self, _file: &UploadFile, _folder: &str) -> Result<StoredMedia, MediaError> {
        Err(MediaError::NotConfigured)
    }

    async fn delete(&self, _public_id: &str, _resource_type: &str) -> Result<(), MediaError> {
        Err(MediaError::NotConfigured)
    }
}

/// Builds a public id from the current time and the file name without its
/// extension, e.g. `1718000000000-report`
pub fn generate_public_id(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };

    format!("{}-{}", Utc::now().timestamp_millis(), stem)
}

/// Recovers the public id from a Cloudinary delivery URL
///
/// Takes everything after `/upload/`, minus an optional `v<digits>/` version
/// segment and the file extension. Returns None for URLs that are not
/// Cloudinary delivery URLs.
///
/// ```
/// use projectcamp_shared::media::public_id_from_url;
///
/// assert_eq!(
///     public_id_from_url("https://res.cloudinary.com/demo/image/upload/v1700/camp/a1-logo.png").as_deref(),
///     Some("camp/a1-logo")
/// );
/// assert_eq!(public_id_from_url("https://example.com/logo.png"), None);
/// ```
pub fn public_id_from_url(url: &str) -> Option<String> {
    if !url.contains("cloudinary.com") {
        return None;
    }

    let (_, rest) = url.split_once("/upload/")?;

    let rest = match rest.split_once('/') {
        Some((version, tail))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            tail
        }
        _ => rest,
    };

    // Strip an extension on the last path segment only
    let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
    let id = match rest[last_slash..].rfind('.') {
        Some(dot) => &rest[..last_slash + dot],
        None => rest,
    };

    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
