//! Request body extractors
//!
//! [`Json`] is axum's JSON extractor with rejections reported through
//! [`ApiError`], so malformed bodies get the usual error envelope.
//!
//! [`FormWithFiles`] accepts either a JSON body or a `multipart/form-data`
//! body. Multipart text fields are collected into a JSON object (empty values
//! are dropped) and deserialized like a JSON body; file fields are read
//! into memory, each capped at the configured per-file limit.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use bytes::BytesMut;
use projectcamp_shared::media::UploadFile;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    app::AppState,
    error::{ApiError, ValidationErrorDetail},
};

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

/// Reads a JSON body from a request the handler took whole
///
/// Project-scoped handlers take the raw [`Request`] so their access check
/// runs before the body is read.
pub async fn read_json<T>(req: Request, state: &AppState) -> Result<T, ApiError>
where
    T: DeserializeOwned + Send,
{
    let Json(body) = Json::<T>::from_request(req, state).await?;
    Ok(body)
}

/// Parsed body fields plus uploaded files keyed by form field name
#[derive(Debug)]
pub struct FormWithFiles<T> {
    pub fields: T,
    pub files: Vec<(String, UploadFile)>,
}

impl<T> FormWithFiles<T>
where
    T: DeserializeOwned + Send,
{
    /// Reads the body of a request the handler took whole
    pub async fn read(req: Request, state: &AppState) -> Result<Self, ApiError> {
        Self::from_request(req, state).await
    }
}

impl<T> FormWithFiles<T> {
    /// Takes the files sent under `field`, rejecting files under any other
    /// name and more than `max` files
    pub fn take_files(&mut self, field: &str, max: usize) -> Result<Vec<UploadFile>, ApiError> {
        let unexpected: Vec<ValidationErrorDetail> = self
            .files
            .iter()
            .filter(|(name, _)| name != field)
            .map(|(name, _)| {
                ValidationErrorDetail::new(name.as_str(), format!("Files must be sent as '{}'", field))
            })
            .collect();
        if !unexpected.is_empty() {
            return Err(ApiError::ValidationError(unexpected));
        }

        if self.files.len() > max {
            return Err(ApiError::invalid_field(
                field,
                format!("At most {} file(s) allowed", max),
            ));
        }

        Ok(self.files.drain(..).map(|(_, file)| file).collect())
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

fn parse_fields<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, ApiError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ApiError::BadRequest(format!("Invalid form fields: {}", e)))
}

#[async_trait]
impl<T> FromRequest<AppState> for FormWithFiles<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(fields) = Json::<T>::from_request(req, state).await?;

            return Ok(Self {
                fields,
                files: Vec::new(),
            });
        }

        let max_file_bytes = state.config.uploads.max_file_bytes;
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let mut fields = Map::new();
        let mut files = Vec::new();

        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                if !text.trim().is_empty() {
                    fields.insert(name, Value::String(text));
                }
                continue;
            };

            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            let mut data = BytesMut::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?
            {
                if data.len() + chunk.len() > max_file_bytes {
                    return Err(ApiError::invalid_field(
                        &name,
                        format!(
                            "{} exceeds the {} MB file size limit",
                            file_name,
                            max_file_bytes / (1024 * 1024)
                        ),
                    ));
                }
                data.extend_from_slice(&chunk);
            }

            files.push((
                name,
                UploadFile {
                    file_name,
                    content_type,
                    data: data.freeze(),
                },
            ));
        }

        Ok(Self {
            fields: parse_fields(fields)?,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Fields {
        title: String,
    }

    fn upload(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"x"),
        }
    }

    fn form(files: &[(&str, &str)]) -> FormWithFiles<()> {
        FormWithFiles {
            fields: (),
            files: files
                .iter()
                .map(|(field, name)| (field.to_string(), upload(name)))
                .collect(),
        }
    }

    #[test]
    fn test_take_files() {
        let mut f = form(&[("attachments", "a.txt"), ("attachments", "b.txt")]);
        let files = f.take_files("attachments", 10).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "a.txt");
        assert!(f.files.is_empty());
    }

    #[test]
    fn test_take_files_limits() {
        let mut too_many = form(&[("attachment", "a.txt"), ("attachment", "b.txt")]);
        assert!(too_many.take_files("attachment", 1).is_err());

        let mut wrong_field = form(&[("avatar", "a.png")]);
        match wrong_field.take_files("attachments", 10) {
            Err(ApiError::ValidationError(details)) => assert_eq!(details[0].field, "avatar"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fields() {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String("Pitch tents".to_string()));
        let fields: Fields = parse_fields(map).unwrap();
        assert_eq!(fields.title, "Pitch tents");

        assert!(parse_fields::<Fields>(Map::new()).is_err());
    }
}
