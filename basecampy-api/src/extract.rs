/// Request extractors
///
/// [`ValidatedJson`] deserializes a JSON body and runs its `validator`
/// rules, so malformed and invalid bodies both render as [`ApiError`].
/// [`PathIds`] does the same for path parameters, and [`FormOrJson`] for
/// bodies that may carry file uploads.

use axum::{
    async_trait,
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Multipart, Path, Request,
    },
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::ApiError;

/// JSON body that passed validation
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Path parameters; a malformed ID renders as a 400 [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PathIds<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathIds<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| ApiError::BadRequest(rejection.body_text()))?;

        Ok(PathIds(value))
    }
}

/// A file part of a multipart body, held in memory until the handler stores it
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Form field the file came in
    pub field: String,
    pub file_name: String,
    pub mimetype: String,
    pub content: Bytes,
}

/// Validated body from either `multipart/form-data` or JSON
///
/// Text parts of a form are read as the fields of `T`; empty text parts
/// count as absent. File parts are collected in `files`. A JSON body never
/// carries files.
#[derive(Debug)]
pub struct FormOrJson<T> {
    pub value: T,
    pub files: Vec<UploadedFile>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S, T> FromRequest<S> for FormOrJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ValidatedJson(value) = ValidatedJson::<T>::from_request(req, state).await?;
            return Ok(FormOrJson {
                value,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection: MultipartRejection| ApiError::BadRequest(rejection.body_text()))?;

        let mut fields = Map::new();
        let mut files = Vec::new();

        while let Some(part) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = part.name().unwrap_or_default().to_string();

            if let Some(file_name) = part.file_name().map(str::to_string) {
                let mimetype = part
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = part
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;

                files.push(UploadedFile {
                    field: name,
                    file_name,
                    mimetype,
                    content,
                });
                continue;
            }

            let text = part
                .text()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            if !text.trim().is_empty() {
                fields.insert(name, Value::String(text));
            }
        }

        let value: T = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e)))?;
        value.validate()?;

        Ok(FormOrJson { value, files })
    }
}
