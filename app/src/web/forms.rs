// storefront/app/src/web/forms.rs

//! Reading browser form posts: url-encoded bodies and multipart uploads,
//! including repeated keys.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures_util::{StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::errors::{AppError, Result};

/// Ceiling for multipart files when a route sets no tighter one.
pub const MAX_FORM_FILE_BYTES: usize = 10 * 1024 * 1024;
const MAX_FORM_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
  pub field: String,
  pub file_name: String,
  pub content_type: Option<String>,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct FormData {
  pub fields: Vec<(String, String)>,
  pub files: Vec<UploadedFile>,
}

impl FormData {
  pub fn text(&self, name: &str) -> Option<&str> {
    self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  pub fn texts<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self.fields.iter().filter(move |(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
    self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// First non-empty file posted under `name`.
  pub fn file<'a>(&'a self, name: &'a str) -> Option<&'a UploadedFile> {
    self.files(name).next()
  }

  /// Browsers send an empty part for an untouched file input; those are skipped.
  pub fn files<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a UploadedFile> + 'a {
    self.files.iter().filter(move |f| f.field == name && !(f.file_name.is_empty() && f.bytes.is_empty()))
  }
}

/// Reads the request body as a form, whichever encoding the client used.
pub async fn read_form(req: &HttpRequest, payload: web::Payload, max_file_bytes: usize) -> Result<FormData> {
  let is_multipart = req
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));
  if is_multipart {
    read_multipart(Multipart::new(req.headers(), payload), max_file_bytes).await
  } else {
    read_urlencoded(payload).await
  }
}

pub async fn read_urlencoded(mut payload: web::Payload) -> Result<FormData> {
  let mut body = web::BytesMut::new();
  while let Some(chunk) = payload.next().await {
    let chunk = chunk.map_err(|e| AppError::Validation(format!("Failed to read request body: {}", e)))?;
    if body.len() + chunk.len() > MAX_FORM_BODY_BYTES {
      return Err(AppError::Validation("Request body too large.".to_string()));
    }
    body.extend_from_slice(&chunk);
  }
  Ok(FormData {
    fields: parse_pairs(&body),
    files: Vec::new(),
  })
}

pub fn parse_pairs(body: &[u8]) -> Vec<(String, String)> {
  url::form_urlencoded::parse(body).into_owned().collect()
}

pub async fn read_multipart(mut payload: Multipart, max_file_bytes: usize) -> Result<FormData> {
  let mut form = FormData::default();
  while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
    let (name, file_name) = match field.content_disposition() {
      Some(cd) => (
        cd.get_name().unwrap_or_default().to_string(),
        cd.get_filename().map(str::to_string),
      ),
      None => (String::new(), None),
    };
    let content_type = field.content_type().map(|m| m.to_string());
    let limit = if file_name.is_some() { max_file_bytes } else { MAX_FORM_BODY_BYTES };

    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
      if bytes.len() + chunk.len() > limit {
        warn!(field = %name, limit, "Multipart part exceeds size limit.");
        return Err(AppError::Validation(format!(
          "Uploaded data for '{}' exceeds the limit of {} bytes.",
          name, limit
        )));
      }
      bytes.extend_from_slice(&chunk);
    }

    match file_name {
      Some(file_name) => {
        debug!(field = %name, %file_name, size = bytes.len(), "Received file part.");
        form.files.push(UploadedFile {
          field: name,
          file_name,
          content_type,
          bytes,
        });
      }
      None => form.fields.push((name, String::from_utf8_lossy(&bytes).into_owned())),
    }
  }
  Ok(form)
}

fn malformed(err: actix_multipart::MultipartError) -> AppError {
  AppError::Validation(format!("Malformed multipart body: {}", err))
}
