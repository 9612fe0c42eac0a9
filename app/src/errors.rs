// storefront/app/src/errors.rs

use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

use shopflow::FlowError;

/// Field-level validation messages, keyed by form field name.
///
/// Rendered as `{"errors": {"field": ["message", ...]}}` with status 400,
/// which is what a form re-render carried.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Records a message against a field.
  ///
  /// # Arguments
  /// * `field`: The form field name the message belongs to.
  /// * `message`: The human-readable validation message.
  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_string()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Appends every message from `other`, keeping existing ones first.
  ///
  /// # Arguments
  /// * `other`: Errors collected by another check.
  pub fn merge(&mut self, other: FormErrors) {
    for (field, messages) in other.0 {
      self.0.entry(field).or_default().extend(messages);
    }
  }

  /// # Arguments
  /// * `field`: The form field name.
  ///
  /// # Returns
  /// The messages recorded for `field`, or `None` when it is clean.
  pub fn get(&self, field: &str) -> Option<&[String]> {
    self.0.get(field).map(Vec::as_slice)
  }

  /// Turns the collected messages into a validation outcome.
  ///
  /// # Returns
  /// `Ok(())` when nothing was recorded, `Err(AppError::Form)` otherwise.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(AppError::Form(self))
    }
  }
}

impl std::fmt::Display for FormErrors {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{}: {}", field, message)?;
        first = false;
      }
    }
    Ok(())
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Invalid form: {0}")]
  Form(FormErrors),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  /// Anonymous access to a page that needs a session; carries the redirect target.
  #[error("Login required, redirecting to {0}")]
  LoginRequired(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// The row is still referenced (e.g. a user that owns orders).
  #[error("Protected: {0}")]
  Protected(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migrate(#[from] sqlx::migrate::MigrateError),

  #[error("CSV Error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O Error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Process was halted by a workflow step.")]
  PipelineHaltedByHandler,
}

/// Recovers the concrete error from an `anyhow::Error`.
///
/// # Returns
/// The wrapped `AppError` or `sqlx::Error` when there is one, otherwise
/// `AppError::Internal` with the error's message.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

/// Maps each error kind onto an HTTP response.
///
/// # Returns
/// 400 for input problems with the messages as JSON, 403 for failed
/// authentication, a 302 to the login page for anonymous access, 404, 409
/// for protected rows and halted workflows, and an opaque 500 otherwise.
impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    match self {
      AppError::LoginRequired(_) | AppError::Validation(_) | AppError::Form(_) | AppError::NotFound(_) => {
        tracing::info!(application_error = %self, "Responding with client error");
      }
      _ => tracing::error!(application_error = %self, "Responding with error"),
    }
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Form(errors) => HttpResponse::BadRequest().json(json!({"errors": errors})),
      AppError::Auth(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::LoginRequired(location) => HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_str()))
        .finish(),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Protected(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) | AppError::Migrate(_) => {
        HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"}))
      }
      AppError::Csv(e) => HttpResponse::BadRequest().json(json!({"error": "Malformed CSV", "detail": e.to_string()})),
      AppError::Io(_) => HttpResponse::InternalServerError().json(json!({"error": "File storage failed"})),
      AppError::Workflow { source } => {
        tracing::error!(workflow_error = ?source, "Workflow error details");
        HttpResponse::InternalServerError().json(json!({"error": "Workflow processing error"}))
      }
      AppError::Internal(_) => HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred"})),
      AppError::PipelineHaltedByHandler => {
        HttpResponse::Conflict().json(json!({"error": "Process halted as expected by business logic."}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
