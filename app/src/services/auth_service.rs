// storefront/app/src/services/auth_service.rs

//! Password hashing and credential checks.

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use tracing::{error, instrument};

use crate::errors::{AppError, FormErrors, Result};

pub const PASSWORD_MIN_LEN: usize = 8;

/// Hashes a password into a PHC string with a fresh random salt.
///
/// # Arguments
/// * `password`: The plain-text password to hash.
///
/// # Returns
/// A `Result` containing the Argon2 PHC string on success, or
/// `AppError::Validation` for an empty password and `AppError::Internal`
/// when Argon2 fails.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// Checks a candidate password against a stored PHC hash.
///
/// # Arguments
/// * `stored_hash`: The Argon2 PHC string saved with the user.
/// * `candidate`: The plain-text password submitted at login.
///
/// # Returns
/// `Ok(true)` on a match and `Ok(false)` on a mismatch or an empty candidate.
/// `AppError::Internal` only when the stored hash is unusable.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool> {
  if candidate.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash could not be parsed.");
    AppError::Internal(format!("Invalid stored password hash: {}", e))
  })?;
  match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => {
      error!(error = %e, "Argon2 password verification failed.");
      Err(AppError::Internal(format!("Password verification failed: {}", e)))
    }
  }
}

/// Registration-form password rules: both entries must match, and the
/// password must be long enough, not purely numeric and not the username.
///
/// # Arguments
/// * `username`: The submitted username, compared against the password.
/// * `password1`: The password as first entered.
/// * `password2`: The confirmation entry.
///
/// # Returns
/// The collected `FormErrors`, keyed by `password1` or `password2`. Empty
/// when the password is acceptable.
pub fn check_new_password(username: &str, password1: &str, password2: &str) -> FormErrors {
  let mut errors = FormErrors::new();
  if password1.is_empty() {
    errors.add("password1", "This field is required.");
  }
  if password2.is_empty() {
    errors.add("password2", "This field is required.");
  }
  if !errors.is_empty() {
    return errors;
  }
  if password1 != password2 {
    errors.add("password2", "The two password fields didn\u{2019}t match.");
    return errors;
  }
  if password1.chars().count() < PASSWORD_MIN_LEN {
    errors.add(
      "password2",
      format!(
        "This password is too short. It must contain at least {} characters.",
        PASSWORD_MIN_LEN
      ),
    );
  }
  if password1.chars().all(|c| c.is_ascii_digit()) {
    errors.add("password2", "This password is entirely numeric.");
  }
  if !username.is_empty() && password1.eq_ignore_ascii_case(username) {
    errors.add("password2", "The password is too similar to the username.");
  }
  errors
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "correct horse").unwrap());
    assert!(!verify_password(&hash, "wrong horse").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn garbage_hash_is_internal_error() {
    assert!(matches!(verify_password("not-a-hash", "x"), Err(AppError::Internal(_))));
  }

  #[test]
  fn new_password_rules() {
    assert!(check_new_password("bob", "s3cret-pass", "s3cret-pass").is_empty());
    assert!(check_new_password("bob", "s3cret-pass", "other-pass").get("password2").is_some());
    assert!(check_new_password("bob", "short", "short").get("password2").is_some());
    assert!(check_new_password("bob", "12345678901", "12345678901").get("password2").is_some());
    assert!(check_new_password("bob", "", "").get("password1").is_some());
  }
}
