// storefront/app/src/pipelines/signup_pipeline.rs

use shopflow::{Ctx, Outcome, Pipeline, Step, Workflows};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::errors::{AppError, FormErrors, Result as AppResult};
use crate::models::{NewUser, Profile, User};
use crate::pipelines::contexts::{SignupCtxData, SignupForm};
use crate::services::auth_service;
use crate::storage::{duplicate_username, Store};

pub const USERNAME_MAX_LEN: usize = 150;

pub fn build() -> AppResult<Pipeline<SignupCtxData, AppError>> {
  let mut p = Pipeline::with_steps(
    "signup",
    &[
      ("validate_signup_input", false),
      ("check_username_available", false),
      ("create_user", false),
      ("create_profile", false),
    ],
  )?;
  p.on("validate_signup_input", validate_signup_input)?;
  p.on("check_username_available", check_username_available)?;
  p.on("create_user", create_user)?;
  p.on("create_profile", create_profile)?;
  Ok(p)
}

/// Registers a user and their profile, returning the new user.
#[instrument(name = "workflow::sign_up", skip_all, fields(username = %form.username))]
pub async fn sign_up(workflows: &Workflows<AppError>, store: Arc<dyn Store>, form: SignupForm) -> AppResult<User> {
  let ctx = Ctx::new(SignupCtxData {
    store,
    form,
    created_user: None,
    profile: None,
  });
  match workflows.run(ctx.clone()).await? {
    Outcome::Completed => ctx.read().created_user.clone().ok_or(AppError::PipelineHaltedByHandler),
    Outcome::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

async fn validate_signup_input(ctx: Ctx<SignupCtxData>) -> AppResult<Step> {
  let form = ctx.update(|data| {
    data.form.username = data.form.username.trim().to_string();
    data.form.email = data.form.email.trim().to_string();
    data.form.clone()
  });
  let mut errors = check_username(&form.username);
  if form.email.is_empty() {
    errors.add("email", "This field is required.");
  } else if !looks_like_email(&form.email) {
    errors.add("email", "Enter a valid email address.");
  }
  errors.merge(auth_service::check_new_password(&form.username, &form.password1, &form.password2));
  debug!(valid = errors.is_empty(), "Signup input checked.");
  errors.into_result()?;
  Ok(Step::Continue)
}

async fn check_username_available(ctx: Ctx<SignupCtxData>) -> AppResult<Step> {
  let (store, username) = {
    let guard = ctx.read();
    (guard.store.clone(), guard.form.username.clone())
  };
  if store.user_by_username(&username).await?.is_some() {
    warn!(%username, "Username already taken.");
    return Err(duplicate_username());
  }
  Ok(Step::Continue)
}

async fn create_user(ctx: Ctx<SignupCtxData>) -> AppResult<Step> {
  let (store, form) = {
    let guard = ctx.read();
    (guard.store.clone(), guard.form.clone())
  };
  let password_hash = auth_service::hash_password(&form.password1)?;
  let user = store
    .create_user(NewUser {
      username: form.username,
      email: form.email,
      password_hash,
      first_name: form.first_name,
      last_name: form.last_name,
      is_staff: false,
    })
    .await?;
  info!(user_id = user.id, "User created.");
  ctx.write().created_user = Some(user);
  Ok(Step::Continue)
}

async fn create_profile(ctx: Ctx<SignupCtxData>) -> AppResult<Step> {
  let (store, user_id) = {
    let guard = ctx.read();
    let user_id = guard
      .created_user
      .as_ref()
      .map(|u| u.id)
      .ok_or_else(|| AppError::Internal("Profile step ran before the user was created.".to_string()))?;
    (guard.store.clone(), user_id)
  };
  let profile = store
    .create_profile(Profile {
      user_id,
      ..Profile::default()
    })
    .await?;
  ctx.write().profile = Some(profile);
  Ok(Step::Continue)
}

/// Letters, digits and `@ . + - _`, up to 150 characters.
fn check_username(username: &str) -> FormErrors {
  let mut errors = FormErrors::new();
  let len = username.chars().count();
  if len == 0 {
    errors.add("username", "This field is required.");
  } else if len > USERNAME_MAX_LEN {
    errors.add(
      "username",
      format!("Ensure this value has at most {} characters (it has {}).", USERNAME_MAX_LEN, len),
    );
  } else if !username.chars().all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')) {
    errors.add(
      "username",
      "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
    );
  }
  errors
}

fn looks_like_email(email: &str) -> bool {
  match email.split_once('@') {
    Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;

  fn form(username: &str, password: &str) -> SignupForm {
    SignupForm {
      username: username.to_string(),
      email: "user@example.com".to_string(),
      password1: password.to_string(),
      password2: password.to_string(),
      ..Default::default()
    }
  }

  fn workflows() -> Workflows<AppError> {
    let workflows = Workflows::new();
    workflows.register(build().unwrap());
    workflows
  }

  #[tokio::test]
  async fn creates_user_and_profile() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let user = sign_up(&workflows(), store.clone(), form(" alice ", "wonderland-42")).await.unwrap();
    assert_eq!(user.username, "alice");
    assert_ne!(user.password_hash, "wonderland-42");
    assert!(store.profile(user.id).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn duplicate_username_is_rejected() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let workflows = workflows();
    sign_up(&workflows, store.clone(), form("bob", "builder-1234")).await.unwrap();
    let err = sign_up(&workflows, store, form("bob", "builder-1234")).await.unwrap_err();
    let AppError::Form(errors) = err else {
      panic!("expected form errors");
    };
    assert!(errors.get("username").is_some());
  }

  #[tokio::test]
  async fn invalid_input_collects_every_field() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut bad = form("no spaces allowed", "short");
    bad.email = "nope".to_string();
    let AppError::Form(errors) = sign_up(&workflows(), store, bad).await.unwrap_err() else {
      panic!("expected form errors");
    };
    assert!(errors.get("username").is_some());
    assert!(errors.get("email").is_some());
    assert!(errors.get("password2").is_some());
  }

  #[tokio::test]
  async fn blank_email_is_required() {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut bad = form("carol", "wonderland-42");
    bad.email = "   ".to_string();
    let AppError::Form(errors) = sign_up(&workflows(), store.clone(), bad).await.unwrap_err() else {
      panic!("expected form errors");
    };
    assert_eq!(errors.get("email"), Some(&["This field is required.".to_string()][..]));
    assert!(store.user_by_username("carol").await.unwrap().is_none());
  }
}
