// storefront/app/src/pipelines/signin_pipeline.rs

use shopflow::{Ctx, Outcome, Pipeline, Step, Workflows};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::models::User;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::storage::Store;

pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub fn build() -> AppResult<Pipeline<SigninCtxData, AppError>> {
  let mut p = Pipeline::with_steps(
    "signin",
    &[
      ("validate_signin_input", false),
      ("fetch_user", false),
      ("verify_password", false),
    ],
  )?;
  p.on("validate_signin_input", |ctx: Ctx<SigninCtxData>| async move {
    let blank = {
      let guard = ctx.read();
      guard.username.trim().is_empty() || guard.password.is_empty()
    };
    if blank {
      warn!("Sign-in attempted with blank credentials.");
      return Err(invalid_credentials());
    }
    Ok(Step::Continue)
  })?;
  p.on("fetch_user", fetch_user)?;
  p.on("verify_password", verify_password)?;
  Ok(p)
}

/// Checks credentials. Any failure is reported as the same `AppError::Auth`.
#[instrument(name = "workflow::sign_in", skip(workflows, store, password))]
pub async fn sign_in(
  workflows: &Workflows<AppError>,
  store: Arc<dyn Store>,
  username: &str,
  password: &str,
) -> AppResult<User> {
  let ctx = Ctx::new(SigninCtxData {
    store,
    username: username.trim().to_string(),
    password: password.to_string(),
    candidate: None,
    authenticated: None,
  });
  match workflows.run(ctx.clone()).await? {
    Outcome::Completed => ctx.read().authenticated.clone().ok_or_else(invalid_credentials),
    Outcome::Stopped => Err(invalid_credentials()),
  }
}

fn invalid_credentials() -> AppError {
  AppError::Auth(INVALID_CREDENTIALS.to_string())
}

async fn fetch_user(ctx: Ctx<SigninCtxData>) -> AppResult<Step> {
  let (store, username) = {
    let guard = ctx.read();
    (guard.store.clone(), guard.username.clone())
  };
  match store.user_by_username(&username).await? {
    Some(user) => {
      ctx.write().candidate = Some(user);
      Ok(Step::Continue)
    }
    None => {
      warn!(%username, "Sign-in for unknown user.");
      Err(invalid_credentials())
    }
  }
}

async fn verify_password(ctx: Ctx<SigninCtxData>) -> AppResult<Step> {
  let (candidate, password) = {
    let guard = ctx.read();
    (guard.candidate.clone(), guard.password.clone())
  };
  let user = candidate.ok_or_else(invalid_credentials)?;
  if !auth_service::verify_password(&user.password_hash, &password)? {
    warn!(user_id = user.id, "Sign-in with wrong password.");
    return Err(invalid_credentials());
  }
  info!(user_id = user.id, "User signed in.");
  ctx.write().authenticated = Some(user);
  Ok(Step::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::NewUser;
  use crate::storage::MemoryStore;

  async fn setup() -> (Workflows<AppError>, Arc<dyn Store>) {
    let workflows = Workflows::<AppError>::new();
    workflows.register(build().unwrap());
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    store
      .create_user(NewUser {
        username: "admin".to_string(),
        password_hash: auth_service::hash_password("admin-pass-1").unwrap(),
        is_staff: true,
        ..Default::default()
      })
      .await
      .unwrap();
    (workflows, store)
  }

  #[tokio::test]
  async fn correct_credentials_sign_in() {
    let (workflows, store) = setup().await;
    let user = sign_in(&workflows, store, "admin", "admin-pass-1").await.unwrap();
    assert!(user.is_staff);
  }

  #[tokio::test]
  async fn failures_look_the_same() {
    let (workflows, store) = setup().await;
    for (username, password) in [("admin", "wrong"), ("ghost", "admin-pass-1"), ("", "")] {
      match sign_in(&workflows, store.clone(), username, password).await {
        Err(AppError::Auth(message)) => assert_eq!(message, INVALID_CREDENTIALS),
        other => panic!("unexpected result: {:?}", other),
      }
    }
  }
}
