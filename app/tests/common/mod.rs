// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use once_cell::sync::Lazy;
use std::sync::Arc;
use uuid::Uuid;

use storefront_app::models::{NewUser, Profile, User};
use storefront_app::services::auth_service::hash_password;
use storefront_app::storage::MemoryStore;
use storefront_app::{AppConfig, AppState};

/// Builds the full route table over `$state` with the production middleware.
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .wrap(actix_web::middleware::from_fn(
          storefront_app::web::middleware::count_requests,
        ))
        .wrap(actix_web::middleware::from_fn(
          storefront_app::web::middleware::capture_user_agent,
        ))
        .configure(storefront_app::web::configure_app_routes),
    )
    .await
  };
}

static TRACING: Lazy<()> = Lazy::new(|| {
  let filter = std::env::var("TEST_LOG").unwrap_or_else(|_| "warn".to_string());
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_test_writer()
    .try_init();
});

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Fresh in-memory state with media written under a unique temp dir.
pub fn test_state() -> AppState {
  Lazy::force(&TRACING);
  let config = AppConfig {
    media_root: std::env::temp_dir().join(format!("storefront-test-{}", Uuid::new_v4().simple())),
    ..AppConfig::default()
  };
  AppState::new(config, Arc::new(MemoryStore::new())).expect("state should build")
}

pub async fn create_user(state: &AppState, username: &str, staff: bool) -> User {
  let user = state
    .store
    .create_user(NewUser {
      username: username.to_string(),
      email: format!("{}@example.com", username),
      password_hash: hash_password(TEST_PASSWORD).expect("hash"),
      is_staff: staff,
      ..NewUser::default()
    })
    .await
    .expect("user should be created");
  state
    .store
    .create_profile(Profile {
      user_id: user.id,
      ..Profile::default()
    })
    .await
    .expect("profile should be created");
  user
}

/// A user plus a session cookie that is already logged in as them.
pub async fn logged_in(state: &AppState, username: &str, staff: bool) -> (User, Cookie<'static>) {
  let user = create_user(state, username, staff).await;
  let key = state.sessions.login(None, user.session_user());
  let cookie = Cookie::new(state.config.session_cookie_name.clone(), key);
  (user, cookie)
}

const BOUNDARY: &str = "storefront-test-boundary";

/// `multipart/form-data` body: text `fields` then `(field, file name, bytes)` files.
pub fn multipart_body(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> (String, Vec<u8>) {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
  }
  for (name, file_name, bytes) in files {
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
      format!(
        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
        name, file_name
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
  (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}
