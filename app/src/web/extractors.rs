// storefront/app/src/web/extractors.rs

//! Session-backed user extractors.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::SessionUser;
use crate::state::AppState;

/// The session key sent by the client, if any.
pub fn session_key(req: &HttpRequest) -> Option<String> {
  let state = req.app_data::<web::Data<AppState>>()?;
  req.cookie(&state.config.session_cookie_name).map(|c| c.value().to_string())
}

pub fn session_cookie(config: &AppConfig, key: &str) -> Cookie<'static> {
  Cookie::build(config.session_cookie_name.clone(), key.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::seconds(config.session_ttl.as_secs() as i64))
    .finish()
}

pub fn expired_session_cookie(config: &AppConfig) -> Cookie<'static> {
  let mut cookie = Cookie::build(config.session_cookie_name.clone(), "").path("/").finish();
  cookie.make_removal();
  cookie
}

fn session_user(req: &HttpRequest) -> Option<SessionUser> {
  let state = req.app_data::<web::Data<AppState>>()?;
  let key = req.cookie(&state.config.session_cookie_name)?;
  state.sessions.user(key.value())
}

/// `{login_url}?next={path}` for the current request.
fn login_redirect(req: &HttpRequest) -> AppError {
  let login_url = req
    .app_data::<web::Data<AppState>>()
    .map(|state| state.config.login_url.clone())
    .unwrap_or_else(|| AppConfig::default().login_url);
  let target = match req.query_string() {
    "" => req.path().to_string(),
    query => format!("{}?{}", req.path(), query),
  };
  let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
  AppError::LoginRequired(format!("{}?next={}", login_url, next.replace("%2F", "/")))
}

/// Logged-in user or `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<SessionUser>);

impl FromRequest for CurrentUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(Ok(CurrentUser(session_user(req))))
  }
}

/// Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct RequireUser(pub SessionUser);

impl FromRequest for RequireUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(session_user(req).map(RequireUser).ok_or_else(|| login_redirect(req)))
  }
}

/// Staff only. Anonymous requests go to login; other users get 403.
#[derive(Debug, Clone)]
pub struct StaffUser(pub SessionUser);

impl FromRequest for StaffUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    ready(match session_user(req) {
      Some(user) if user.is_staff => Ok(StaffUser(user)),
      Some(user) => {
        warn!(user_id = user.id, path = %req.path(), "Non-staff user denied.");
        Err(AppError::Auth("Staff access required.".to_string()))
      }
      None => Err(login_redirect(req)),
    })
  }
}
