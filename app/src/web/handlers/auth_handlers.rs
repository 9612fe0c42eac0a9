// storefront/app/src/web/handlers/auth_handlers.rs

//! Account pages and the cookie/session demos under `/myauth/`.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::errors::Result;
use crate::pipelines::contexts::SignupForm;
use crate::pipelines::{signin_pipeline, signup_pipeline};
use crate::state::AppState;
use crate::web::extractors::{expired_session_cookie, session_cookie, session_key, CurrentUser};
use crate::web::redirect;

const AFTER_LOGIN_URL: &str = "/admin/";
const AFTER_REGISTER_URL: &str = "/myauth/about-me/";
const DEMO_COOKIE: &str = "fizz";
const DEMO_SESSION_KEY: &str = "foobar";

pub async fn hello_handler() -> HttpResponse {
  HttpResponse::Ok()
    .content_type("text/html; charset=utf-8")
    .body("<h1>Hello World!</h1>")
}

#[instrument(name = "handler::about_me", skip_all)]
pub async fn about_me_handler(app_state: web::Data<AppState>, current: CurrentUser) -> Result<HttpResponse> {
  let Some(session_user) = current.0 else {
    return Ok(HttpResponse::Ok().json(json!({ "user": Value::Null, "profile": Value::Null })));
  };
  let user = app_state.store.user_by_id(session_user.id).await?;
  let profile = app_state.store.profile(session_user.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "user": user, "profile": profile })))
}

pub async fn register_form_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "form": { "fields": ["username", "email", "first_name", "last_name", "password1", "password2"] },
  }))
}

/// Creates the account, then logs the new user in.
#[instrument(name = "handler::register", skip_all, fields(username = %form.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  form: web::Form<SignupForm>,
) -> Result<HttpResponse> {
  let user = signup_pipeline::sign_up(&app_state.workflows, app_state.store.clone(), form.into_inner()).await?;
  let key = app_state.sessions.login(session_key(&req).as_deref(), user.session_user());
  info!(user_id = user.id, "Registered and logged in.");
  Ok(
    HttpResponse::Found()
      .append_header((header::LOCATION, AFTER_REGISTER_URL))
      .cookie(session_cookie(&app_state.config, &key))
      .finish(),
  )
}

pub async fn login_form_handler(current: CurrentUser) -> HttpResponse {
  if current.0.is_some() {
    return redirect(AFTER_LOGIN_URL);
  }
  HttpResponse::Ok().json(json!({ "form": { "fields": ["username", "password"] } }))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NextQuery {
  pub next: Option<String>,
}

/// Only same-site absolute paths are honoured as `next`.
fn safe_next(next: Option<&str>) -> &str {
  match next {
    Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
    _ => AFTER_LOGIN_URL,
  }
}

#[instrument(name = "handler::login", skip_all, fields(username = %form.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  query: web::Query<NextQuery>,
  form: web::Form<LoginForm>,
) -> Result<HttpResponse> {
  let user = signin_pipeline::sign_in(
    &app_state.workflows,
    app_state.store.clone(),
    &form.username,
    &form.password,
  )
  .await?;
  let key = app_state.sessions.login(session_key(&req).as_deref(), user.session_user());
  Ok(
    HttpResponse::Found()
      .append_header((header::LOCATION, safe_next(query.next.as_deref())))
      .cookie(session_cookie(&app_state.config, &key))
      .finish(),
  )
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
  if let Some(key) = session_key(&req) {
    app_state.sessions.flush(&key);
    info!("Session flushed on logout.");
  }
  HttpResponse::Found()
    .append_header((header::LOCATION, app_state.config.login_url.as_str()))
    .cookie(expired_session_cookie(&app_state.config))
    .finish()
}

pub async fn set_cookie_handler() -> HttpResponse {
  let cookie = Cookie::build(DEMO_COOKIE, "buzz")
    .path("/")
    .max_age(CookieDuration::seconds(3600 * 24))
    .finish();
  HttpResponse::Ok().cookie(cookie).body("Cookie set:")
}

pub async fn get_cookie_handler(req: HttpRequest) -> HttpResponse {
  let value = req
    .cookie(DEMO_COOKIE)
    .map(|c| c.value().to_string())
    .unwrap_or_else(|| "default_value".to_string());
  HttpResponse::Ok().body(format!("Cookie value: '{}'", value))
}

pub async fn set_session_handler(app_state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
  let key = app_state
    .sessions
    .set_value(session_key(&req).as_deref(), DEMO_SESSION_KEY, json!("spameggs"));
  HttpResponse::Ok()
    .cookie(session_cookie(&app_state.config, &key))
    .body("Session set")
}

pub async fn get_session_handler(app_state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
  let value = session_key(&req)
    .and_then(|key| app_state.sessions.value(&key, DEMO_SESSION_KEY))
    .and_then(|v| v.as_str().map(str::to_string))
    .unwrap_or_else(|| "default_value".to_string());
  HttpResponse::Ok().body(format!("Session value: '{}'", value))
}

pub async fn foo_bar_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "foo": "bar", "spam": "eggs" }))
}
