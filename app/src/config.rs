// storefront/app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub app_base_url: String,

  pub media_root: PathBuf,
  pub upload_max_bytes: usize,

  pub export_cache_ttl: Duration,

  pub session_cookie_name: String,
  pub session_ttl: Duration,
  pub login_url: String,

  pub log_format: LogFormat,
  pub seed_db: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8000,
      database_url: None,
      app_base_url: "http://127.0.0.1:8000".to_string(),
      media_root: PathBuf::from("media"),
      upload_max_bytes: 1024 * 1024,
      export_cache_ttl: Duration::from_secs(300),
      session_cookie_name: "sessionid".to_string(),
      session_ttl: Duration::from_secs(14 * 24 * 60 * 60),
      login_url: "/myauth/login/".to_string(),
      log_format: LogFormat::Pretty,
      seed_db: false,
    }
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let defaults = Self::default();
    let get_env = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = parse_env("SERVER_PORT", get_env("SERVER_PORT"), defaults.server_port)?;
    let database_url = get_env("DATABASE_URL");
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|| format!("http://{}:{}", server_host, server_port));

    let media_root = get_env("MEDIA_ROOT").map(PathBuf::from).unwrap_or(defaults.media_root);
    let upload_max_bytes = parse_env("UPLOAD_MAX_BYTES", get_env("UPLOAD_MAX_BYTES"), defaults.upload_max_bytes)?;

    let export_cache_ttl = Duration::from_secs(parse_env(
      "EXPORT_CACHE_TTL_SECS",
      get_env("EXPORT_CACHE_TTL_SECS"),
      defaults.export_cache_ttl.as_secs(),
    )?);

    let session_cookie_name = get_env("SESSION_COOKIE_NAME").unwrap_or(defaults.session_cookie_name);
    let session_ttl = Duration::from_secs(parse_env(
      "SESSION_TTL_SECS",
      get_env("SESSION_TTL_SECS"),
      defaults.session_ttl.as_secs(),
    )?);
    let login_url = get_env("LOGIN_URL").unwrap_or(defaults.login_url);

    let log_format = match get_env("LOG_FORMAT").as_deref() {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}': expected 'pretty' or 'json'", other))),
    };

    let seed_db = parse_env("SEED_DB", get_env("SEED_DB"), defaults.seed_db)?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      media_root,
      upload_max_bytes,
      export_cache_ttl,
      session_cookie_name,
      session_ttl,
      login_url,
      log_format,
      seed_db,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }

  /// Absolute URL for a site path, used by the feed and the sitemap.
  pub fn absolute_url(&self, path: &str) -> String {
    format!("{}{}", self.app_base_url.trim_end_matches('/'), path)
  }
}

fn parse_env<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
  T: std::str::FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    None => Ok(default),
    Some(value) => value
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, value, e))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn absolute_url_joins_without_double_slash() {
    let config = AppConfig {
      app_base_url: "https://shop.example/".to_string(),
      ..AppConfig::default()
    };
    assert_eq!(config.absolute_url("/blog/articles/"), "https://shop.example/blog/articles/");
  }

  #[test]
  fn parse_env_reports_the_variable_name() {
    let err = parse_env::<u16>("SERVER_PORT", Some("eighty".to_string()), 80).unwrap_err();
    assert!(err.to_string().contains("SERVER_PORT"));
    assert_eq!(parse_env::<u16>("SERVER_PORT", None, 80).unwrap(), 80);
  }
}
