// storefront/app/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub is_staff: bool,
  pub date_joined: DateTime<Utc>,
}

impl User {
  pub fn summary(&self) -> UserSummary {
    UserSummary {
      id: self.id,
      username: self.username.clone(),
      first_name: self.first_name.clone(),
      last_name: self.last_name.clone(),
    }
  }

  pub fn session_user(&self) -> SessionUser {
    SessionUser {
      id: self.id,
      username: self.username.clone(),
      is_staff: self.is_staff,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub id: i64,
  pub username: String,
  pub first_name: String,
  pub last_name: String,
}

impl UserSummary {
  pub fn verbose_name(&self) -> String {
    verbose_name(&self.first_name, &self.last_name, &self.username)
  }
}

/// Upper-cased full name, or the username when no name is set.
fn verbose_name(first_name: &str, last_name: &str, username: &str) -> String {
  let full = format!("{} {}", first_name, last_name);
  let full = full.trim();
  if full.is_empty() {
    username.to_uppercase()
  } else {
    full.to_uppercase()
  }
}

/// What a session remembers about its logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
  pub id: i64,
  pub username: String,
  pub is_staff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub first_name: String,
  pub last_name: String,
  pub is_staff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
  pub user_id: i64,
  pub bio: String,
  pub agreement_accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
  pub id: i64,
  pub name: String,
  pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(first: &str, last: &str) -> User {
    User {
      id: 1,
      username: "bob".to_string(),
      email: String::new(),
      first_name: first.to_string(),
      last_name: last.to_string(),
      password_hash: "secret".to_string(),
      is_staff: false,
      date_joined: Utc::now(),
    }
  }

  #[test]
  fn verbose_name_falls_back_to_username() {
    assert_eq!(user("Ann", "Lee").summary().verbose_name(), "ANN LEE");
    assert_eq!(user("Ann", "").summary().verbose_name(), "ANN");
    assert_eq!(user("", "").summary().verbose_name(), "BOB");
  }

  #[test]
  fn password_hash_is_never_serialized() {
    let json = serde_json::to_value(user("", "")).unwrap();
    assert!(json.get("password_hash").is_none());
    assert_eq!(json["username"], "bob");
  }
}
