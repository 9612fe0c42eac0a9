// storefront/app/src/services/sessions.rs

//! Server-side sessions addressed by an opaque cookie value.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use crate::models::SessionUser;

#[derive(Debug, Clone)]
pub struct Session {
  pub user: Option<SessionUser>,
  pub values: HashMap<String, Value>,
  expires_at: Instant,
}

impl Session {
  fn new(ttl: Duration) -> Self {
    Self {
      user: None,
      values: HashMap::new(),
      expires_at: Instant::now() + ttl,
    }
  }

  fn is_expired(&self, now: Instant) -> bool {
    now >= self.expires_at
  }
}

/// Sessions live in process memory and expire `ttl` after their last write.
#[derive(Debug)]
pub struct SessionStore {
  sessions: RwLock<HashMap<String, Session>>,
  ttl: Duration,
}

impl SessionStore {
  pub fn new(ttl: Duration) -> Self {
    Self {
      sessions: RwLock::new(HashMap::new()),
      ttl,
    }
  }

  /// Returns a live session. Expired sessions are dropped on sight.
  pub fn get(&self, key: &str) -> Option<Session> {
    let now = Instant::now();
    {
      let sessions = self.sessions.read();
      match sessions.get(key) {
        Some(session) if !session.is_expired(now) => return Some(session.clone()),
        None => return None,
        Some(_) => {}
      }
    }
    self.sessions.write().remove(key);
    debug!("Dropped expired session.");
    None
  }

  pub fn user(&self, key: &str) -> Option<SessionUser> {
    self.get(key).and_then(|s| s.user)
  }

  pub fn value(&self, key: &str, name: &str) -> Option<Value> {
    self.get(key).and_then(|mut s| s.values.remove(name))
  }

  /// Writes `name` into the session under `key`, creating a session when
  /// `key` is absent or stale. Returns the key to hand back in the cookie.
  pub fn set_value(&self, key: Option<&str>, name: &str, value: Value) -> String {
    self.modify(key, |session| {
      session.values.insert(name.to_string(), value);
    })
  }

  /// Binds a user to a fresh session key. Values from the previous session
  /// carry over; the old key stops working.
  pub fn login(&self, previous: Option<&str>, user: SessionUser) -> String {
    let mut session = previous
      .and_then(|key| self.take_live(key))
      .unwrap_or_else(|| Session::new(self.ttl));
    session.user = Some(user);
    session.expires_at = Instant::now() + self.ttl;
    let key = new_key();
    let mut sessions = self.sessions.write();
    purge_expired(&mut sessions, Instant::now());
    sessions.insert(key.clone(), session);
    key
  }

  /// Discards the whole session.
  pub fn flush(&self, key: &str) {
    self.sessions.write().remove(key);
  }

  pub fn len(&self) -> usize {
    self.sessions.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn take_live(&self, key: &str) -> Option<Session> {
    let session = self.sessions.write().remove(key)?;
    (!session.is_expired(Instant::now())).then_some(session)
  }

  fn modify(&self, key: Option<&str>, f: impl FnOnce(&mut Session)) -> String {
    let now = Instant::now();
    let mut sessions = self.sessions.write();
    let live_key = key.filter(|k| sessions.get(*k).is_some_and(|s| !s.is_expired(now)));
    let key = match live_key {
      Some(k) => k.to_string(),
      None => {
        purge_expired(&mut sessions, now);
        let k = new_key();
        sessions.insert(k.clone(), Session::new(self.ttl));
        k
      }
    };
    if let Some(session) = sessions.get_mut(&key) {
      f(session);
      session.expires_at = now + self.ttl;
    }
    key
  }
}

fn new_key() -> String {
  Uuid::new_v4().simple().to_string()
}

/// Called whenever a session is created.
fn purge_expired(sessions: &mut HashMap<String, Session>, now: Instant) {
  let before = sessions.len();
  sessions.retain(|_, s| !s.is_expired(now));
  let purged = before - sessions.len();
  if purged > 0 {
    debug!(purged, "Purged expired sessions.");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn alice() -> SessionUser {
    SessionUser {
      id: 1,
      username: "alice".to_string(),
      is_staff: false,
    }
  }

  #[test]
  fn values_round_trip_on_the_same_key() {
    let store = SessionStore::new(Duration::from_secs(60));
    let key = store.set_value(None, "foobar", json!("spameggs"));
    assert_eq!(store.value(&key, "foobar"), Some(json!("spameggs")));
    let same = store.set_value(Some(&key), "other", json!(1));
    assert_eq!(same, key);
  }

  #[test]
  fn login_rotates_the_key_and_keeps_values() {
    let store = SessionStore::new(Duration::from_secs(60));
    let anon = store.set_value(None, "foobar", json!("spameggs"));
    let key = store.login(Some(&anon), alice());
    assert_ne!(key, anon);
    assert!(store.get(&anon).is_none());
    assert_eq!(store.user(&key), Some(alice()));
    assert_eq!(store.value(&key, "foobar"), Some(json!("spameggs")));
    store.flush(&key);
    assert!(store.user(&key).is_none());
  }

  #[test]
  fn expired_sessions_vanish() {
    let store = SessionStore::new(Duration::ZERO);
    let key = store.login(None, alice());
    assert!(store.get(&key).is_none());
    assert!(store.is_empty());
  }

  fn plant_expired(store: &SessionStore, key: &str) {
    let session = Session {
      expires_at: Instant::now(),
      ..Session::new(Duration::ZERO)
    };
    store.sessions.write().insert(key.to_string(), session);
  }

  #[test]
  fn creating_a_session_purges_abandoned_ones() {
    let store = SessionStore::new(Duration::from_secs(60));
    plant_expired(&store, "abandoned");
    let key = store.set_value(None, "x", json!(true));
    assert!(!store.sessions.read().contains_key("abandoned"));
    assert_eq!(store.len(), 1);

    plant_expired(&store, "abandoned-too");
    let user_key = store.login(None, alice());
    assert!(!store.sessions.read().contains_key("abandoned-too"));
    assert_eq!(store.len(), 2);
    assert!(store.get(&key).is_some());
    assert!(store.get(&user_key).is_some());
  }
}
