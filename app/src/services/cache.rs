// storefront/app/src/services/cache.rs

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Key for the product export payload.
pub const PRODUCTS_EXPORT_KEY: &str = "products_data_export";

/// Small in-process TTL cache of JSON values.
///
/// Entries are never refreshed in place: a reader that misses computes the
/// value and calls `set`. Writes to the underlying data do not invalidate.
#[derive(Debug)]
pub struct TtlCache {
  entries: RwLock<HashMap<String, (Instant, Value)>>,
  default_ttl: Duration,
  hits: AtomicU64,
  misses: AtomicU64,
}

impl TtlCache {
  pub fn new(default_ttl: Duration) -> Self {
    Self {
      entries: RwLock::new(HashMap::new()),
      default_ttl,
      hits: AtomicU64::new(0),
      misses: AtomicU64::new(0),
    }
  }

  pub fn get(&self, key: &str) -> Option<Value> {
    let now = Instant::now();
    let found = match self.entries.read().get(key) {
      Some((expires_at, value)) if *expires_at > now => Some(value.clone()),
      _ => None,
    };
    if found.is_some() {
      self.hits.fetch_add(1, Ordering::Relaxed);
    } else {
      self.misses.fetch_add(1, Ordering::Relaxed);
    }
    found
  }

  pub fn set(&self, key: &str, value: Value) {
    self.set_with_ttl(key, value, self.default_ttl);
  }

  pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) {
    self.entries.write().insert(key.to_string(), (Instant::now() + ttl, value));
  }

  /// `(hits, misses)` since start.
  pub fn stats(&self) -> (u64, u64) {
    (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn hit_until_expiry() {
    let cache = TtlCache::new(Duration::from_secs(300));
    assert!(cache.get(PRODUCTS_EXPORT_KEY).is_none());
    cache.set(PRODUCTS_EXPORT_KEY, json!({"products": []}));
    assert_eq!(cache.get(PRODUCTS_EXPORT_KEY), Some(json!({"products": []})));
    assert_eq!(cache.stats(), (1, 1));

    cache.set_with_ttl("short", json!(1), Duration::ZERO);
    assert!(cache.get("short").is_none());
    cache.set_with_ttl(PRODUCTS_EXPORT_KEY, json!({"products": [1]}), Duration::ZERO);
    assert!(cache.get(PRODUCTS_EXPORT_KEY).is_none());
  }
}
