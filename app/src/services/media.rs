// storefront/app/src/services/media.rs

//! File storage under the media root. Paths handed out are relative to the
//! root and always use `/`.

use std::path::PathBuf;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const RECEIPTS_DIR: &str = "orders/receipts";
pub const UPLOADS_DIR: &str = "uploads";

#[derive(Debug, Clone)]
pub struct MediaStorage {
  root: PathBuf,
}

impl MediaStorage {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn path_of(&self, relative: &str) -> PathBuf {
    relative.split('/').filter(|s| !matches!(*s, "" | "." | "..")).fold(self.root.clone(), |p, s| p.join(s))
  }

  /// Writes `bytes` to `dir/<sanitized name>`, adding a random suffix when
  /// the name is already taken. Returns the stored relative path.
  #[instrument(name = "media::save", skip(self, bytes), fields(size = bytes.len()))]
  pub async fn save(&self, dir: &str, file_name: &str, bytes: &[u8]) -> Result<String> {
    let dir = dir.trim_matches('/');
    let mut name = sanitize_file_name(file_name);
    let target_dir = self.path_of(dir);
    tokio::fs::create_dir_all(&target_dir).await?;

    if tokio::fs::try_exists(target_dir.join(&name)).await? {
      name = with_suffix(&name, &Uuid::new_v4().simple().to_string()[..7]);
    }
    tokio::fs::write(target_dir.join(&name), bytes).await?;
    let relative = format!("{}/{}", dir, name);
    debug!(path = %relative, "Stored media file.");
    Ok(relative)
  }

  /// Removing a file that is already gone is not an error.
  pub async fn delete(&self, relative: &str) -> Result<()> {
    match tokio::fs::remove_file(self.path_of(relative)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        warn!(path = %relative, "Media file already missing.");
        Ok(())
      }
      Err(e) => Err(AppError::Io(e)),
    }
  }
}

/// Keeps the final path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(raw: &str) -> String {
  let base = raw.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default().trim();
  let cleaned: String = base
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
    .collect();
  let cleaned = cleaned.trim_start_matches('.').to_string();
  if cleaned.is_empty() {
    "file".to_string()
  } else {
    cleaned
  }
}

fn with_suffix(name: &str, suffix: &str) -> String {
  match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
    _ => format!("{}_{}", name, suffix),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sanitizes_names() {
    assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_file_name("C:\\photos\\my cat.png"), "my_cat.png");
    assert_eq!(sanitize_file_name(".hidden"), "hidden");
    assert_eq!(sanitize_file_name(""), "file");
  }

  #[test]
  fn relative_paths_stay_under_root() {
    let media = MediaStorage::new("/srv/media");
    assert_eq!(media.path_of("../x/./y.txt"), PathBuf::from("/srv/media/x/y.txt"));
  }

  #[tokio::test]
  async fn save_avoids_overwrites() {
    let root = std::env::temp_dir().join(format!("storefront-media-{}", Uuid::new_v4()));
    let media = MediaStorage::new(&root);
    let first = media.save("uploads", "a.txt", b"one").await.unwrap();
    let second = media.save("uploads", "a.txt", b"two").await.unwrap();
    assert_eq!(first, "uploads/a.txt");
    assert_ne!(first, second);
    assert!(second.starts_with("uploads/a_") && second.ends_with(".txt"));
    media.delete(&first).await.unwrap();
    media.delete(&first).await.unwrap();
    let _ = tokio::fs::remove_dir_all(root).await;
  }
}
