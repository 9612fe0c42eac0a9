// shopflow/src/context.rs

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable pipeline context.
///
/// Every handler receives its own clone; all clones point at the same data.
/// Guards are blocking and MUST be dropped before the next `.await`.
#[derive(Debug)]
pub struct Ctx<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> Ctx<T> {
  pub fn new(data: T) -> Self {
    Ctx(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Runs `f` under the write lock and hands back its result.
  pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = self.0.write();
    f(&mut guard)
  }

  /// Copies the current state out of the lock.
  pub fn snapshot(&self) -> T
  where
    T: Clone,
  {
    self.0.read().clone()
  }

  /// Takes the data back once this is the last handle; returns `self` otherwise.
  pub fn into_inner(self) -> Result<T, Self> {
    Arc::try_unwrap(self.0)
      .map(RwLock::into_inner)
      .map_err(Ctx)
  }
}

impl<T: Send + Sync + 'static> Clone for Ctx<T> {
  fn clone(&self) -> Self {
    Ctx(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + Default + 'static> Default for Ctx<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_share_state() {
    let ctx = Ctx::new(vec![1]);
    let other = ctx.clone();
    other.write().push(2);
    assert_eq!(ctx.snapshot(), vec![1, 2]);
  }

  #[test]
  fn into_inner_requires_last_handle() {
    let ctx = Ctx::new(5_u32);
    let other = ctx.clone();
    let ctx = ctx.into_inner().expect_err("a clone is still alive");
    drop(other);
    assert_eq!(ctx.into_inner().ok(), Some(5));
  }
}
