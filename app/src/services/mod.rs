// storefront/app/src/services/mod.rs

pub mod auth_service;
pub mod cache;
pub mod csv_service;
pub mod feeds;
pub mod media;
pub mod sessions;

pub use cache::TtlCache;
pub use media::MediaStorage;
pub use sessions::{Session, SessionStore};
