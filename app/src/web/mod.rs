// storefront/app/src/web/mod.rs

pub mod extractors;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::configure_app_routes;

use actix_web::http::header;
use actix_web::HttpResponse;

/// `302 Found` to `location`, the answer to every successful form post.
pub fn redirect(location: &str) -> HttpResponse {
  HttpResponse::Found().insert_header((header::LOCATION, location)).finish()
}
