// storefront/app/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;
use crate::web::handlers::{
  admin_handlers, api_handlers, auth_handlers, blog_handlers, order_handlers, product_handlers, request_handlers,
  shop_handlers,
};

/// Liveness plus the in-process counters; does not touch the database.
async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let (cache_hits, cache_misses) = app_state.cache.stats();
  HttpResponse::Ok().json(json!({
    "status": "ok",
    "store": app_state.store.kind(),
    "uptime_secs": app_state.started_at.elapsed().as_secs(),
    "counters": app_state.counters.snapshot(),
    "cache": { "hits": cache_hits, "misses": cache_misses },
    "sessions": app_state.sessions.len(),
  }))
}

// Called from `main.rs` and from the service tests.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/api/v1/health", web::get().to(health_check_handler))
    .route("/sitemap.xml", web::get().to(blog_handlers::sitemap_handler))
    .service(shop_scope())
    .service(admin_scope())
    .service(auth_scope())
    .service(request_scope())
    .service(blog_scope());
}

fn shop_scope() -> actix_web::Scope {
  web::scope("/shop")
    .route("/", web::get().to(shop_handlers::shop_index_handler))
    .service(
      web::resource("/groups/")
        .route(web::get().to(shop_handlers::list_groups_handler))
        .route(web::post().to(shop_handlers::create_group_handler)),
    )
    // Products
    .route("/products/", web::get().to(product_handlers::list_products_handler))
    .route("/products/export", web::get().to(product_handlers::products_export_handler))
    .service(
      web::resource("/products/create/")
        .route(web::get().to(product_handlers::create_product_form_handler))
        .route(web::post().to(product_handlers::create_product_handler)),
    )
    .service(
      web::resource("/products/update/{pk}/")
        .route(web::get().to(product_handlers::update_product_form_handler))
        .route(web::post().to(product_handlers::update_product_handler)),
    )
    .service(
      web::resource("/products/confirm-delete/{pk}/")
        .route(web::get().to(product_handlers::confirm_delete_product_handler))
        .route(web::post().to(product_handlers::delete_product_handler)),
    )
    .route("/products/{pk}/", web::get().to(product_handlers::product_details_handler))
    // Orders
    .route("/orders/", web::get().to(order_handlers::list_orders_handler))
    .service(
      web::resource("/orders/create/")
        .route(web::get().to(order_handlers::create_order_form_handler))
        .route(web::post().to(order_handlers::create_order_handler)),
    )
    .service(
      web::resource("/orders/update/{pk}/")
        .route(web::get().to(order_handlers::update_order_form_handler))
        .route(web::post().to(order_handlers::update_order_handler)),
    )
    .service(
      web::resource("/orders/confirm-delete/{pk}/")
        .route(web::get().to(order_handlers::confirm_delete_order_handler))
        .route(web::post().to(order_handlers::delete_order_handler)),
    )
    .route("/orders/{pk}/", web::get().to(order_handlers::order_details_handler))
    .service(api_scope())
}

fn api_scope() -> actix_web::Scope {
  // Fixed segments are registered before `{pk}` so they are not captured by it.
  web::scope("/api")
    .route("/", web::get().to(api_handlers::api_root_handler))
    .service(
      web::resource("/products/")
        .route(web::get().to(api_handlers::list_products_handler))
        .route(web::post().to(api_handlers::create_product_handler)),
    )
    .route("/products/download_csv/", web::get().to(api_handlers::download_csv_handler))
    .route("/products/upload_csv/", web::post().to(api_handlers::upload_csv_handler))
    .service(
      web::resource("/products/{pk}/")
        .route(web::get().to(api_handlers::retrieve_product_handler))
        .route(web::put().to(api_handlers::replace_product_handler))
        .route(web::patch().to(api_handlers::patch_product_handler))
        .route(web::delete().to(api_handlers::delete_product_handler)),
    )
}

fn admin_scope() -> actix_web::Scope {
  web::scope("/admin")
    .route("/", web::get().to(admin_handlers::admin_index_handler))
    .route("/shop/products/", web::get().to(admin_handlers::products_changelist_handler))
    .route("/shop/products/archive/", web::post().to(admin_handlers::archive_products_handler))
    .route("/shop/products/unarchive/", web::post().to(admin_handlers::unarchive_products_handler))
    .route("/shop/products/export-csv/", web::post().to(admin_handlers::export_products_csv_handler))
    .service(
      web::resource("/shop/products/import-products-csv/")
        .route(web::get().to(admin_handlers::import_products_form_handler))
        .route(web::post().to(admin_handlers::import_products_csv_handler)),
    )
    .route("/shop/orders/", web::get().to(admin_handlers::orders_changelist_handler))
}

fn auth_scope() -> actix_web::Scope {
  web::scope("/myauth")
    .route("/hello/", web::get().to(auth_handlers::hello_handler))
    .route("/about-me/", web::get().to(auth_handlers::about_me_handler))
    .service(
      web::resource("/register/")
        .route(web::get().to(auth_handlers::register_form_handler))
        .route(web::post().to(auth_handlers::register_handler)),
    )
    .service(
      web::resource("/login/")
        .route(web::get().to(auth_handlers::login_form_handler))
        .route(web::post().to(auth_handlers::login_handler)),
    )
    .route("/logout/", web::get().to(auth_handlers::logout_handler))
    .route("/cookie/set/", web::get().to(auth_handlers::set_cookie_handler))
    .route("/cookie/get/", web::get().to(auth_handlers::get_cookie_handler))
    .route("/session/set/", web::get().to(auth_handlers::set_session_handler))
    .route("/session/get/", web::get().to(auth_handlers::get_session_handler))
    .route("/foo-bar/", web::get().to(auth_handlers::foo_bar_handler))
}

fn request_scope() -> actix_web::Scope {
  web::scope("/req")
    .route("/get/", web::get().to(request_handlers::get_params_handler))
    .service(
      web::resource("/bio/")
        .route(web::get().to(request_handlers::bio_form_handler))
        .route(web::post().to(request_handlers::bio_submit_handler)),
    )
    .route("/upload/", web::post().to(request_handlers::upload_file_handler))
}

fn blog_scope() -> actix_web::Scope {
  web::scope("/blog")
    .route("/articles/", web::get().to(blog_handlers::list_articles_handler))
    .route("/articles/latest/feed/", web::get().to(blog_handlers::latest_articles_feed_handler))
    .route("/articles/{pk}", web::get().to(blog_handlers::article_details_handler))
}
