// storefront/app/src/web/handlers/mod.rs

pub mod admin_handlers;
pub mod api_handlers;
pub mod auth_handlers;
pub mod blog_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod request_handlers;
pub mod shop_handlers;
