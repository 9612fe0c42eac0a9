// storefront/app/src/models/mod.rs

//! Data structures representing stored entities and the validated inputs
//! used to create or change them.

pub mod article;
pub mod order;
pub mod product;
pub mod user;

pub use article::{Article, NewArticle};
pub use order::{NewOrder, Order, OrderDetails, OrderForm, OrderTotal};
pub use product::{NewProduct, PriceStats, Product, ProductChanges, ProductForm, ProductImage};
pub use user::{Group, NewUser, Profile, SessionUser, User, UserSummary};
