// storefront/app/src/pipelines/contexts.rs

//! Data carried through each workflow. Handlers receive these wrapped in
//! `shopflow::Ctx` and must drop lock guards before awaiting.

use serde::Deserialize;
use std::sync::Arc;

use crate::models::{NewProduct, Product, Profile, User};
use crate::storage::{OrderUpsert, ProductFilter, Store};

/// Registration form as posted to `/myauth/register/`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password1: String,
  #[serde(default)]
  pub password2: String,
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
}

#[derive(Clone)]
pub struct SignupCtxData {
  pub store: Arc<dyn Store>,
  pub form: SignupForm,
  pub created_user: Option<User>,
  pub profile: Option<Profile>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub store: Arc<dyn Store>,
  pub username: String,
  pub password: String,
  pub candidate: Option<User>,
  pub authenticated: Option<User>,
}

#[derive(Clone)]
pub struct CsvImportCtxData {
  pub store: Arc<dyn Store>,
  pub bytes: Vec<u8>,
  pub parsed: Vec<NewProduct>,
  pub created: Vec<Product>,
}

/// Inputs of the operator `create-order` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
  pub username: String,
  pub delivery_address: String,
  pub promocode: String,
  /// Case-sensitive name fragment; `None` takes the whole catalog.
  pub product_name: Option<String>,
}

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub store: Arc<dyn Store>,
  pub request: OrderRequest,
  pub user: Option<User>,
  pub catalog: ProductFilter,
  pub result: Option<OrderUpsert>,
}
