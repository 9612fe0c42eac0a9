// tests/shop_tests.rs

#[macro_use]
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::test;
use rust_decimal::Decimal;
use serde_json::Value;

use common::{logged_in, multipart_body, test_state};
use storefront_app::models::NewProduct;
use storefront_app::storage::ProductFilter;

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
  resp
    .headers()
    .get(header::LOCATION)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .to_string()
}

#[actix_web::test]
async fn product_create_redirects_to_list_and_persists() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/shop/products/create/")
    .set_form(vec![
      ("name", "Table"),
      ("description", "Oak, seats six"),
      ("price", "123.45"),
      ("discount", "10"),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/shop/products/");

  let products = state.store.list_products(&ProductFilter::default()).await.unwrap();
  assert_eq!(products.len(), 1);
  assert_eq!(products[0].name, "Table");
  assert_eq!(products[0].price, Decimal::new(12345, 2));
  assert_eq!(products[0].discount, 10);
  assert!(!products[0].archived);
}

#[actix_web::test]
async fn product_create_rejects_a_bad_price() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/shop/products/create/")
    .set_form(vec![("name", "Table"), ("price", "cheap")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["errors"]["price"].is_array());
  assert!(state.store.list_products(&ProductFilter::default()).await.unwrap().is_empty());
}

#[actix_web::test]
async fn product_details_and_missing_product() {
  let state = test_state();
  let product = state
    .store
    .create_product(NewProduct::named("Lamp", Decimal::new(2500, 2)))
    .await
    .unwrap();
  let app = init_app!(state);

  let req = test::TestRequest::get()
    .uri(&format!("/shop/products/{}/", product.id))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = test::read_body(resp).await;
  assert!(String::from_utf8_lossy(&body).contains("Lamp"));

  let req = test::TestRequest::get().uri("/shop/products/999999/").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn product_list_hides_archived_products() {
  let state = test_state();
  state
    .store
    .create_products(vec![
      NewProduct::named("Chair", Decimal::new(4990, 2)),
      NewProduct {
        archived: true,
        ..NewProduct::named("Old chair", Decimal::new(990, 2))
      },
    ])
    .await
    .unwrap();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/shop/products/").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  let names: Vec<&str> = body["products"]
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, vec!["Chair"]);
}

#[actix_web::test]
async fn product_delete_archives_instead_of_removing() {
  let state = test_state();
  let product = state
    .store
    .create_product(NewProduct::named("Sofa", Decimal::new(50000, 2)))
    .await
    .unwrap();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri(&format!("/shop/products/confirm-delete/{}/", product.id))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/shop/products/");

  let stored = state.store.get_product(product.id).await.unwrap().unwrap();
  assert!(stored.archived);
}

#[actix_web::test]
async fn product_update_replaces_images() {
  let state = test_state();
  let product = state
    .store
    .create_product(NewProduct::named("Desk", Decimal::new(30000, 2)))
    .await
    .unwrap();
  let app = init_app!(state);

  let (content_type, body) = multipart_body(
    &[("name", "Standing desk"), ("price", "350.00")],
    &[("images", "front.png", b"png-1".as_slice()), ("images", "side.png", b"png-2".as_slice())],
  );
  let req = test::TestRequest::post()
    .uri(&format!("/shop/products/update/{}/", product.id))
    .insert_header((header::CONTENT_TYPE, content_type.clone()))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), format!("/shop/products/{}/", product.id));

  let stored = state.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.name, "Standing desk");
  assert_eq!(state.store.product_images(product.id).await.unwrap().len(), 2);

  let (content_type, body) = multipart_body(&[("name", "Standing desk")], &[("images", "top.png", b"png-3".as_slice())]);
  let req = test::TestRequest::post()
    .uri(&format!("/shop/products/update/{}/", product.id))
    .insert_header((header::CONTENT_TYPE, content_type))
    .set_payload(body)
    .to_request();
  test::call_service(&app, req).await;
  let images = state.store.product_images(product.id).await.unwrap();
  assert_eq!(images.len(), 1);
  assert!(images[0].image.starts_with(&format!("products/product_{}/images", product.id)));
}

#[actix_web::test]
async fn export_is_ordered_by_pk_and_cached() {
  let state = test_state();
  state
    .store
    .create_products(vec![
      NewProduct::named("Zebra lamp", Decimal::new(1000, 2)),
      NewProduct {
        archived: true,
        ..NewProduct::named("Apple crate", Decimal::new(250, 2))
      },
    ])
    .await
    .unwrap();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/shop/products/export").to_request();
  let first: Value = test::call_and_read_body_json(&app, req).await;
  let products = first["products"].as_array().unwrap();
  assert_eq!(products.len(), 2);
  assert_eq!(products[0]["name"], "Zebra lamp");
  assert_eq!(products[0]["price"], "10.00");
  assert_eq!(products[1]["archived"], true);

  state
    .store
    .create_product(NewProduct::named("Late arrival", Decimal::ONE))
    .await
    .unwrap();
  let req = test::TestRequest::get().uri("/shop/products/export").to_request();
  let second: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(second, first);
  assert_eq!(state.cache.stats(), (1, 1));
}

#[actix_web::test]
async fn orders_require_login() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/shop/orders/").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/myauth/login/?next=/shop/orders/");
}

#[actix_web::test]
async fn logged_in_user_creates_and_lists_orders() {
  let state = test_state();
  let (user, cookie) = logged_in(&state, "buyer", false).await;
  let product = state
    .store
    .create_product(NewProduct::named("Mug", Decimal::new(800, 2)))
    .await
    .unwrap();
  let app = init_app!(state);

  let user_id = user.id.to_string();
  let product_id = product.id.to_string();
  let req = test::TestRequest::post()
    .uri("/shop/orders/create/")
    .set_form(vec![
      ("delivery_address", "Baker street 221b"),
      ("promocode", "SALE"),
      ("user", user_id.as_str()),
      ("products", product_id.as_str()),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/shop/orders/");

  let req = test::TestRequest::get().uri("/shop/orders/").cookie(cookie).to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  let orders = body["orders"].as_array().unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0]["delivery_address"], "Baker street 221b");
  assert_eq!(orders[0]["user"]["username"], "buyer");
  assert_eq!(orders[0]["products"][0]["name"], "Mug");
}

#[actix_web::test]
async fn order_form_rejects_unknown_products() {
  let state = test_state();
  let (user, _) = logged_in(&state, "buyer", false).await;
  let app = init_app!(state);

  let user_id = user.id.to_string();
  let req = test::TestRequest::post()
    .uri("/shop/orders/create/")
    .set_form(vec![
      ("delivery_address", "Nowhere"),
      ("user", user_id.as_str()),
      ("products", "4242"),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["errors"]["products"].is_array());
}

#[actix_web::test]
async fn shop_index_and_groups() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/shop/").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["products"].as_array().unwrap().len(), 3);

  let req = test::TestRequest::post()
    .uri("/shop/groups/")
    .set_form(vec![("name", "editors")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/shop/groups/");

  let req = test::TestRequest::get().uri("/shop/groups/").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["groups"][0]["name"], "editors");
}

#[actix_web::test]
async fn order_update_stores_a_receipt() {
  let state = test_state();
  let (user, _) = logged_in(&state, "buyer", false).await;
  let product = state
    .store
    .create_product(NewProduct::named("Mug", Decimal::new(800, 2)))
    .await
    .unwrap();
  let order = state
    .store
    .create_order(storefront_app::models::NewOrder {
      delivery_address: "Old address".to_string(),
      user_id: user.id,
      product_ids: vec![product.id],
      ..Default::default()
    })
    .await
    .unwrap();
  let app = init_app!(state);

  let user_id = user.id.to_string();
  let product_id = product.id.to_string();
  let (content_type, body) = multipart_body(
    &[
      ("delivery_address", "New address"),
      ("user", user_id.as_str()),
      ("products", product_id.as_str()),
    ],
    &[("receipt", "receipt.pdf", b"%PDF-1.4".as_slice())],
  );
  let req = test::TestRequest::post()
    .uri(&format!("/shop/orders/update/{}/", order.id))
    .insert_header((header::CONTENT_TYPE, content_type))
    .set_payload(body)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), format!("/shop/orders/{}/", order.id));

  let stored = state.store.get_order(order.id).await.unwrap().unwrap();
  assert_eq!(stored.order.delivery_address, "New address");
  let receipt = stored.order.receipt.expect("receipt stored");
  assert!(receipt.starts_with("orders/receipts/"));
  assert!(state.media.path_of(&receipt).exists());
}
