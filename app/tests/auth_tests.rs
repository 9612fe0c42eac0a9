// tests/auth_tests.rs

#[macro_use]
mod common;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::test;
use serde_json::Value;

use common::{create_user, test_state, TEST_PASSWORD};

fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
  resp
    .response()
    .cookies()
    .find(|c| c.name() == name)
    .map(|c| c.into_owned())
}

fn location<B>(resp: &ServiceResponse<B>) -> &str {
  resp.headers().get(header::LOCATION).unwrap().to_str().unwrap()
}

#[actix_web::test]
async fn login_failure_is_forbidden() {
  let state = test_state();
  create_user(&state, "alice", false).await;
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/login/")
    .set_form(vec![("username", "alice"), ("password", "wrong-password")])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Invalid username or password");
}

#[actix_web::test]
async fn login_about_me_logout_round_trip() {
  let state = test_state();
  create_user(&state, "alice", false).await;
  let cookie_name = state.config.session_cookie_name.clone();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/login/")
    .set_form(vec![("username", "alice"), ("password", TEST_PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/admin/");
  let session = response_cookie(&resp, &cookie_name).expect("session cookie");

  let req = test::TestRequest::get()
    .uri("/myauth/about-me/")
    .cookie(session.clone())
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["user"]["username"], "alice");
  assert!(body["user"].get("password_hash").is_none());
  assert!(body["profile"].is_object());

  let req = test::TestRequest::get()
    .uri("/myauth/login/")
    .cookie(session.clone())
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);

  let req = test::TestRequest::get()
    .uri("/myauth/logout/")
    .cookie(session.clone())
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/myauth/login/");

  let req = test::TestRequest::get()
    .uri("/myauth/about-me/")
    .cookie(session)
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert!(body["user"].is_null());
}

#[actix_web::test]
async fn login_honours_local_next_only() {
  let state = test_state();
  create_user(&state, "alice", false).await;
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/login/?next=/shop/orders/")
    .set_form(vec![("username", "alice"), ("password", TEST_PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(location(&resp), "/shop/orders/");

  let req = test::TestRequest::post()
    .uri("/myauth/login/?next=//evil.example/")
    .set_form(vec![("username", "alice"), ("password", TEST_PASSWORD)])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(location(&resp), "/admin/");
}

#[actix_web::test]
async fn register_creates_profile_and_logs_in() {
  let state = test_state();
  let cookie_name = state.config.session_cookie_name.clone();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/register/")
    .set_form(vec![
      ("username", "bob"),
      ("email", "bob@example.com"),
      ("password1", "Str0ng-passw0rd"),
      ("password2", "Str0ng-passw0rd"),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FOUND);
  assert_eq!(location(&resp), "/myauth/about-me/");
  let session = response_cookie(&resp, &cookie_name).expect("session cookie");

  let user = state.store.user_by_username("bob").await.unwrap().expect("user stored");
  assert!(state.store.profile(user.id).await.unwrap().is_some());
  assert_eq!(state.sessions.user(session.value()).map(|u| u.id), Some(user.id));
}

#[actix_web::test]
async fn register_rejects_mismatched_passwords() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/register/")
    .set_form(vec![
      ("username", "bob"),
      ("email", "bob@example.com"),
      ("password1", "Str0ng-passw0rd"),
      ("password2", "different-passw0rd"),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(state.store.user_by_username("bob").await.unwrap().is_none());
}

#[actix_web::test]
async fn register_requires_an_email() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::post()
    .uri("/myauth/register/")
    .set_form(vec![
      ("username", "bob"),
      ("email", "  "),
      ("password1", "Str0ng-passw0rd"),
      ("password2", "Str0ng-passw0rd"),
    ])
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(state.store.user_by_username("bob").await.unwrap().is_none());
}

#[actix_web::test]
async fn cookie_demo_round_trip() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/myauth/cookie/get/").to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, "Cookie value: 'default_value'");

  let req = test::TestRequest::get().uri("/myauth/cookie/set/").to_request();
  let resp = test::call_service(&app, req).await;
  let fizz = response_cookie(&resp, "fizz").expect("fizz cookie");
  assert_eq!(fizz.value(), "buzz");
  assert_eq!(fizz.max_age().map(|d| d.whole_seconds()), Some(86400));
  assert_eq!(test::read_body(resp).await, "Cookie set:");

  let req = test::TestRequest::get()
    .uri("/myauth/cookie/get/")
    .cookie(fizz)
    .to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, "Cookie value: 'buzz'");
}

#[actix_web::test]
async fn session_demo_round_trip() {
  let state = test_state();
  let cookie_name = state.config.session_cookie_name.clone();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/myauth/session/get/").to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, "Session value: 'default_value'");

  let req = test::TestRequest::get().uri("/myauth/session/set/").to_request();
  let resp = test::call_service(&app, req).await;
  let session = response_cookie(&resp, &cookie_name).expect("session cookie");

  let req = test::TestRequest::get()
    .uri("/myauth/session/get/")
    .cookie(session)
    .to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, "Session value: 'spameggs'");
}

#[actix_web::test]
async fn hello_and_foo_bar() {
  let state = test_state();
  let app = init_app!(state);

  let req = test::TestRequest::get().uri("/myauth/hello/").to_request();
  let body = test::call_and_read_body(&app, req).await;
  assert_eq!(body, "<h1>Hello World!</h1>");

  let req = test::TestRequest::get().uri("/myauth/foo-bar/").to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body, serde_json::json!({ "foo": "bar", "spam": "eggs" }));
}
