// storefront/app/src/web/middleware.rs

//! Request-scoped middleware written with `actix_web::middleware::from_fn`.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpMessage};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::state::AppState;

/// The caller's `User-Agent`, stored in request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent(pub Option<String>);

#[derive(Debug, Default)]
pub struct RequestCounters {
  requests: AtomicU64,
  responses: AtomicU64,
  exceptions: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
  pub requests: u64,
  pub responses: u64,
  pub exceptions: u64,
}

impl RequestCounters {
  pub fn snapshot(&self) -> CounterSnapshot {
    CounterSnapshot {
      requests: self.requests.load(Ordering::Relaxed),
      responses: self.responses.load(Ordering::Relaxed),
      exceptions: self.exceptions.load(Ordering::Relaxed),
    }
  }
}

pub async fn capture_user_agent(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
  let agent = req
    .headers()
    .get(header::USER_AGENT)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  req.extensions_mut().insert(UserAgent(agent));
  next.call(req).await
}

/// Counts every request, every response and every request that ended in
/// an error, whether the error became a response or not.
pub async fn count_requests(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
  let counters = req.app_data::<web::Data<AppState>>().map(|state| state.counters.clone());
  if let Some(counters) = &counters {
    let seen = counters.requests.fetch_add(1, Ordering::Relaxed) + 1;
    debug!(requests = seen, "Request counted.");
  }
  let result = next.call(req).await;
  if let Some(counters) = counters {
    match &result {
      Ok(res) => {
        counters.responses.fetch_add(1, Ordering::Relaxed);
        if res.response().error().is_some() {
          counters.exceptions.fetch_add(1, Ordering::Relaxed);
        }
      }
      Err(_) => {
        counters.exceptions.fetch_add(1, Ordering::Relaxed);
      }
    }
  }
  result
}
