use serde::{Deserialize, Serialize};
use tracing::error;

/// Count reported when an operation failed
pub const FAILURE_LIKE_COUNT: i64 = -1;

/// Body text of the internal error response
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Uniform JSON payload returned for every counter operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
  pub status: bool,
  /// Reserved, always 0
  pub code: i32,
  pub like_count: i64,
}

impl Envelope {
  pub fn success(like_count: i64) -> Self {
    Self {
      status: true,
      code: 0,
      like_count,
    }
  }

  pub fn failure() -> Self {
    Self {
      status: false,
      code: 0,
      like_count: FAILURE_LIKE_COUNT,
    }
  }
}

/// Inbound request as handed over by the invoker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: String,
}

impl Request {
  pub fn new(method: impl Into<String>) -> Self {
    Self {
      method: method.into(),
    }
  }
}

/// HTTP-shaped response handed back to the invoker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status_code: u16,
  pub content_type: &'static str,
  pub body: String,
}

impl Response {
  pub fn json(body: String) -> Self {
    Self {
      status_code: 200,
      content_type: "application/json",
      body,
    }
  }

  pub fn internal_error() -> Self {
    Self {
      status_code: 500,
      content_type: "text/plain; charset=utf-8",
      body: INTERNAL_ERROR_BODY.to_string(),
    }
  }
}

/// Serialize `payload` into a 200 JSON response.
///
/// Serialization failure is the only outcome reported through the transport
/// status: it yields a plain-text 500.
pub fn respond<T: Serialize>(payload: &T) -> Response {
  match serde_json::to_string(payload) {
    Ok(body) => Response::json(body),
    Err(e) => {
      error!("Failed to serialize response: {}", e);
      Response::internal_error()
    }
  }
}
