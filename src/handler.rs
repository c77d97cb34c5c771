use tracing::{error, info, warn};

use crate::counter::{CounterError, LikeCounter};
use crate::protocol::{Envelope, Method, Request, Response, respond};

/// Classifies requests, runs the matching counter operation and wraps the
/// outcome in an envelope.
///
/// Store failures never escape as transport errors: they become a failure
/// envelope delivered with status 200.
pub struct LikeHandler {
  counter: LikeCounter,
}

impl LikeHandler {
  pub fn new(counter: LikeCounter) -> Self {
    Self { counter }
  }

  pub async fn handle(&self, request: &Request) -> Response {
    let method = Method::parse(&request.method);
    info!("HTTP method: {}", method);

    let envelope = match method {
      Method::Get => self.envelope_for(self.counter.read().await),
      Method::Put => self.envelope_for(self.counter.increment_and_get().await),
      Method::Unsupported(method) => {
        warn!("Rejecting unsupported method '{}'", method);
        Envelope::failure()
      }
    };

    respond(&envelope)
  }

  fn envelope_for(&self, result: Result<i64, CounterError>) -> Envelope {
    match result {
      Ok(like_count) => Envelope::success(like_count),
      Err(CounterError::NotFound(key)) => {
        error!("Counter record {} is missing, has it been provisioned?", key);
        Envelope::failure()
      }
      Err(e) => {
        error!("Counter operation on {} failed: {}", self.counter.key(), e);
        Envelope::failure()
      }
    }
  }
}
