//! Counter request protocol
//!
//! Method classification plus the JSON envelope and the request/response
//! shapes exchanged with the invoker.

pub mod envelope;
pub mod method;

pub use envelope::{Envelope, Request, Response, respond};
pub use method::Method;
