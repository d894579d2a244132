//! Decoding of a streamed exchange body into typed callbacks.

mod dispatch;
mod proto;
mod sse;
mod utf8;

pub use dispatch::{StreamHandler, dispatch};
pub use sse::Sse;
