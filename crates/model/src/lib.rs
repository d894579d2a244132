//! Shared vocabulary for the assistant side of planbook.
//!
//! This crate defines the domain types (conversations, messages, tool
//! invocations) and the collaborator protocols the conversational core
//! consumes: a transport that opens a streamed exchange, a conversation
//! service for the ordinary REST operations, and a speech provider for
//! voice capture.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod conversation;
mod error;
mod service;
mod speech;
mod stream;

pub use conversation::*;
pub use error::*;
pub use service::*;
pub use speech::*;
pub use stream::*;
