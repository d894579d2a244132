//! A terminal client for the planbook assistant.
//!
//! The crate wires the HTTP clients into a [`planbook_core::ChatSession`].
//! It ships a CLI, and can also be used as a library by other front ends.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod session;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`planbook_core`] crate.
pub mod core {
    pub use planbook_core::*;
}

/// Re-exports of [`planbook_http`] crate.
pub mod http {
    pub use planbook_http::*;
}

/// Re-exports of [`planbook_model`] crate.
pub mod model {
    pub use planbook_model::*;
}
