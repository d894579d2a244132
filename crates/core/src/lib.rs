//! The conversational core of planbook.
//!
//! A [`ChatSession`] streams the assistant's replies into a
//! [`ConversationStore`], decoding the server-sent events of each exchange
//! as the chunks arrive. A [`VoiceCapture`] runs continuous speech
//! recognition into the same [`InputBuffer`] the user types into.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod input;
mod session;
mod store;
mod stream;
mod voice;

pub use input::{InputBuffer, ReadOnlyInput};
pub use session::{
    ChatSession, ChatSessionBuilder, Error, ErrorKind, UpdateFn,
};
pub use store::ConversationStore;
pub use voice::{
    VoiceCapture, VoiceConfig, VoiceSignal, VoiceSignals, VoiceState,
};
