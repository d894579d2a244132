use chrono::Utc;
use planbook_model::{ConversationId, Message, MessageId, ToolInvocation};
use serde_json::{Map, Value};

use super::UpdateFn;
use crate::store::ConversationStore;
use crate::stream::StreamHandler;

pub(crate) const TRUNCATED_DETAIL: &str = "The response ended unexpectedly.";
pub(crate) const CANCELLED_DETAIL: &str = "The request was cancelled.";

/// The state of one streamed exchange.
///
/// The exchange owns the placeholder message for its whole lifetime and
/// finishes it exactly once. Events arriving after that are ignored.
pub(crate) struct Exchange<'a> {
    store: &'a mut ConversationStore,
    on_update: Option<&'a UpdateFn>,
    conversation_id: ConversationId,
    placeholder: usize,
    finished: bool,
}

impl<'a> Exchange<'a> {
    pub fn new(
        store: &'a mut ConversationStore,
        on_update: Option<&'a UpdateFn>,
        conversation_id: ConversationId,
        placeholder: usize,
    ) -> Self {
        Self {
            store,
            on_update,
            conversation_id,
            placeholder,
            finished: false,
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Finishes the exchange with an error, keeping any partial text.
    pub fn fail(&mut self, detail: &str) {
        self.update(|message| {
            message.content = format_error(&message.content, detail);
            true
        });
    }

    /// Applies `f` to the placeholder. `f` returns whether the exchange is
    /// finished by the change.
    fn update(&mut self, f: impl FnOnce(&mut Message) -> bool) {
        if self.finished {
            trace!("exchange already finished, event ignored");
            return;
        }
        let Some(message) = self.store.message_mut(self.placeholder) else {
            error!("placeholder message has gone");
            self.finished = true;
            return;
        };
        if f(&mut *message) {
            message.streaming = false;
            self.finished = true;
        }
        self.notify();
    }

    #[inline]
    fn notify(&self) {
        if let Some(on_update) = self.on_update {
            on_update(&*self.store);
        }
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        // The `send` future was dropped before a terminal event.
        if !self.finished {
            debug!("exchange dropped while streaming");
            self.fail(CANCELLED_DETAIL);
        }
    }
}

impl StreamHandler for Exchange<'_> {
    fn on_token(&mut self, content: String) {
        self.update(|message| {
            message.content.push_str(&content);
            false
        });
    }

    fn on_tool_call(&mut self, name: String, args: Map<String, Value>) {
        self.update(|message| {
            message.tool_calls.push(ToolInvocation::pending(name, args));
            false
        });
    }

    fn on_tool_result(&mut self, name: String, result: String) {
        self.update(|message| {
            // The wire carries no call id, so the earliest pending call
            // with the same name takes the result.
            match message
                .tool_calls
                .iter_mut()
                .find(|call| call.is_pending() && call.name == name)
            {
                Some(call) => call.result = Some(result),
                None => warn!("no pending call for tool result: {name}"),
            }
            false
        });
    }

    fn on_done(
        &mut self,
        message_id: Option<MessageId>,
        conversation_name: Option<String>,
    ) {
        if self.finished {
            return;
        }
        if let Some(name) = conversation_name.filter(|n| !n.is_empty()) {
            self.store
                .rename_conversation(self.conversation_id, name, Utc::now());
        }
        self.update(|message| {
            if message_id.is_some() {
                message.id = message_id;
            }
            true
        });
    }

    fn on_error(&mut self, detail: String) {
        warn!("exchange failed: {detail}");
        self.fail(&detail);
    }
}

pub(crate) fn format_error(partial: &str, detail: &str) -> String {
    if partial.is_empty() {
        format!("Error: {detail}")
    } else {
        format!("{partial}\n\n[Error: {detail}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        assert_eq!(format_error("", "boom"), "Error: boom");
        assert_eq!(
            format_error("Half an ans", "boom"),
            "Half an ans\n\n[Error: boom]"
        );
    }
}
