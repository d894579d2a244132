use planbook_model::MessageId;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::proto;
use super::sse::SseEvent;

/// Semantic callbacks for the events of a streamed exchange.
pub trait StreamHandler {
    /// An incremental fragment of the assistant's text.
    fn on_token(&mut self, content: String);

    /// The assistant started a tool call.
    fn on_tool_call(&mut self, name: String, args: Map<String, Value>);

    /// A tool call finished.
    fn on_tool_result(&mut self, name: String, result: String);

    /// The exchange completed successfully.
    fn on_done(
        &mut self,
        message_id: Option<MessageId>,
        conversation_name: Option<String>,
    );

    /// The server gave up on the exchange.
    fn on_error(&mut self, detail: String);
}

/// Decodes the payload of `event` and invokes the matching callback.
///
/// Malformed payloads and unknown event names are logged and dropped, they
/// never abort the exchange.
pub fn dispatch<H: StreamHandler + ?Sized>(event: &SseEvent, handler: &mut H) {
    match event.name.as_str() {
        "token" => {
            if let Some(token) = decode::<proto::Token>(event) {
                handler.on_token(token.content);
            }
        }
        "tool_call" => {
            if let Some(call) = decode::<proto::ToolCall>(event) {
                handler.on_tool_call(call.name, call.args);
            }
        }
        "tool_result" => {
            if let Some(result) = decode::<proto::ToolResult>(event) {
                handler.on_tool_result(result.name, result.result);
            }
        }
        "done" => {
            if let Some(done) = decode::<proto::Done>(event) {
                handler.on_done(done.message_id, done.conversation_name);
            }
        }
        "error" => {
            if let Some(error) = decode::<proto::Error>(event) {
                handler.on_error(error.detail);
            }
        }
        other => debug!("ignored unknown event: {other}"),
    }
}

#[inline]
fn decode<T: DeserializeOwned>(event: &SseEvent) -> Option<T> {
    match serde_json::from_str(&event.data) {
        Ok(payload) => Some(payload),
        Err(err) => {
            warn!("dropped malformed `{}` event: {err}", event.name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl StreamHandler for Recorder {
        fn on_token(&mut self, content: String) {
            self.0.push(format!("token:{content}"));
        }

        fn on_tool_call(&mut self, name: String, args: Map<String, Value>) {
            self.0.push(format!("call:{name}:{}", Value::Object(args)));
        }

        fn on_tool_result(&mut self, name: String, result: String) {
            self.0.push(format!("result:{name}:{result}"));
        }

        fn on_done(
            &mut self,
            message_id: Option<MessageId>,
            conversation_name: Option<String>,
        ) {
            self.0.push(format!("done:{message_id:?}:{conversation_name:?}"));
        }

        fn on_error(&mut self, detail: String) {
            self.0.push(format!("error:{detail}"));
        }
    }

    fn run(events: &[(&str, &str)]) -> Vec<String> {
        let mut recorder = Recorder::default();
        for (name, data) in events {
            let event = SseEvent {
                name: (*name).to_owned(),
                data: (*data).to_owned(),
            };
            dispatch(&event, &mut recorder);
        }
        recorder.0
    }

    #[test]
    fn test_known_events() {
        let calls = run(&[
            ("token", r#"{"content":"Hi"}"#),
            ("tool_call", r#"{"name":"search","args":{"q":"milk"}}"#),
            ("tool_result", r#"{"name":"search","result":"3 hits"}"#),
            ("done", r#"{"message_id":12,"conversation_name":"Errands"}"#),
            ("error", r#"{"detail":"quota exceeded"}"#),
        ]);
        assert_eq!(
            calls,
            vec![
                "token:Hi",
                r#"call:search:{"q":"milk"}"#,
                "result:search:3 hits",
                r#"done:Some(12):Some("Errands")"#,
                "error:quota exceeded",
            ]
        );
    }

    #[test]
    fn test_malformed_and_unknown() {
        let calls = run(&[
            ("token", "{\"content\":"),
            ("token", "{\"text\":\"wrong field\"}"),
            ("heartbeat", "{}"),
            ("tool_call", "[1, 2]"),
            ("token", "{\"content\":\"still alive\"}"),
        ]);
        assert_eq!(calls, vec!["token:still alive"]);
    }
}
