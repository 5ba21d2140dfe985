use serde::{ Serialize, Deserialize };

/// Payloads of the events sent by `POST /api/chat/stream`.
///
/// The SSE event name carries the variant (`delta`, `done`, `error`); the
/// data line carries the JSON of the variant's fields.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum StreamEvent {
    Delta {
        text: String,
    },
    Error {
        error: String,
    },
    /// Always `{"done": true}`; build it with [`StreamEvent::done`].
    Done {
        done: bool,
    },
}

impl StreamEvent {
    pub fn done() -> Self {
        StreamEvent::Done { done: true }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Delta { .. } => "delta",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done { .. } => "done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn done_event_payload() {
        let done = StreamEvent::done();
        assert_eq!(done.name(), "done");
        assert_eq!(serde_json::to_value(&done).unwrap(), json!({"done": true}));
    }

    #[test]
    fn event_names_match_payloads() {
        let delta = StreamEvent::Delta { text: "Stage".into() };
        assert_eq!(delta.name(), "delta");
        assert_eq!(serde_json::to_value(&delta).unwrap(), json!({"text": "Stage"}));
        assert_eq!(StreamEvent::Error { error: "x".into() }.name(), "error");
    }
}
