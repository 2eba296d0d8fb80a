//! Folding decoded NDJSON lines into a result.
//!
//! Recognized line shapes:
//! - `{"token": "..."}` or `{"type": "token", "content": "..."}` - a fragment
//! - `{"done": true, "content"?: "...", "message"?: "..."}` - end of stream;
//!   `completion` is accepted in place of `content`
//!
//! Anything else, including lines that are not JSON at all, is kept verbatim
//! as [`StreamEvent::Opaque`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// One classified stream line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Fragment to append to the running text.
    Token { content: String },
    /// End of stream, optionally with the authoritative final content.
    Terminal {
        content: Option<String>,
        message: Option<String>,
    },
    /// Line that did not match any known shape.
    Opaque { raw: String },
}

impl StreamEvent {
    /// Classify a single decoded line.
    pub fn classify(line: &str) -> Self {
        let object = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Self::opaque(line),
            Err(e) => {
                debug!(error = %e, "Stream line is not JSON, keeping raw");
                return Self::opaque(line);
            }
        };

        if object.get("done").and_then(Value::as_bool) == Some(true) {
            return Self::Terminal {
                content: final_content(&object),
                message: string_field(&object, "message").map(str::to_string),
            };
        }

        if let Some(token) = string_field(&object, "token") {
            return Self::Token {
                content: token.to_string(),
            };
        }

        if string_field(&object, "type") == Some("token")
            && let Some(content) = string_field(&object, "content")
        {
            return Self::Token {
                content: content.to_string(),
            };
        }

        Self::opaque(line)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal { .. })
    }

    fn opaque(line: &str) -> Self {
        Self::Opaque {
            raw: line.to_string(),
        }
    }
}

/// Running fold over a stream's lines.
#[derive(Debug, Default, Clone)]
pub struct ResultReducer {
    text: String,
    last_line: Option<String>,
    last_was_token: bool,
    terminal: Option<StreamEvent>,
    authoritative: bool,
}

impl ResultReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `line` and fold it into the running result.
    pub fn apply(&mut self, line: &str) -> StreamEvent {
        let event = StreamEvent::classify(line);
        match &event {
            StreamEvent::Token { content } => {
                if !self.authoritative {
                    self.text.push_str(content);
                }
            }
            StreamEvent::Terminal { content, .. } => {
                if let Some(content) = content {
                    self.text.clone_from(content);
                    self.authoritative = true;
                }
                self.terminal = Some(event.clone());
            }
            StreamEvent::Opaque { .. } => {}
        }
        self.last_line = Some(line.to_string());
        self.last_was_token = matches!(event, StreamEvent::Token { .. });
        event
    }

    /// Text accumulated so far, for progressive display.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether a terminal event has been observed.
    pub fn is_complete(&self) -> bool {
        self.terminal.is_some()
    }

    /// The last terminal event observed, if any.
    pub fn terminal(&self) -> Option<&StreamEvent> {
        self.terminal.as_ref()
    }

    /// Final result text once the stream has ended.
    ///
    /// Without a terminal event, the last line is consulted for a final
    /// content field, then the running text is used, then the raw last line.
    /// A last line that was itself a token fragment is never read as final
    /// content.
    pub fn finish(self) -> String {
        if self.terminal.is_some() {
            return self.text;
        }

        let Some(last) = self.last_line else {
            return self.text;
        };

        if !self.last_was_token
            && let Ok(Value::Object(object)) = serde_json::from_str::<Value>(&last)
            && let Some(content) = final_content(&object)
        {
            return content;
        }

        if !self.text.is_empty() {
            return self.text;
        }
        last
    }
}

/// Fold a complete line sequence.
pub fn reduce_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut reducer = ResultReducer::new();
    for line in lines {
        reducer.apply(line.as_ref());
    }
    reducer.finish()
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn final_content(object: &Map<String, Value>) -> Option<String> {
    ["content", "completion"]
        .into_iter()
        .filter_map(|key| string_field(object, key))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
