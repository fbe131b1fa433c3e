use std::collections::HashMap;

use serde::Deserialize;

pub const USER_MENTION: &str = "USER_MENTION";

/// One inbound webhook event. Not retained beyond the handling of one
/// request; a missing `type` is preserved as `None` so the router can
/// distinguish "unknown type" (fail-open to the menu) from "no type at all".
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub user: Option<User>,
    pub message: Option<Message>,
    pub action: Option<FormAction>,
    pub common: Option<CommonEventObject>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum EventType {
    #[serde(rename = "ADDED_TO_SPACE")]
    AddedToSpace,
    #[serde(rename = "MESSAGE")]
    Message,
    #[serde(rename = "CARD_CLICKED")]
    CardClicked,
    #[serde(rename = "SUBMIT_DIALOG")]
    SubmitDialog,
    #[serde(rename = "APP_HOME")]
    AppHome,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct User {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: String,
    pub sender: Option<User>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A platform-supplied offset range marking an embedded user reference.
/// Indices are character offsets into the raw message text.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Annotation {
    #[serde(rename = "type")]
    pub annotation_type: Option<String>,
    #[serde(rename = "startIndex", default)]
    pub start_index: usize,
    #[serde(rename = "endIndex", default)]
    pub end_index: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormAction {
    #[serde(rename = "actionMethodName")]
    pub action_method_name: Option<String>,
    pub function: Option<String>,
}

impl FormAction {
    /// Chat API events carry `actionMethodName`; add-on events carry
    /// `function`. Either names the clicked action.
    pub fn name(&self) -> Option<&str> {
        self.action_method_name.as_deref().or(self.function.as_deref())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CommonEventObject {
    #[serde(rename = "formInputs", default)]
    pub form_inputs: HashMap<String, FormInput>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormInput {
    #[serde(rename = "stringInputs")]
    pub string_inputs: Option<StringInputs>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StringInputs {
    #[serde(default)]
    pub value: Vec<String>,
}

impl CommonEventObject {
    pub fn string_value(&self, field: &str) -> Option<&str> {
        self.form_inputs
            .get(field)
            .and_then(|input| input.string_inputs.as_ref())
            .and_then(|inputs| inputs.value.iter().find(|value| !value.trim().is_empty()))
            .map(String::as_str)
    }
}

/// Removes user-mention annotation spans from the raw text.
///
/// Each span is resolved to its substring and every occurrence of each
/// distinct substring is removed, so overlapping or repeated annotations for
/// the same mention cannot double-strip. Span indices out of range are
/// clamped rather than rejected.
pub fn strip_mentions(raw: &str, annotations: &[Annotation]) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut spans: Vec<String> = Vec::new();

    for annotation in annotations {
        if annotation.annotation_type.as_deref() != Some(USER_MENTION) {
            continue;
        }
        let start = annotation.start_index.min(chars.len());
        let end = annotation.end_index.clamp(start, chars.len());
        if start == end {
            continue;
        }
        let span: String = chars[start..end].iter().collect();
        if !spans.contains(&span) {
            spans.push(span);
        }
    }

    let mut cleaned = raw.to_owned();
    for span in &spans {
        cleaned = cleaned.replace(span.as_str(), "");
    }
    cleaned.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::{strip_mentions, Annotation, ChatEvent, EventType, USER_MENTION};

    fn mention(start_index: usize, end_index: usize) -> Annotation {
        Annotation {
            annotation_type: Some(USER_MENTION.to_owned()),
            start_index,
            end_index,
        }
    }

    #[test]
    fn strips_a_leading_mention_and_trims() {
        let cleaned = strip_mentions("@deskbot help", &[mention(0, 8)]);
        assert_eq!(cleaned, "help");
    }

    #[test]
    fn stripping_is_idempotent_per_distinct_span() {
        let annotations = [mention(0, 8), mention(0, 8)];
        let once = strip_mentions("@deskbot help", &annotations[..1]);
        let twice = strip_mentions("@deskbot help", &annotations);
        assert_eq!(once, twice);
        assert_eq!(twice, "help");
    }

    #[test]
    fn ignores_non_mention_annotations() {
        let annotation = Annotation {
            annotation_type: Some("SLASH_COMMAND".to_owned()),
            start_index: 0,
            end_index: 8,
        };
        assert_eq!(strip_mentions("@deskbot help", &[annotation]), "@deskbot help");
    }

    #[test]
    fn clamps_out_of_range_spans() {
        assert_eq!(strip_mentions("hi", &[mention(1, 99)]), "h");
        assert_eq!(strip_mentions("hi", &[mention(99, 120)]), "hi");
    }

    #[test]
    fn spans_index_by_characters_not_bytes() {
        // "café " is 5 chars; the mention starts at char 5.
        let cleaned = strip_mentions("café @deskbot 42", &[mention(5, 13)]);
        assert_eq!(cleaned, "café  42".trim());
    }

    #[test]
    fn message_event_deserializes_from_wire_json() {
        let event: ChatEvent = serde_json::from_str(
            r#"{
                "type": "MESSAGE",
                "message": {
                    "text": "@deskbot help",
                    "sender": {"email": "a@x.com", "displayName": "Ada"},
                    "annotations": [
                        {"type": "USER_MENTION", "startIndex": 0, "endIndex": 8}
                    ]
                }
            }"#,
        )
        .expect("event should parse");

        assert_eq!(event.event_type, Some(EventType::Message));
        let message = event.message.expect("message present");
        assert_eq!(message.annotations.len(), 1);
        assert_eq!(strip_mentions(&message.text, &message.annotations), "help");
    }

    #[test]
    fn unknown_event_types_parse_without_failing() {
        let event: ChatEvent =
            serde_json::from_str(r#"{"type": "WIDGET_UPDATED"}"#).expect("event should parse");
        assert_eq!(event.event_type, Some(EventType::Unknown));
    }

    #[test]
    fn missing_type_is_preserved_as_none() {
        let event: ChatEvent = serde_json::from_str(r#"{}"#).expect("event should parse");
        assert_eq!(event.event_type, None);
    }

    #[test]
    fn dialog_form_inputs_resolve_first_non_empty_value() {
        let event: ChatEvent = serde_json::from_str(
            r#"{
                "type": "SUBMIT_DIALOG",
                "user": {"email": "a@x.com", "displayName": "Ada"},
                "common": {
                    "formInputs": {
                        "subject": {"stringInputs": {"value": ["", "Portal is down"]}}
                    }
                }
            }"#,
        )
        .expect("event should parse");

        let common = event.common.expect("common present");
        assert_eq!(common.string_value("subject"), Some("Portal is down"));
        assert_eq!(common.string_value("description"), None);
    }
}
