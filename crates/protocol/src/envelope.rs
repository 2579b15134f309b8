//! Role-addressed JSON envelopes.
//!
//! Every participant publishes to one shared topic and filters by the
//! `to` field, so the envelope carries routing (`to`, `from`) next to a
//! `type`-tagged payload. Consumers decode with [`decode_for`] and never
//! see traffic meant for another role.

use pipewrench_common::error::{PipewrenchError, PipewrenchResult};
use serde::{Deserialize, Serialize};

/// Topic every envelope is published on.
pub const SHARED_TOPIC: &str = "sauron";

/// A participant on the shared topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The desktop UI.
    Ui,
    /// The AI agent.
    Agent,
    /// The capture tool itself.
    Eye,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ui => "ui",
            Role::Agent => "agent",
            Role::Eye => "eye",
        }
    }
}

/// One message on the shared topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub to: Role,
    pub from: Role,
    #[serde(flatten)]
    pub payload: Payload,
}

impl Envelope {
    pub fn new(to: Role, from: Role, payload: Payload) -> Self {
        Self { to, from, payload }
    }

    /// Whether this envelope is meant for the given role.
    pub fn is_addressed_to(&self, role: Role) -> bool {
        self.to == role
    }

    /// Serialize to the JSON wire form.
    pub fn encode(&self) -> PipewrenchResult<String> {
        serde_json::to_string(self)
            .map_err(|e| PipewrenchError::protocol(format!("Failed to encode envelope: {e}")))
    }

    /// Parse an envelope from its JSON wire form.
    pub fn decode(raw: &str) -> PipewrenchResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| PipewrenchError::protocol(format!("Malformed envelope: {e}")))
    }
}

/// Decode an envelope and keep it only if it is addressed to `role`.
///
/// `Ok(None)` means valid traffic for somebody else; a malformed payload
/// is an error the caller should log and drop, not act on.
pub fn decode_for(raw: &str, role: Role) -> PipewrenchResult<Option<Envelope>> {
    let envelope = Envelope::decode(raw)?;
    if !envelope.is_addressed_to(role) {
        return Ok(None);
    }
    Ok(Some(envelope))
}

/// Typed payloads, discriminated by the `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    /// Chat text from the UI toward the agent.
    Text {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<i64>,
        /// Base64 image attached to the message, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_data: Option<String>,
    },
    /// Ask the agent to open a new conversation.
    StartConversation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Agent's acknowledgement of a new conversation.
    ConversationCreated { conversation_id: i64, title: String },
    /// Ask the agent for the stored conversations.
    ListConversations,
    ConversationList {
        conversations: Vec<ConversationSummary>,
    },
    /// Ask the agent to replay one conversation.
    LoadConversation { conversation_id: i64 },
    ConversationHistory {
        conversation_id: i64,
        title: String,
        messages: Vec<StoredMessage>,
    },
    /// Agent's reply to the active conversation.
    AssistantMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<i64>,
    },
    Error { message: String },
    Ping,
    Pong,
    /// Tell the agent its settings file changed on disk.
    ReloadSettings,
}

/// One row of a `conversation_list` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    /// Preview of the newest message, when the conversation has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<String>,
}

/// One row of a `conversation_history` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    /// "user", "assistant", or "system".
    pub role: String,
    pub content: String,
    pub timestamp: String,
    /// Path of an attached capture; empty when the message had none.
    #[serde(default)]
    pub image_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn envelopes_round_trip_through_json() {
        let envelope = Envelope::new(
            Role::Agent,
            Role::Ui,
            Payload::Text {
                data: "what is on my screen?".to_string(),
                conversation_id: Some(7),
                image_data: None,
            },
        );

        let raw = envelope.encode().unwrap();
        assert!(raw.contains("\"type\":\"text\""));
        assert!(raw.contains("\"to\":\"agent\""));
        assert!(raw.contains("\"from\":\"ui\""));
        assert!(!raw.contains("image_data"));

        let decoded = Envelope::decode(&raw).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn unit_payloads_carry_only_the_type_tag() {
        let raw = Envelope::new(Role::Agent, Role::Ui, Payload::Ping)
            .encode()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["type"], "ping");
        assert_eq!(value.as_object().unwrap().len(), 3);

        let decoded = Envelope::decode(r#"{"to":"ui","from":"agent","type":"pong"}"#).unwrap();
        assert_eq!(decoded.payload, Payload::Pong);
    }

    #[test]
    fn filtering_keeps_only_own_role() {
        let raw = r#"{"to":"agent","from":"ui","type":"list_conversations"}"#;
        assert!(decode_for(raw, Role::Agent).unwrap().is_some());
        assert!(decode_for(raw, Role::Ui).unwrap().is_none());
        assert!(decode_for(raw, Role::Eye).unwrap().is_none());
    }

    #[test]
    fn malformed_payloads_are_errors_not_panics() {
        assert!(decode_for("not json at all", Role::Ui).is_err());
        assert!(decode_for(r#"{"to":"ui","from":"agent"}"#, Role::Ui).is_err());
        assert!(decode_for(r#"{"to":"ui","from":"agent","type":"no_such"}"#, Role::Ui).is_err());
        // Unknown role.
        assert!(decode_for(r#"{"to":"router","from":"ui","type":"ping"}"#, Role::Ui).is_err());
    }

    #[test]
    fn conversation_rows_parse_agent_output() {
        let raw = r#"{
            "to": "ui",
            "from": "agent",
            "type": "conversation_list",
            "conversations": [
                {
                    "id": 1,
                    "title": "New Conversation",
                    "created_at": "2025-06-14 15:42:33",
                    "updated_at": "2025-06-14 15:50:01",
                    "last_message": "Here is what I can see",
                    "last_message_time": "2025-06-14 15:50:01"
                },
                {
                    "id": 2,
                    "title": "Empty",
                    "created_at": "2025-06-14 16:00:00",
                    "updated_at": "2025-06-14 16:00:00"
                }
            ]
        }"#;

        let envelope = Envelope::decode(raw).unwrap();
        let Payload::ConversationList { conversations } = envelope.payload else {
            panic!("expected a conversation_list payload");
        };
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].last_message.as_deref(), Some("Here is what I can see"));
        assert_eq!(conversations[1].last_message, None);
    }

    #[test]
    fn history_messages_default_missing_image_paths() {
        let raw = r#"{
            "to": "ui",
            "from": "agent",
            "type": "conversation_history",
            "conversation_id": 3,
            "title": "Captures",
            "messages": [
                {"id": 1, "role": "user", "content": "grab it", "timestamp": "t1", "image_path": "captures/window_20250614_154233.png"},
                {"id": 2, "role": "assistant", "content": "done", "timestamp": "t2"}
            ]
        }"#;

        let envelope = Envelope::decode(raw).unwrap();
        let Payload::ConversationHistory { messages, .. } = envelope.payload else {
            panic!("expected a conversation_history payload");
        };
        assert_eq!(messages[0].image_path, "captures/window_20250614_154233.png");
        assert_eq!(messages[1].image_path, "");
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Ui), Just(Role::Agent), Just(Role::Eye)]
    }

    proptest! {
        #[test]
        fn text_envelopes_round_trip_for_any_role_pair(
            to in any_role(),
            from in any_role(),
            data in ".*",
            conversation_id in proptest::option::of(0i64..10_000),
        ) {
            let envelope = Envelope::new(
                to,
                from,
                Payload::Text {
                    data,
                    conversation_id,
                    image_data: None,
                },
            );

            let raw = envelope.encode().unwrap();
            let decoded = Envelope::decode(&raw).unwrap();
            prop_assert_eq!(decoded, envelope);
        }
    }
}
