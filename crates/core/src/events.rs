use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event-bus envelope: a game event plus the chat users it should
/// reach. Published by the DM service, consumed once, never persisted.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NotificationMessage {
    /// Free-form category tag ("combat", "announcement", ...). Used for
    /// logging and default formatting only, never for routing.
    #[serde(rename = "type")]
    pub kind: String,
    pub recipients: Vec<Recipient>,
    /// The original domain event. Opaque to the delivery pipeline apart
    /// from the few fields formatter hooks inspect.
    pub event: Value,
}

/// One outbound message target inside a [`NotificationMessage`].
///
/// A single event can fan out to several chat platforms at once; each
/// platform's pipeline only processes recipients matching its own
/// `client_type` and skips the rest.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub client_type: ClientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    pub user_id: String,
    /// Plain-text fallback content, always present.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Optional Block Kit payload. Entries stay opaque JSON so the DM
    /// service can evolve its rich layouts without a contract change here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Value>>,
}

impl Recipient {
    pub fn has_blocks(&self) -> bool {
        self.blocks.as_ref().is_some_and(|blocks| !blocks.is_empty())
    }
}

/// Chat platform discriminator. New platforms appear on the wire before
/// this enum learns about them, so unknown tags deserialize to `Unknown`
/// instead of failing the whole envelope.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientType {
    Slack,
    Discord,
    Web,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Attacker,
    Defender,
    Observer,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Normal,
    Low,
}
