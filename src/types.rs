use serde::{Deserialize, Serialize};

/// First-stage decode: just enough to tell a handshake from a notification.
/// Slack sends `type: "url_verification"` exactly once per endpoint setup.
#[derive(Debug, Deserialize)]
pub struct EnvelopeProbe {
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub challenge: Option<String>,
}

/// Full event callback envelope. Every field is defaulted so that any
/// notification Slack delivers decodes, whatever subset of metadata it
/// carries.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlackEnvelope {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    pub event_type: String,
    pub event: SlackEvent,
}

/// Nested event. Message and reaction sub-kinds decode into the one shape;
/// fields a sub-kind doesn't send stay at their zero value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlackEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub user: String,
    pub text: String,
    pub reaction: String,
}

/// The one shape we persist: who did something, and a line of text about it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub message: String,
    pub user: String,
}
