use crate::types::{EnvelopeProbe, EventRecord, SlackEnvelope};
use tracing::warn;

/// Outcome of the first-stage decode.
#[derive(Debug)]
pub enum Classified {
    Handshake { challenge: String },
    Notification,
}

/// Decide what kind of request this body is. Only the discriminator fields
/// are decoded here, so a handshake goes through even when the rest of the
/// payload is junk.
pub fn classify(body: &[u8]) -> Result<Classified, serde_json::Error> {
    let probe: EnvelopeProbe = serde_json::from_slice(body)?;
    if probe.event_type == "url_verification" {
        let challenge = probe.challenge.unwrap_or_else(|| {
            warn!("url_verification payload without a challenge field");
            String::new()
        });
        return Ok(Classified::Handshake { challenge });
    }
    Ok(Classified::Notification)
}

/// Best-effort extraction of the persisted record from a notification body.
/// A body that doesn't decode as a full envelope is logged and turned into a
/// defaulted record instead of failing the delivery - Slack retries on
/// non-200s and we'd rather archive an empty record than drop the event.
pub fn extract_record(body: &[u8]) -> EventRecord {
    let envelope: SlackEnvelope = match serde_json::from_slice(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Failed to parse event envelope, storing defaults: {}", e);
            return EventRecord::default();
        }
    };

    let event = envelope.event;
    let message = match event.event_type.as_str() {
        "reaction_added" => format!("reacted with :{}:", event.reaction),
        "reaction_removed" => format!("removed reaction :{}:", event.reaction),
        _ => event.text,
    };

    EventRecord {
        message,
        user: event.user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_detects_handshake() {
        let body = br#"{"token":"t0k","type":"url_verification","challenge":"3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P"}"#;
        match classify(body).unwrap() {
            Classified::Handshake { challenge } => {
                assert_eq!(challenge, "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P");
            }
            Classified::Notification => panic!("expected handshake"),
        }
    }

    #[test]
    fn classify_detects_notification() {
        let body = br#"{"type":"event_callback","event":{"type":"message"}}"#;
        assert!(matches!(
            classify(body).unwrap(),
            Classified::Notification
        ));
    }

    #[test]
    fn classify_treats_missing_type_as_notification() {
        let body = br#"{"event":{"type":"message","text":"hi"}}"#;
        assert!(matches!(
            classify(body).unwrap(),
            Classified::Notification
        ));
    }

    #[test]
    fn classify_handshake_survives_malformed_event_payload() {
        // The probe never looks at `event`, so a handshake with a broken
        // event section still echoes its challenge.
        let body = br#"{"type":"url_verification","challenge":"abc","event":42}"#;
        match classify(body).unwrap() {
            Classified::Handshake { challenge } => assert_eq!(challenge, "abc"),
            Classified::Notification => panic!("expected handshake"),
        }
    }

    #[test]
    fn classify_handshake_without_challenge_echoes_empty() {
        let body = br#"{"type":"url_verification"}"#;
        match classify(body).unwrap() {
            Classified::Handshake { challenge } => assert_eq!(challenge, ""),
            Classified::Notification => panic!("expected handshake"),
        }
    }

    #[test]
    fn classify_rejects_invalid_json() {
        assert!(classify(b"{ not json").is_err());
    }

    #[test]
    fn classify_rejects_non_string_type() {
        assert!(classify(br#"{"type":42}"#).is_err());
    }

    #[test]
    fn extract_message_event() {
        let body = br#"{
            "token": "t0k",
            "team_id": "T123",
            "api_app_id": "A123",
            "type": "event_callback",
            "event_id": "Ev123",
            "event_time": 1355517523,
            "event": {
                "type": "message",
                "user": "U1",
                "text": "hello world",
                "channel": "C024BE91L",
                "ts": "1355517523.000005"
            }
        }"#;
        assert_eq!(
            extract_record(body),
            EventRecord {
                message: "hello world".to_string(),
                user: "U1".to_string(),
            }
        );
    }

    #[test]
    fn extract_reaction_added_uses_fallback_text() {
        let body = br#"{
            "type": "event_callback",
            "event": {
                "type": "reaction_added",
                "user": "U2",
                "reaction": "thumbsup",
                "item": {"type": "message", "channel": "C0G9QF9GZ", "ts": "1360782400.498405"},
                "event_ts": "1360782804.083113"
            }
        }"#;
        assert_eq!(
            extract_record(body),
            EventRecord {
                message: "reacted with :thumbsup:".to_string(),
                user: "U2".to_string(),
            }
        );
    }

    #[test]
    fn extract_reaction_removed_uses_fallback_text() {
        let body = br#"{
            "type": "event_callback",
            "event": {"type": "reaction_removed", "user": "U3", "reaction": "eyes"}
        }"#;
        assert_eq!(
            extract_record(body),
            EventRecord {
                message: "removed reaction :eyes:".to_string(),
                user: "U3".to_string(),
            }
        );
    }

    #[test]
    fn extract_unknown_subkind_keeps_text_and_user() {
        let body = br#"{
            "type": "event_callback",
            "event": {"type": "app_mention", "user": "U9", "text": "<@U0LAN0Z89> ping"}
        }"#;
        assert_eq!(
            extract_record(body),
            EventRecord {
                message: "<@U0LAN0Z89> ping".to_string(),
                user: "U9".to_string(),
            }
        );
    }

    #[test]
    fn extract_missing_event_defaults_to_empty_record() {
        let body = br#"{"type":"event_callback","event_id":"Ev999"}"#;
        assert_eq!(extract_record(body), EventRecord::default());
    }

    #[test]
    fn extract_mismatched_event_shape_defaults_to_empty_record() {
        // Valid JSON at the top level, but `event` is not an object.
        let body = br#"{"type":"event_callback","event":"not an object"}"#;
        assert_eq!(extract_record(body), EventRecord::default());
    }

    #[test]
    fn extract_invalid_json_defaults_to_empty_record() {
        assert_eq!(extract_record(b"{ not json"), EventRecord::default());
    }

    #[test]
    fn extract_tolerates_unknown_fields() {
        let body = br#"{
            "type": "event_callback",
            "authorizations": [{"team_id": "T123"}],
            "event": {
                "type": "message",
                "user": "U5",
                "text": "with blocks",
                "blocks": [{"type": "rich_text", "block_id": "b1"}],
                "client_msg_id": "x-y-z"
            }
        }"#;
        assert_eq!(
            extract_record(body),
            EventRecord {
                message: "with blocks".to_string(),
                user: "U5".to_string(),
            }
        );
    }
}
