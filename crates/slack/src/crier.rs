use mudlark_core::events::{ClientType, NotificationMessage, Recipient};
use serde_json::{json, Value};
use tracing::debug;

/// Replacement content a formatter hands back for one delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedContent {
    pub message: String,
    pub blocks: Option<Vec<Value>>,
}

/// Pluggable per-event content override. Lets specific event types swap
/// the recipient's default text for a centrally defined rendering without
/// teaching the notification service about every event shape.
///
/// Implementations must not fail on unrecognized events; `None` simply
/// means "no override, use the recipient's own content".
pub trait RecipientFormatter: Send + Sync {
    fn format_recipient(
        &self,
        message: &NotificationMessage,
        recipient: &Recipient,
    ) -> Option<FormattedContent>;
}

/// Styles guild announcement events as town-crier broadcasts. Guild
/// members get the full proclamation; everyone else gets the one-line
/// digest.
#[derive(Default)]
pub struct GuildCrierFormatter;

const ANNOUNCEMENT_EVENT: &str = "guild.announcement.delivered";

impl RecipientFormatter for GuildCrierFormatter {
    fn format_recipient(
        &self,
        message: &NotificationMessage,
        recipient: &Recipient,
    ) -> Option<FormattedContent> {
        if recipient.client_type != ClientType::Slack {
            return None;
        }
        if message.event.get("eventType").and_then(Value::as_str) != Some(ANNOUNCEMENT_EVENT) {
            return None;
        }

        let payload = message.event.get("payload")?;
        let audience = message.event.get("audience").and_then(Value::as_str).unwrap_or("digest");

        let formatted = if audience == "guild" {
            let title = payload.get("title").and_then(Value::as_str)?;
            let body = payload.get("body").and_then(Value::as_str)?;
            FormattedContent {
                message: format!("📣 *{title}*\n{body}"),
                blocks: Some(vec![
                    json!({"type": "header", "text": {"type": "plain_text", "text": "Town Crier"}}),
                    json!({"type": "section", "text": {"type": "mrkdwn", "text": format!("*:scroll: {title}*")}}),
                    json!({"type": "section", "text": {"type": "mrkdwn", "text": body}}),
                ]),
            }
        } else {
            let digest = payload.get("digest").and_then(Value::as_str)?;
            FormattedContent {
                message: format!("📜 {digest}"),
                blocks: Some(vec![json!({
                    "type": "section",
                    "text": {"type": "mrkdwn", "text": format!("*:scroll: Guild Digest* – {digest}")}
                })]),
            }
        };

        debug!(
            event_name = "notify.crier.formatted",
            audience,
            announcement_id = payload.get("id").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
            "guild announcement formatted"
        );
        Some(formatted)
    }
}

#[cfg(test)]
mod tests {
    use mudlark_core::events::{ClientType, NotificationMessage, Recipient};
    use serde_json::{json, Value};

    use super::{GuildCrierFormatter, RecipientFormatter};

    fn recipient(client_type: ClientType) -> Recipient {
        Recipient {
            client_type,
            team_id: Some("T1".to_owned()),
            user_id: "U1".to_owned(),
            message: "Original text".to_owned(),
            role: None,
            priority: None,
            blocks: None,
        }
    }

    fn announcement(audience: &str) -> NotificationMessage {
        NotificationMessage {
            kind: "announcement".to_owned(),
            recipients: vec![recipient(ClientType::Slack)],
            event: json!({
                "eventType": "guild.announcement.delivered",
                "audience": audience,
                "payload": {
                    "id": "1",
                    "title": "Heroic News",
                    "body": "The guild celebrates.",
                    "digest": "Guild celebrates."
                }
            }),
        }
    }

    #[test]
    fn guild_audience_gets_the_full_proclamation() {
        let formatted = GuildCrierFormatter
            .format_recipient(&announcement("guild"), &recipient(ClientType::Slack))
            .expect("override for guild announcements");

        assert_eq!(formatted.message, "📣 *Heroic News*\nThe guild celebrates.");
        let blocks = formatted.blocks.expect("blocks");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[0]["text"]["text"], "Town Crier");
        assert_eq!(blocks[2]["text"]["text"], "The guild celebrates.");
    }

    #[test]
    fn other_audiences_get_the_compact_digest() {
        let formatted = GuildCrierFormatter
            .format_recipient(&announcement("digest"), &recipient(ClientType::Slack))
            .expect("override for digest recipients");

        assert_eq!(formatted.message, "📜 Guild celebrates.");
        let blocks = formatted.blocks.expect("blocks");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["text"]["text"], "*:scroll: Guild Digest* – Guild celebrates.");
    }

    #[test]
    fn unrelated_events_are_not_overridden() {
        let message = NotificationMessage {
            kind: "combat".to_owned(),
            recipients: vec![recipient(ClientType::Slack)],
            event: json!({"eventType": "combat:end"}),
        };

        assert!(GuildCrierFormatter.format_recipient(&message, &recipient(ClientType::Slack)).is_none());
    }

    #[test]
    fn non_slack_recipients_are_not_overridden() {
        assert!(GuildCrierFormatter
            .format_recipient(&announcement("guild"), &recipient(ClientType::Discord))
            .is_none());
    }

    #[test]
    fn malformed_payload_returns_no_override_instead_of_panicking() {
        let message = NotificationMessage {
            kind: "announcement".to_owned(),
            recipients: vec![recipient(ClientType::Slack)],
            event: json!({
                "eventType": "guild.announcement.delivered",
                "audience": "guild",
                "payload": {"title": 42}
            }),
        };

        assert!(GuildCrierFormatter.format_recipient(&message, &recipient(ClientType::Slack)).is_none());

        let no_payload = NotificationMessage {
            kind: "announcement".to_owned(),
            recipients: vec![recipient(ClientType::Slack)],
            event: Value::Null,
        };
        assert!(GuildCrierFormatter
            .format_recipient(&no_payload, &recipient(ClientType::Slack))
            .is_none());
    }
}
