//! Shapes outbound payloads to Slack's hard structural limits.
//!
//! Total and idempotent by contract: callers apply it without knowing
//! whether shaping already happened, and nothing here can fail. Length
//! problems are corrected, never reported.

use serde_json::Value;

/// Maximum characters Slack accepts in a text field.
pub const TEXT_LIMIT: usize = 3000;
/// Maximum blocks Slack accepts per message.
pub const BLOCK_LIMIT: usize = 50;

const ELLIPSIS: &str = "...";

#[derive(Clone, Debug, PartialEq)]
pub struct ShapedPayload {
    pub text: String,
    pub blocks: Option<Vec<Value>>,
}

/// Truncates `text` and every text-bearing field of `blocks` to
/// [`TEXT_LIMIT`], and drops blocks past [`BLOCK_LIMIT`]. An absent or
/// empty block list shapes to `blocks: None`.
pub fn shape(text: &str, blocks: Option<&[Value]>) -> ShapedPayload {
    let text = truncate_text(text);

    let blocks = match blocks {
        None | Some([]) => None,
        Some(blocks) => {
            Some(blocks.iter().take(BLOCK_LIMIT).map(truncate_block).collect::<Vec<_>>())
        }
    };

    ShapedPayload { text, blocks }
}

/// Keeps `TEXT_LIMIT - 3` characters and appends the ellipsis marker, so
/// truncated output is always exactly `TEXT_LIMIT` characters.
fn truncate_text(text: &str) -> String {
    if text.chars().count() <= TEXT_LIMIT {
        return text.to_owned();
    }

    let mut truncated: String = text.chars().take(TEXT_LIMIT - ELLIPSIS.len()).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn truncate_block(block: &Value) -> Value {
    let Some(object) = block.as_object() else {
        return block.clone();
    };

    let mut next = object.clone();

    match next.get("text") {
        Some(Value::String(text)) => {
            next.insert("text".to_owned(), Value::String(truncate_text(text)));
        }
        Some(text_object @ Value::Object(_)) => {
            next.insert("text".to_owned(), truncate_text_object(text_object));
        }
        _ => {}
    }

    for list_key in ["fields", "elements"] {
        if let Some(Value::Array(entries)) = next.get(list_key) {
            let truncated = entries.iter().map(truncate_text_object).collect();
            next.insert(list_key.to_owned(), Value::Array(truncated));
        }
    }

    for nested_key in ["label", "placeholder"] {
        if let Some(nested @ Value::Object(_)) = next.get(nested_key) {
            let truncated = truncate_text_object(nested);
            next.insert(nested_key.to_owned(), truncated);
        }
    }

    Value::Object(next)
}

/// Truncates the `text` string of an object-with-`text`; anything else
/// passes through unmodified.
fn truncate_text_object(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return value.clone();
    };

    match object.get("text") {
        Some(Value::String(text)) => {
            let mut next = object.clone();
            next.insert("text".to_owned(), Value::String(truncate_text(text)));
            Value::Object(next)
        }
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{shape, BLOCK_LIMIT, TEXT_LIMIT};

    fn long_text() -> String {
        "x".repeat(TEXT_LIMIT + 500)
    }

    #[test]
    fn short_text_passes_through_untouched() {
        let shaped = shape("You strike the goblin!", None);
        assert_eq!(shaped.text, "You strike the goblin!");
        assert_eq!(shaped.blocks, None);
    }

    #[test]
    fn truncated_text_is_exactly_the_limit_and_ends_with_ellipsis() {
        let shaped = shape(&long_text(), None);
        assert_eq!(shaped.text.chars().count(), TEXT_LIMIT);
        assert!(shaped.text.ends_with("..."));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "⚔".repeat(TEXT_LIMIT + 10);
        let shaped = shape(&text, None);
        assert_eq!(shaped.text.chars().count(), TEXT_LIMIT);
        assert!(shaped.text.ends_with("..."));
    }

    #[test]
    fn empty_block_list_shapes_to_none() {
        let shaped = shape("hi", Some(&[]));
        assert_eq!(shaped.blocks, None);
    }

    #[test]
    fn blocks_past_the_limit_are_dropped_entirely() {
        let blocks: Vec<Value> = (0..BLOCK_LIMIT + 7)
            .map(|index| json!({"type": "section", "text": {"type": "mrkdwn", "text": format!("block {index}")}}))
            .collect();

        let shaped = shape("hi", Some(&blocks));
        let shaped_blocks = shaped.blocks.expect("blocks retained");
        assert_eq!(shaped_blocks.len(), BLOCK_LIMIT);
        assert_eq!(shaped_blocks[BLOCK_LIMIT - 1]["text"]["text"], format!("block {}", BLOCK_LIMIT - 1));
    }

    #[test]
    fn every_listed_text_location_is_truncated() {
        let blocks = vec![json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": long_text()},
            "fields": [
                {"type": "mrkdwn", "text": long_text()},
                {"type": "plain_text", "text": "short"}
            ],
            "elements": [{"type": "plain_text", "text": long_text()}],
            "label": {"type": "plain_text", "text": long_text()},
            "placeholder": {"type": "plain_text", "text": long_text()}
        })];

        let shaped = shape("hi", Some(&blocks));
        let block = &shaped.blocks.expect("blocks retained")[0];

        for text in [
            &block["text"]["text"],
            &block["fields"][0]["text"],
            &block["elements"][0]["text"],
            &block["label"]["text"],
            &block["placeholder"]["text"],
        ] {
            let text = text.as_str().expect("text field");
            assert_eq!(text.chars().count(), TEXT_LIMIT);
            assert!(text.ends_with("..."));
        }

        assert_eq!(block["fields"][1]["text"], "short");
    }

    #[test]
    fn top_level_string_text_is_truncated_too() {
        let blocks = vec![json!({"type": "section", "text": long_text()})];
        let shaped = shape("hi", Some(&blocks));
        let text = shaped.blocks.expect("blocks")[0]["text"].as_str().expect("text").to_owned();
        assert_eq!(text.chars().count(), TEXT_LIMIT);
    }

    #[test]
    fn unlisted_fields_pass_through_unmodified() {
        let blocks = vec![json!({
            "type": "image",
            "image_url": "https://example.com/map.png",
            "alt_text": long_text(),
            "title": {"type": "plain_text", "text": "short"}
        })];

        let shaped = shape("hi", Some(&blocks));
        let block = &shaped.blocks.expect("blocks")[0];
        assert_eq!(block["alt_text"].as_str().map(|value| value.chars().count()), Some(TEXT_LIMIT + 500));
        assert_eq!(block["title"]["text"], "short");
    }

    #[test]
    fn non_object_blocks_survive_shaping() {
        let blocks = vec![json!("not an object"), json!(42)];
        let shaped = shape("hi", Some(&blocks));
        assert_eq!(shaped.blocks, Some(blocks));
    }

    #[test]
    fn shaping_is_idempotent() {
        let blocks = vec![json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": long_text()},
            "fields": [{"type": "mrkdwn", "text": long_text()}]
        })];

        let first = shape(&long_text(), Some(&blocks));
        let second = shape(&first.text, first.blocks.as_deref());
        assert_eq!(first, second);
    }
}
