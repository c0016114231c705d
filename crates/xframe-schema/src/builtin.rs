//! Embedded schemas for the host-to-frame reply types.

use xframe_envelope::MessageType;

const INTERSECTION: &str = r##"{
    "type": "object",
    "properties": {
        "sentinel": { "type": "string" },
        "type": { "const": "intersection" },
        "changes": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "time": { "type": "number" },
                    "boundingClientRect": { "$ref": "#/$defs/rect" },
                    "intersectionRect": { "$ref": "#/$defs/rect" },
                    "rootBounds": { "$ref": "#/$defs/rect" }
                }
            }
        }
    },
    "required": ["sentinel", "type"],
    "$defs": {
        "rect": {
            "type": "object",
            "properties": {
                "left": { "type": "number" },
                "top": { "type": "number" },
                "right": { "type": "number" },
                "bottom": { "type": "number" },
                "width": { "type": "number", "minimum": 0 },
                "height": { "type": "number", "minimum": 0 },
                "x": { "type": "number" },
                "y": { "type": "number" }
            }
        }
    }
}"##;

const EMBED_STATE: &str = r#"{
    "type": "object",
    "properties": {
        "sentinel": { "type": "string" },
        "type": { "const": "embed-state" },
        "inViewport": { "type": "boolean" },
        "pageHidden": { "type": "boolean" }
    },
    "required": ["sentinel", "type"]
}"#;

const EMBED_SIZE_CHANGED: &str = r#"{
    "type": "object",
    "properties": {
        "sentinel": { "type": "string" },
        "type": { "const": "embed-size-changed" },
        "requestedHeight": { "type": "number" },
        "requestedWidth": { "type": "number" }
    },
    "required": ["sentinel", "type"]
}"#;

const EMBED_SIZE_DENIED: &str = r#"{
    "type": "object",
    "properties": {
        "sentinel": { "type": "string" },
        "type": { "const": "embed-size-denied" },
        "requestedHeight": { "type": "number" },
        "requestedWidth": { "type": "number" }
    },
    "required": ["sentinel", "type"]
}"#;

const EMBED_CONTEXT: &str = r#"{
    "type": "object",
    "properties": {
        "sentinel": { "type": "string" },
        "type": { "const": "embed-context" },
        "location": {
            "oneOf": [
                { "type": "string" },
                {
                    "type": "object",
                    "properties": { "href": { "type": "string" } },
                    "required": ["href"]
                }
            ]
        },
        "canonicalUrl": { "type": "string" },
        "clientId": { "type": ["string", "number", "null"] },
        "pageViewId": { "type": ["string", "number"] },
        "startTime": { "type": ["string", "number"] },
        "referrer": { "type": "string" }
    },
    "required": ["sentinel", "type"]
}"#;

/// Schemas shipped with the crate, keyed by reply type.
pub fn schemas() -> [(MessageType, &'static str); 5] {
    [
        (MessageType::Intersection, INTERSECTION),
        (MessageType::EmbedState, EMBED_STATE),
        (MessageType::EmbedSizeChanged, EMBED_SIZE_CHANGED),
        (MessageType::EmbedSizeDenied, EMBED_SIZE_DENIED),
        (MessageType::EmbedContext, EMBED_CONTEXT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_reply_type() {
        let covered: Vec<MessageType> = schemas().iter().map(|(t, _)| *t).collect();
        for reply in MessageType::replies() {
            assert!(covered.contains(&reply), "missing schema for {reply}");
        }
    }

    #[test]
    fn embedded_schemas_are_json() {
        for (message_type, schema) in schemas() {
            serde_json::from_str::<serde_json::Value>(schema)
                .unwrap_or_else(|err| panic!("{message_type} schema: {err}"));
        }
    }
}
