//! Typed views over envelope payloads.
//!
//! All views are lenient: missing fields take defaults and unknown fields are
//! ignored, so a host that sends a bare `{ sentinel, type }` still produces a
//! usable value.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of an `embed-size` resize request, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbedSize {
    pub width: f64,
    pub height: f64,
}

/// Body of `embed-size-changed` / `embed-size-denied`.
///
/// Sizes are echoed back as plain JSON numbers and are not range-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_width: Option<f64>,
}

/// Body of `embed-state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedState {
    pub in_viewport: bool,
    pub page_hidden: bool,
}

/// A rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

impl LayoutRect {
    /// Horizontal position, falling back to `left`.
    pub fn x(&self) -> f64 {
        self.x.unwrap_or(self.left)
    }

    /// Vertical position, falling back to `top`.
    pub fn y(&self) -> f64 {
        self.y.unwrap_or(self.top)
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// One intersection observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntersectionChange {
    pub time: f64,
    pub bounding_client_rect: LayoutRect,
    pub intersection_rect: LayoutRect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_bounds: Option<LayoutRect>,
}

impl IntersectionChange {
    /// Fraction of the element currently visible, in `0.0..=1.0`.
    pub fn intersection_ratio(&self) -> f64 {
        self.viewable_percentage() / 100.0
    }

    /// Percentage of the element currently visible, in `0.0..=100.0`.
    ///
    /// An element with zero area is reported as 0% visible.
    pub fn viewable_percentage(&self) -> f64 {
        let total = self.bounding_client_rect.area();
        if total <= 0.0 {
            return 0.0;
        }
        (self.intersection_rect.area() / total * 100.0).clamp(0.0, 100.0)
    }
}

/// Body of `intersection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntersectionPayload {
    pub changes: Vec<IntersectionChange>,
}

impl IntersectionPayload {
    /// The most recent change, if any.
    pub fn latest(&self) -> Option<&IntersectionChange> {
        self.changes.last()
    }
}

/// Page location as shipped in boot data: a bare URL or `{ "href": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Href(String),
    Object { href: String },
}

impl Location {
    pub fn href(&self) -> &str {
        match self {
            Location::Href(href) | Location::Object { href } => href,
        }
    }
}

impl PartialEq<str> for Location {
    fn eq(&self, other: &str) -> bool {
        self.href() == other
    }
}

impl PartialEq<&str> for Location {
    fn eq(&self, other: &&str) -> bool {
        self.href() == *other
    }
}

/// Body of `embed-context`: the page metadata fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedContextPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_view_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentinel: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

/// Accept a string or a number and keep its textual form.
///
/// Hosts disagree on whether ids and timestamps are strings (`"0"`) or
/// numbers (`1481234567890`).
pub fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn intersection_payload_tolerates_missing_changes() {
        let payload: IntersectionPayload =
            serde_json::from_value(json!({ "sentinel": "1-2", "type": "intersection" })).unwrap();
        assert!(payload.changes.is_empty());
        assert!(payload.latest().is_none());
    }

    #[test]
    fn viewable_percentage_of_latest_change() {
        let payload: IntersectionPayload = serde_json::from_value(json!({
            "changes": [
                {
                    "time": 1.0,
                    "boundingClientRect": { "left": 0, "top": 0, "width": 300, "height": 250 },
                    "intersectionRect": { "left": 0, "top": 0, "width": 0, "height": 0 }
                },
                {
                    "time": 2.0,
                    "boundingClientRect": { "left": 10, "top": 20, "width": 300, "height": 250, "x": 10, "y": 20 },
                    "intersectionRect": { "left": 10, "top": 20, "width": 300, "height": 125 }
                }
            ]
        }))
        .unwrap();

        let latest = payload.latest().expect("two changes");
        assert_eq!(latest.time, 2.0);
        assert_eq!(latest.viewable_percentage(), 50.0);
        assert_eq!(latest.intersection_ratio(), 0.5);
        assert_eq!(latest.bounding_client_rect.x(), 10.0);
        assert_eq!(latest.intersection_rect.y(), 20.0);
    }

    #[test]
    fn zero_area_is_not_visible() {
        let change = IntersectionChange::default();
        assert_eq!(change.viewable_percentage(), 0.0);
    }

    #[test]
    fn resize_outcome_fields_are_optional() {
        let outcome: ResizeOutcome = serde_json::from_value(json!({
            "type": "embed-size-denied",
            "requestedHeight": 100,
            "requestedWidth": 200
        }))
        .unwrap();
        assert_eq!(outcome.requested_height, Some(100.0));
        assert_eq!(outcome.requested_width, Some(200.0));

        let bare: ResizeOutcome = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare, ResizeOutcome::default());
    }

    #[test]
    fn resize_outcome_accepts_any_json_number() {
        let outcome: ResizeOutcome = serde_json::from_value(json!({
            "requestedHeight": 100.5,
            "requestedWidth": -20
        }))
        .unwrap();
        assert_eq!(outcome.requested_height, Some(100.5));
        assert_eq!(outcome.requested_width, Some(-20.0));
    }

    #[test]
    fn embed_state_defaults() {
        let state: EmbedState = serde_json::from_value(json!({ "pageHidden": true })).unwrap();
        assert!(state.page_hidden);
        assert!(!state.in_viewport);
    }

    #[test]
    fn location_accepts_string_or_object() {
        let bare: Location = serde_json::from_value(json!("foo.com")).unwrap();
        let object: Location =
            serde_json::from_value(json!({ "href": "https://foo.com/a" })).unwrap();
        assert_eq!(bare, "foo.com");
        assert_eq!(object.href(), "https://foo.com/a");
    }

    #[test]
    fn context_payload_accepts_numeric_ids() {
        let payload: EmbedContextPayload = serde_json::from_value(json!({
            "type": "embed-context",
            "pageViewId": 1234,
            "startTime": 1481234567890u64,
            "clientId": "abc"
        }))
        .unwrap();
        assert_eq!(payload.page_view_id.as_deref(), Some("1234"));
        assert_eq!(payload.start_time.as_deref(), Some("1481234567890"));
        assert_eq!(payload.client_id.as_deref(), Some("abc"));
        assert!(payload.location.is_none());
    }

    #[test]
    fn context_payload_rejects_structured_ids() {
        let result: serde_json::Result<EmbedContextPayload> =
            serde_json::from_value(json!({ "clientId": ["x"] }));
        assert!(result.is_err());
    }
}
