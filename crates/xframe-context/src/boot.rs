//! Boot data handed to the frame by its loader.
//!
//! The loader serializes `{ "_context": {...}, ...attributes }` into the
//! frame's window name, URI-encoded. Older loaders used the location hash
//! instead, and the oldest only put `amp3pSentinel=<sentinel>` there.

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use xframe_envelope::{string_or_number, EmbedContextPayload, Location};
use xframe_window::Window;

use crate::error::{ContextError, Result};
use crate::sentinel::Sentinel;

/// Page context the loader knew when it created the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootContext {
    pub sentinel: String,
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
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl BootContext {
    /// A context that only knows its sentinel.
    pub fn with_sentinel(sentinel: &Sentinel) -> Self {
        Self {
            sentinel: sentinel.to_string(),
            location: None,
            canonical_url: None,
            client_id: None,
            page_view_id: None,
            start_time: None,
            referrer: None,
        }
    }
}

/// Parsed boot data: the `_context` block plus any other top-level attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootData {
    #[serde(rename = "_context")]
    pub context: BootContext,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl BootData {
    /// Boot data recovered from a legacy `amp3pSentinel=` hash.
    pub fn legacy(sentinel: &Sentinel) -> Self {
        Self {
            context: BootContext::with_sentinel(sentinel),
            attributes: Map::new(),
        }
    }

    /// Parse boot data from a window name or hash fragment.
    ///
    /// A leading `#` is ignored. The text is tried as-is first and then
    /// percent-decoded.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let text = text.strip_prefix('#').unwrap_or(text);
        if text.is_empty() {
            return Err(ContextError::MissingBootData);
        }

        let raw_err = match serde_json::from_str::<BootData>(text) {
            Ok(data) => return Ok(data),
            Err(err) => err,
        };

        let decoded = percent_decode_str(text).decode_utf8().map_err(|err| {
            ContextError::InvalidBootData(format!("percent-decoded text is not UTF-8: {err}"))
        })?;
        if decoded == text {
            return Err(ContextError::InvalidBootData(raw_err.to_string()));
        }
        serde_json::from_str(&decoded).map_err(|err| ContextError::InvalidBootData(err.to_string()))
    }

    /// Read boot data from `window`.
    ///
    /// Sources in order: window name, hash fragment, legacy hash sentinel.
    /// When every source fails, the window name error wins so the caller sees
    /// why the primary source was rejected.
    pub fn from_window(window: &dyn Window) -> Result<Self> {
        let mut first_error = None;

        let name = window.name();
        if !name.trim().is_empty() {
            match Self::parse(&name) {
                Ok(data) => {
                    tracing::debug!(source = "name", "boot data loaded");
                    return Ok(data);
                }
                Err(err) => first_error = Some(err),
            }
        }

        let hash = window.location_hash();
        if looks_like_json(&hash) {
            match Self::parse(&hash) {
                Ok(data) => {
                    tracing::debug!(source = "hash", "boot data loaded");
                    return Ok(data);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if let Some(sentinel) = Sentinel::from_hash(&hash)? {
            tracing::debug!(source = "legacy-hash", "boot data loaded");
            return Ok(Self::legacy(&sentinel));
        }

        Err(first_error.unwrap_or(ContextError::MissingBootData))
    }

    /// The raw sentinel string.
    pub fn sentinel(&self) -> &str {
        &self.context.sentinel
    }

    /// A top-level attribute such as `width`, `height` or `src`.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn width(&self) -> Option<u64> {
        self.attribute("width").and_then(numeric_attribute)
    }

    pub fn height(&self) -> Option<u64> {
        self.attribute("height").and_then(numeric_attribute)
    }
}

fn numeric_attribute(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn looks_like_json(hash: &str) -> bool {
    let body = hash.trim();
    let body = body.strip_prefix('#').unwrap_or(body);
    body.starts_with('{')
        || body
            .get(..3)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("%7b"))
}

/// Page metadata as currently known to the frame.
///
/// Seeded from boot data and refreshed by the `embed-context` handshake. The
/// sentinel is not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_view_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl ContextMetadata {
    /// Overwrite every field the update carries. Returns true if anything
    /// changed.
    pub fn apply(&mut self, update: &EmbedContextPayload) -> bool {
        let before = self.clone();
        overwrite(&mut self.location, &update.location);
        overwrite(&mut self.canonical_url, &update.canonical_url);
        overwrite(&mut self.client_id, &update.client_id);
        overwrite(&mut self.page_view_id, &update.page_view_id);
        overwrite(&mut self.start_time, &update.start_time);
        overwrite(&mut self.referrer, &update.referrer);
        *self != before
    }
}

fn overwrite<T: Clone>(field: &mut Option<T>, update: &Option<T>) {
    if let Some(value) = update {
        *field = Some(value.clone());
    }
}

impl From<&BootContext> for ContextMetadata {
    fn from(context: &BootContext) -> Self {
        Self {
            location: context.location.clone(),
            canonical_url: context.canonical_url.clone(),
            client_id: context.client_id.clone(),
            page_view_id: context.page_view_id.clone(),
            start_time: context.start_time.clone(),
            referrer: context.referrer.clone(),
        }
    }
}
