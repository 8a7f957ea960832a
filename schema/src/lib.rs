//! Shared document models for the analytics collections.
//!
//! Field names are persisted in camelCase to stay wire-compatible with the
//! dashboard and export consumers, so every multi-word field carries a
//! `serde(rename = ...)`.

use bson::{DateTime, Document, oid::ObjectId};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

pub mod db;

/// Event name recorded once per browsing context, when identity is first assigned.
pub const SESSION_STARTED: &str = "session_started";
/// Event name of the primary call-to-action click, the conversion signal.
pub const CTA_CLICKED: &str = "cta_clicked";
/// Event name of a positioned click inside the instrumented container.
pub const PAGE_CLICK: &str = "page_click";
/// Event name of the secondary (non-converting) button click.
pub const SECONDARY_CLICKED: &str = "secondary_clicked";

/// The A/B experiment arm, sticky to a session.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Variant {
    #[default]
    A,
    B,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

/// One recorded interaction. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub variant: Variant,
    pub name: String,
    /// Open, schema-less extras. Preserved verbatim, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Document>,
    /// Click position relative to the instrumented container, in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Server-assigned at persistence time; the sole basis for time filtering.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

impl Event {
    /// `createdAt` in the dashboard's wire format, e.g. `2025-08-16T00:00:00.000Z`.
    pub fn created_at_rfc3339(&self) -> String {
        rfc3339_millis(self.created_at)
    }
}

/// One free-text feedback submission. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Caller-supplied, range unvalidated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime,
}

impl Feedback {
    pub fn created_at_rfc3339(&self) -> String {
        rfc3339_millis(self.created_at)
    }
}

/// Renders a BSON datetime with millisecond precision and a `Z` suffix.
pub fn rfc3339_millis(datetime: DateTime) -> String {
    datetime
        .to_chrono()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_defaults_to_a() {
        assert_eq!(Variant::default(), Variant::A);
    }

    #[test]
    fn variant_round_trips_as_bare_string() {
        let serialized = serde_json::to_string(&Variant::B).unwrap();
        assert_eq!(serialized, "\"B\"");
        let parsed: Variant = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, Variant::A);
    }

    #[test]
    fn event_persists_camel_case_fields_and_omits_absent_ones() {
        let event = Event {
            id: None,
            session_id: "s-1".to_string(),
            variant: Variant::A,
            name: SESSION_STARTED.to_string(),
            meta: None,
            x: None,
            y: None,
            created_at: DateTime::from_millis(0),
        };
        let doc = bson::to_document(&event).unwrap();
        assert_eq!(doc.get_str("sessionId").unwrap(), "s-1");
        assert!(doc.get("createdAt").is_some());
        assert!(doc.get("_id").is_none());
        assert!(doc.get("x").is_none());
        assert!(doc.get("meta").is_none());
    }

    #[test]
    fn created_at_renders_with_millis_and_z() {
        let event = Event {
            id: None,
            session_id: "s-1".to_string(),
            variant: Variant::B,
            name: PAGE_CLICK.to_string(),
            meta: None,
            x: Some(0.5),
            y: Some(0.5),
            created_at: DateTime::from_millis(0),
        };
        assert_eq!(event.created_at_rfc3339(), "1970-01-01T00:00:00.000Z");
    }
}
