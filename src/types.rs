//! Request and response types for the TokenTally client.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokenTallyError};

/// Custom metadata attached to a usage event.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A scalar metadata value.
///
/// Metadata is a flat string-keyed bag of scalars so the wire format stays
/// well-defined; nested structures belong server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    String(String),
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A single usage event submitted for cost accounting.
///
/// One event corresponds to one AI model invocation. Events are not
/// deduplicated: submitting the same event twice bills it twice.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    /// Input (prompt) tokens consumed.
    pub tokens_in: i64,

    /// Output (completion) tokens produced.
    pub tokens_out: i64,

    /// Model name (e.g., "claude-3-5-sonnet").
    pub model: String,

    /// AI provider (e.g., "anthropic"). The server infers it from the model
    /// name when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Custom metadata (`feature`, `session_id`, etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Stop reason reported by the provider, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    /// Wall-clock duration of the tracked call in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// When the usage occurred.
    pub timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// Create a new usage event for `model`, timestamped now.
    #[must_use]
    pub fn new(tokens_in: i64, tokens_out: i64, model: impl Into<String>) -> Self {
        Self {
            tokens_in,
            tokens_out,
            model: model.into(),
            provider: None,
            metadata: None,
            stop_reason: None,
            duration_ms: None,
            timestamp: Utc::now(),
        }
    }

    /// Set the provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set custom metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the stop reason.
    #[must_use]
    pub fn with_stop_reason(mut self, stop_reason: impl Into<String>) -> Self {
        self.stop_reason = Some(stop_reason.into());
        self
    }

    /// Set the call duration in milliseconds.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Check the local invariants before submission.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Validation`] if a token count is negative
    /// or the model name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.tokens_in < 0 {
            return Err(TokenTallyError::Validation(format!(
                "tokens_in must be non-negative, got {}",
                self.tokens_in
            )));
        }
        if self.tokens_out < 0 {
            return Err(TokenTallyError::Validation(format!(
                "tokens_out must be non-negative, got {}",
                self.tokens_out
            )));
        }
        if self.model.is_empty() {
            return Err(TokenTallyError::Validation(
                "model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server acknowledgement for a recorded usage event.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackResult {
    /// Whether the event was recorded.
    #[serde(default)]
    pub success: bool,

    /// Server-assigned record ID.
    #[serde(default)]
    pub record_id: String,

    /// Computed cost in US dollars.
    #[serde(default)]
    pub cost_usd: f64,

    /// Any additional fields the server returned.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Error body returned by the service on 4xx/5xx.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub(crate) error: Option<String>,
    pub(crate) message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_zero_tokens() {
        let event = UsageEvent::new(0, 0, "claude-3-5-sonnet");
        assert!(event.validate().is_ok());
    }

    #[test]
    fn validate_rejects_negative_tokens() {
        let event = UsageEvent::new(-1, 200, "claude-3-5-sonnet");
        let err = event.validate().unwrap_err();
        assert!(matches!(err, TokenTallyError::Validation(_)));

        let event = UsageEvent::new(100, -5, "claude-3-5-sonnet");
        assert!(matches!(
            event.validate().unwrap_err(),
            TokenTallyError::Validation(_)
        ));
    }

    #[test]
    fn validate_rejects_empty_model() {
        let event = UsageEvent::new(100, 200, "");
        assert!(matches!(
            event.validate().unwrap_err(),
            TokenTallyError::Validation(_)
        ));
    }

    #[test]
    fn event_omits_unset_optional_fields() {
        let event = UsageEvent::new(100, 200, "claude-3-5-sonnet");
        let json = serde_json::to_value(&event).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object["tokens_in"], 100);
        assert_eq!(object["tokens_out"], 200);
        assert_eq!(object["model"], "claude-3-5-sonnet");
        assert!(object.contains_key("timestamp"));
        assert!(!object.contains_key("provider"));
        assert!(!object.contains_key("metadata"));
        assert!(!object.contains_key("stop_reason"));
        assert!(!object.contains_key("duration_ms"));
    }

    #[test]
    fn event_serializes_builder_fields() {
        let mut metadata = Metadata::new();
        metadata.insert("feature".to_string(), "chat".into());
        metadata.insert("attempt".to_string(), 2i64.into());
        metadata.insert("cached".to_string(), false.into());

        let event = UsageEvent::new(100, 200, "claude-3-5-sonnet")
            .with_provider("anthropic")
            .with_metadata(metadata)
            .with_stop_reason("end_turn")
            .with_duration_ms(1500);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["provider"], "anthropic");
        assert_eq!(json["stop_reason"], "end_turn");
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["metadata"]["feature"], "chat");
        assert_eq!(json["metadata"]["attempt"], 2);
        assert_eq!(json["metadata"]["cached"], false);
    }

    #[test]
    fn track_result_captures_extra_fields() {
        let body = serde_json::json!({
            "success": true,
            "record_id": "rec_01H",
            "cost_usd": 0.0042,
            "billing_period": "2026-08"
        });

        let result: TrackResult = serde_json::from_value(body).unwrap();
        assert!(result.success);
        assert_eq!(result.record_id, "rec_01H");
        assert!((result.cost_usd - 0.0042).abs() < f64::EPSILON);
        assert_eq!(result.extra["billing_period"], "2026-08");
    }

    #[test]
    fn track_result_defaults_missing_fields() {
        let result: TrackResult = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!result.success);
        assert_eq!(result.record_id, "");
        assert!(result.cost_usd.abs() < f64::EPSILON);
    }
}
