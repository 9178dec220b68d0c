//! Scoped usage-tracking sessions.

use std::time::Instant;

use crate::client::TokenTallyClient;
use crate::error::{Result, TokenTallyError};
use crate::types::{Metadata, TrackResult, UsageEvent};

/// A scoped usage-tracking session.
///
/// Created by [`TokenTallyClient::track_usage`]. The session captures its
/// start time at creation, accepts one [`set_usage`](Self::set_usage) call
/// while open, and submits a single usage event with the measured
/// `duration_ms` when [`finish`](Self::finish) consumes it.
///
/// Dropping a session without finishing it submits nothing. That is the
/// intended behavior when the tracked work fails: tracking is best-effort
/// telemetry and must never compete with the caller's own error.
///
/// ```no_run
/// # fn example() -> tokentally::Result<()> {
/// let client = tokentally::TokenTallyClient::new("tt_your_api_key")?;
///
/// let mut session = client.track_usage("claude-3-5-sonnet");
/// // ... call the model ...
/// session.set_usage_with_stop_reason(100, 200, "end_turn")?;
/// let result = session.finish()?;
/// println!("cost: ${}", result.cost_usd);
/// # Ok(())
/// # }
/// ```
#[must_use = "a session submits nothing until `finish` is called"]
#[derive(Debug)]
pub struct TrackingSession<'a> {
    client: &'a TokenTallyClient,
    model: String,
    provider: Option<String>,
    metadata: Option<Metadata>,
    started: Instant,
    usage: Option<RecordedUsage>,
}

#[derive(Debug)]
struct RecordedUsage {
    tokens_in: i64,
    tokens_out: i64,
    stop_reason: Option<String>,
}

impl<'a> TrackingSession<'a> {
    pub(crate) fn new(client: &'a TokenTallyClient, model: String) -> Self {
        Self {
            client,
            model,
            provider: None,
            metadata: None,
            started: Instant::now(),
            usage: None,
        }
    }

    /// Set the provider for the submitted event.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set custom metadata for the submitted event.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Record the token counts for this session.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Misuse`] if usage was already recorded.
    /// The first-recorded values are kept and are what [`finish`](Self::finish)
    /// submits.
    pub fn set_usage(&mut self, tokens_in: i64, tokens_out: i64) -> Result<()> {
        self.record(tokens_in, tokens_out, None)
    }

    /// Record the token counts together with the provider's stop reason.
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Misuse`] if usage was already recorded.
    pub fn set_usage_with_stop_reason(
        &mut self,
        tokens_in: i64,
        tokens_out: i64,
        stop_reason: impl Into<String>,
    ) -> Result<()> {
        self.record(tokens_in, tokens_out, Some(stop_reason.into()))
    }

    fn record(&mut self, tokens_in: i64, tokens_out: i64, stop_reason: Option<String>) -> Result<()> {
        if self.usage.is_some() {
            return Err(TokenTallyError::Misuse(
                "usage already recorded for this session".to_string(),
            ));
        }
        self.usage = Some(RecordedUsage {
            tokens_in,
            tokens_out,
            stop_reason,
        });
        Ok(())
    }

    /// Finish the session, submitting the recorded usage.
    ///
    /// Computes `duration_ms` from the elapsed wall-clock time since the
    /// session was created and delegates to [`TokenTallyClient::track`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenTallyError::Validation`] if no usage was recorded (no
    /// request is sent), otherwise any error the underlying `track` call
    /// produces.
    pub fn finish(mut self) -> Result<TrackResult> {
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let Some(usage) = self.usage.take() else {
            return Err(TokenTallyError::Validation(
                "no usage recorded: call set_usage before finishing the session".to_string(),
            ));
        };

        let mut event = UsageEvent::new(
            usage.tokens_in,
            usage.tokens_out,
            std::mem::take(&mut self.model),
        )
        .with_duration_ms(duration_ms);

        if let Some(provider) = self.provider.take() {
            event = event.with_provider(provider);
        }
        if let Some(metadata) = self.metadata.take() {
            event = event.with_metadata(metadata);
        }
        if let Some(stop_reason) = usage.stop_reason {
            event = event.with_stop_reason(stop_reason);
        }

        self.client.track(&event)
    }
}

impl Drop for TrackingSession<'_> {
    fn drop(&mut self) {
        if self.usage.is_some() {
            tracing::warn!(
                model = %self.model,
                "tracking session dropped before finish; usage event not submitted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TokenTallyClient;

    fn test_client() -> TokenTallyClient {
        TokenTallyClient::new("tt_test_key").unwrap()
    }

    #[test]
    fn set_usage_twice_fails_and_keeps_first_values() {
        let client = test_client();
        let mut session = client.track_usage("claude-3-5-sonnet");

        session.set_usage(100, 200).unwrap();
        let err = session.set_usage(1, 2).unwrap_err();
        assert!(matches!(err, TokenTallyError::Misuse(_)));

        let usage = session.usage.as_ref().unwrap();
        assert_eq!(usage.tokens_in, 100);
        assert_eq!(usage.tokens_out, 200);
        session.usage = None; // silence the drop warning in tests
    }

    #[test]
    fn set_usage_with_stop_reason_records_it() {
        let client = test_client();
        let mut session = client.track_usage("claude-3-5-sonnet");

        session
            .set_usage_with_stop_reason(100, 200, "end_turn")
            .unwrap();
        assert_eq!(
            session.usage.as_ref().unwrap().stop_reason.as_deref(),
            Some("end_turn")
        );
        session.usage = None;
    }

    #[test]
    fn finish_without_usage_fails_validation() {
        let client = test_client();
        let session = client.track_usage("claude-3-5-sonnet");

        let err = session.finish().unwrap_err();
        assert!(matches!(err, TokenTallyError::Validation(_)));
    }
}
