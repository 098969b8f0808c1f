//! # Analytics Sinks
//!
//! Concrete receivers for the core's analytics events.
//!
//! - [`TracingSink`]: every event becomes a structured `tracing` event.
//! - [`MeasurementSink`]: events are queued on a bounded channel and posted
//!   to a Measurement Protocol collector by a background task, so `record`
//!   never waits on the network.
//!
//! Delivery failures are logged and dropped, and so are events that arrive
//! while the queue is full.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use talkstart_core::{AnalyticsConfig, AnalyticsError, AnalyticsEvent, AnalyticsSink};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

// =============================================================================
// TRACING SINK
// =============================================================================

/// Logs analytics events under the `talkstart::analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        tracing::info!(
            target: "talkstart::analytics",
            event = event.name(),
            category = event.category(),
            label = event.label().unwrap_or_default(),
            value = ?event.value(),
            "analytics event"
        );
        Ok(())
    }
}

// =============================================================================
// MEASUREMENT PROTOCOL SINK
// =============================================================================

/// Events waiting for delivery. Past this, new events are dropped.
pub const QUEUE_CAPACITY: usize = 256;

/// How long one collector request may take.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Forwards events to a remote collector from a background task.
#[derive(Debug, Clone)]
pub struct MeasurementSink {
    sender: mpsc::Sender<AnalyticsEvent>,
}

/// The background delivery task behind a [`MeasurementSink`].
///
/// The task ends once every sink clone is dropped and the queue is drained.
#[derive(Debug)]
pub struct AnalyticsDelivery {
    handle: JoinHandle<()>,
}

impl MeasurementSink {
    /// Start the delivery task on the current tokio runtime.
    pub fn spawn(config: AnalyticsConfig) -> Result<(Self, AnalyticsDelivery), AnalyticsError> {
        Self::spawn_with_capacity(config, QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(
        config: AnalyticsConfig,
        capacity: usize,
    ) -> Result<(Self, AnalyticsDelivery), AnalyticsError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| AnalyticsError::Unavailable)?;
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = runtime.spawn(deliver(config, receiver));
        Ok((Self { sender }, AnalyticsDelivery { handle }))
    }
}

impl AnalyticsSink for MeasurementSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {
                tracing::debug!(target: "talkstart::analytics", event = event.name(), "queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    target: "talkstart::analytics",
                    event = event.name(),
                    "Analytics queue full, dropping event"
                );
                Err(AnalyticsError::Delivery("queue full".to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(AnalyticsError::Unavailable),
        }
    }
}

impl AnalyticsDelivery {
    /// Wait up to `wait` for queued events to go out, then give up on the rest.
    ///
    /// Call after the last sink clone is dropped, otherwise this waits the
    /// full `wait`.
    pub async fn finish(self, wait: Duration) {
        let mut handle = self.handle;
        match tokio::time::timeout(wait, &mut handle).await {
            Ok(Ok(())) => tracing::debug!("Analytics queue flushed"),
            Ok(Err(e)) => tracing::warn!("Analytics delivery task failed: {}", e),
            Err(_) => {
                tracing::warn!(
                    "Analytics flush timed out after {:?}, dropping queued events",
                    wait
                );
                handle.abort();
            }
        }
    }
}

async fn deliver(config: AnalyticsConfig, mut receiver: mpsc::Receiver<AnalyticsEvent>) {
    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Analytics HTTP client fallback: {}", e);
            reqwest::Client::new()
        });
    let mut query = vec![("measurement_id", config.measurement_id.clone())];
    if let Some(secret) = &config.api_secret {
        query.push(("api_secret", secret.clone()));
    }

    while let Some(event) = receiver.recv().await {
        let body = build_payload(&config.client_id, &event);
        let result = http
            .post(&config.endpoint)
            .query(&query)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if !resp.status().is_success() => {
                tracing::warn!(
                    event = event.name(),
                    status = resp.status().as_u16(),
                    "Analytics collector rejected event"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(event = event.name(), "Analytics delivery failed: {}", e);
            }
        }
    }

    tracing::debug!("Analytics delivery task stopped");
}

/// Measurement Protocol body for one event.
pub fn build_payload(client_id: &str, event: &AnalyticsEvent) -> Value {
    let params: Map<String, Value> = event
        .params()
        .into_iter()
        .map(|(key, value)| {
            let value = serde_json::to_value(value).unwrap_or(Value::Null);
            (key.to_string(), value)
        })
        .collect();

    json!({
        "client_id": client_id,
        "events": [{
            "name": event.name(),
            "params": params,
        }],
    })
}

// =============================================================================
// SINK SELECTION
// =============================================================================

/// Pick the sink for a configuration.
///
/// Remote delivery when the config is active and a runtime is available,
/// structured logging otherwise. The delivery handle is present only for
/// remote delivery and should be finished before the process exits.
pub fn build_sink(
    config: &AnalyticsConfig,
) -> (Arc<dyn AnalyticsSink>, Option<AnalyticsDelivery>) {
    if !config.is_active() {
        tracing::debug!("Remote analytics disabled, logging events only");
        return (Arc::new(TracingSink), None);
    }

    match MeasurementSink::spawn(config.clone()) {
        Ok((sink, delivery)) => {
            tracing::info!(
                "Forwarding analytics to {} ({})",
                config.endpoint,
                config.measurement_id
            );
            (Arc::new(sink), Some(delivery))
        }
        Err(e) => {
            tracing::warn!("Remote analytics unavailable: {}", e);
            (Arc::new(TracingSink), None)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// TEST SUPPORT
// =============================================================================
