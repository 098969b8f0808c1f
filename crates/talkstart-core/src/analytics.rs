//! # Analytics Seam
//!
//! Event vocabulary emitted by a screening session, and the sink trait that
//! receives it.
//!
//! Delivery is best-effort. The session hands each event to its sink and
//! discards whatever the sink returns, so a failing or absent collector can
//! never change the course of a screening.
//!
//! Concrete network sinks live outside the core; this module only provides
//! [`NoopSink`] and the in-memory [`RecordingSink`].

use crate::AnalyticsError;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Settings handed to an analytics sink at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Master switch for remote delivery.
    pub enabled: bool,
    /// Measurement (property) identifier of the remote collector.
    pub measurement_id: String,
    /// Secret paired with the measurement id, if the collector requires one.
    pub api_secret: Option<String>,
    /// Collector endpoint.
    pub endpoint: String,
    /// Pseudonymous client identifier reported with every event.
    pub client_id: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            measurement_id: String::new(),
            api_secret: None,
            endpoint: "https://www.google-analytics.com/mp/collect".to_string(),
            client_id: "talkstart".to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Remote delivery is possible only when enabled and identified.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && !self.measurement_id.trim().is_empty()
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// A parameter value attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

/// Named events fired at each user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    SelectAgeGroup {
        age_group: String,
    },
    StartScreening {
        age_group: String,
    },
    AnswerQuestion {
        milestone_id: String,
        answer: bool,
    },
    CompleteScreening {
        age_group: String,
        score: usize,
        percentage: u8,
    },
    SaveResults {
        age_group: String,
        percentage: u8,
    },
    RestartScreening,
    GoBack {
        from_step: String,
    },
    ProvideFeedback {
        rating: u8,
        comment: String,
    },
}

impl AnalyticsEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::SelectAgeGroup { .. } => "select_age_group",
            AnalyticsEvent::StartScreening { .. } => "start_screening",
            AnalyticsEvent::AnswerQuestion { .. } => "answer_question",
            AnalyticsEvent::CompleteScreening { .. } => "complete_screening",
            AnalyticsEvent::SaveResults { .. } => "save_results",
            AnalyticsEvent::RestartScreening => "restart_screening",
            AnalyticsEvent::GoBack { .. } => "go_back",
            AnalyticsEvent::ProvideFeedback { .. } => "provide_feedback",
        }
    }

    /// Event category: navigation vs. screening progress.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            AnalyticsEvent::SelectAgeGroup { .. } | AnalyticsEvent::GoBack { .. } => "navigation",
            AnalyticsEvent::ProvideFeedback { .. } => "feedback",
            _ => "screening",
        }
    }

    /// Short label identifying the subject of the event.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            AnalyticsEvent::SelectAgeGroup { age_group }
            | AnalyticsEvent::StartScreening { age_group }
            | AnalyticsEvent::CompleteScreening { age_group, .. }
            | AnalyticsEvent::SaveResults { age_group, .. } => Some(age_group.as_str()),
            AnalyticsEvent::AnswerQuestion { milestone_id, .. } => Some(milestone_id.as_str()),
            AnalyticsEvent::GoBack { from_step } => Some(from_step.as_str()),
            AnalyticsEvent::RestartScreening | AnalyticsEvent::ProvideFeedback { .. } => None,
        }
    }

    /// Numeric headline value, where the event has one.
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        match self {
            AnalyticsEvent::CompleteScreening { percentage, .. }
            | AnalyticsEvent::SaveResults { percentage, .. } => Some(i64::from(*percentage)),
            AnalyticsEvent::ProvideFeedback { rating, .. } => Some(i64::from(*rating)),
            _ => None,
        }
    }

    /// Flat parameter list, including category, label and value.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, ParamValue)> {
        let mut params = vec![(
            "event_category",
            ParamValue::Text(self.category().to_string()),
        )];
        if let Some(label) = self.label() {
            params.push(("event_label", ParamValue::Text(label.to_string())));
        }
        if let Some(value) = self.value() {
            params.push(("value", ParamValue::Number(value)));
        }

        match self {
            AnalyticsEvent::AnswerQuestion { answer, .. } => {
                let text = if *answer { "yes" } else { "no" };
                params.push(("answer", ParamValue::Text(text.to_string())));
            }
            AnalyticsEvent::CompleteScreening {
                score, percentage, ..
            } => {
                params.push(("score", ParamValue::Number(*score as i64)));
                params.push(("percentage", ParamValue::Number(i64::from(*percentage))));
            }
            AnalyticsEvent::ProvideFeedback { rating, comment } => {
                params.push(("rating", ParamValue::Number(i64::from(*rating))));
                params.push(("comment", ParamValue::Text(comment.clone())));
            }
            _ => {}
        }

        params
    }
}

// =============================================================================
// SINKS
// =============================================================================

/// Fire-and-forget receiver of analytics events.
///
/// Implementations must return promptly and must not panic. Errors are
/// reported for the sink's own bookkeeping; the session ignores them.
pub trait AnalyticsSink: Send + Sync {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn record(&self, _event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        Ok(())
    }
}

/// Sink that keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Names of the recorded events, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnalyticsEvent::name).collect()
    }
}

impl AnalyticsSink for RecordingSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.events
            .lock()
            .map_err(|_| AnalyticsError::Unavailable)?
            .push(event.clone());
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_event_params() {
        let event = AnalyticsEvent::AnswerQuestion {
            milestone_id: "m3".to_string(),
            answer: false,
        };
        assert_eq!(event.name(), "answer_question");
        assert_eq!(event.category(), "screening");
        assert_eq!(event.label(), Some("m3"));

        let params = event.params();
        assert!(params.contains(&("answer", ParamValue::Text("no".to_string()))));
        assert!(params.iter().all(|(k, _)| *k != "value"));
    }

    #[test]
    fn complete_event_carries_score_and_percentage() {
        let event = AnalyticsEvent::CompleteScreening {
            age_group: "12-18 months".to_string(),
            score: 3,
            percentage: 75,
        };
        let params = event.params();
        assert!(params.contains(&("value", ParamValue::Number(75))));
        assert!(params.contains(&("score", ParamValue::Number(3))));
        assert!(params.contains(&("event_label", ParamValue::Text("12-18 months".to_string()))));
    }

    #[test]
    fn navigation_events_are_categorized() {
        let back = AnalyticsEvent::GoBack {
            from_step: "age-selection".to_string(),
        };
        assert_eq!(back.category(), "navigation");
        assert_eq!(AnalyticsEvent::RestartScreening.category(), "screening");
        assert_eq!(AnalyticsEvent::RestartScreening.label(), None);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.record(&AnalyticsEvent::RestartScreening).expect("record");
        sink.record(&AnalyticsEvent::GoBack {
            from_step: "age-selection".to_string(),
        })
        .expect("record");
        assert_eq!(sink.names(), vec!["restart_screening", "go_back"]);
    }

    #[test]
    fn config_requires_measurement_id() {
        let mut config = AnalyticsConfig {
            enabled: true,
            ..AnalyticsConfig::default()
        };
        assert!(!config.is_active());
        config.measurement_id = "G-TEST".to_string();
        assert!(config.is_active());
    }

    #[test]
    fn event_serializes_with_tag() {
        let json = serde_json::to_value(AnalyticsEvent::SaveResults {
            age_group: "2-3 years".to_string(),
            percentage: 50,
        })
        .expect("serialize");
        assert_eq!(json["event"], "save_results");
        assert_eq!(json["percentage"], 50);
    }
}
