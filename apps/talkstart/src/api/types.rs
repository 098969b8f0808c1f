//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use talkstart_core::{
    AgeGroup, FeedbackRating, MilestoneId, Phase, Progress, ResultTier, ScreeningReport,
    ScreeningScore, ScreeningSession,
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// CATALOG RESPONSE
// =============================================================================

/// Age groups and their questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub groups: Vec<AgeGroup>,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Choose an age group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    pub age_group_id: String,
}

/// Answer the current question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub milestone_id: String,
    pub value: bool,
}

/// Feedback on the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub rating: FeedbackRating,
    #[serde(default)]
    pub comment: String,
}

// =============================================================================
// SESSION VIEW
// =============================================================================

/// Summary of the selected age group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroupSummary {
    pub id: String,
    pub name: String,
    pub range: String,
}

/// The question currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub milestone_id: String,
    pub question: String,
    pub category: String,
    /// 1-based position within the group.
    pub number: usize,
    pub total: usize,
}

/// Result text for a finished screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub score: ScreeningScore,
    pub tier: ResultTier,
    pub title: String,
    pub message: String,
    pub suggest_follow_up: bool,
    pub guidance: Vec<String>,
}

/// Everything a client needs to render one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: u64,
    pub phase: Phase,
    pub age_group: Option<AgeGroupSummary>,
    pub current_question: Option<QuestionView>,
    pub progress: Option<Progress>,
    pub answers: BTreeMap<MilestoneId, bool>,
    pub result: Option<ResultView>,
    pub feedback_submitted: bool,
}

impl SessionView {
    /// Snapshot a session.
    pub fn from_session(id: u64, session: &ScreeningSession) -> Self {
        let group = session.selected_age_group();
        let total = group.map_or(0, |g| g.total());

        let current_question = session.current_milestone().map(|m| QuestionView {
            milestone_id: m.id.as_str().to_string(),
            question: m.question.clone(),
            category: m.category.clone(),
            number: session.question_index().saturating_add(1),
            total,
        });

        let result = session.report().map(|r| ResultView {
            score: r.score,
            tier: r.tier,
            title: r.title,
            message: r.message,
            suggest_follow_up: r.suggest_follow_up,
            guidance: r.guidance,
        });

        Self {
            id,
            phase: session.phase(),
            age_group: group.map(|g| AgeGroupSummary {
                id: g.id.as_str().to_string(),
                name: g.name.clone(),
                range: g.range.clone(),
            }),
            current_question,
            progress: session.progress(),
            answers: session.answers().clone(),
            result,
            feedback_submitted: session.feedback().is_some(),
        }
    }
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Response for every session endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub success: bool,
    pub session: Option<SessionView>,
    pub error: Option<String>,
}

impl SessionResponse {
    pub fn success(session: SessionView) -> Self {
        Self {
            success: true,
            session: Some(session),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            session: None,
            error: Some(msg.into()),
        }
    }
}

/// Response for the save endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub success: bool,
    pub report: Option<ScreeningReport>,
    pub error: Option<String>,
}

impl SaveResponse {
    pub fn success(report: ScreeningReport) -> Self {
        Self {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use talkstart_core::AgeGroupId;

    #[test]
    fn welcome_view_is_empty() {
        let view = SessionView::from_session(7, &ScreeningSession::default());
        assert_eq!(view.id, 7);
        assert_eq!(view.phase, Phase::Welcome);
        assert!(view.age_group.is_none());
        assert!(view.current_question.is_none());
        assert!(view.result.is_none());
    }

    #[test]
    fn screening_view_shows_question() {
        let mut session = ScreeningSession::default();
        session.begin().expect("begin");
        session
            .choose_age_group(&AgeGroupId::new("18-24"))
            .expect("choose");
        let view = SessionView::from_session(1, &session);
        let q = view.current_question.expect("question");
        assert_eq!(q.milestone_id, "m5");
        assert_eq!((q.number, q.total), (1, 4));
        assert_eq!(view.progress.map(|p| p.percent), Some(0));
    }

    #[test]
    fn feedback_request_comment_optional() {
        let req: FeedbackRequest =
            serde_json::from_str(r#"{"rating": "not_helpful"}"#).expect("parse");
        assert_eq!(req.rating, FeedbackRating::NotHelpful);
        assert!(req.comment.is_empty());
    }
}
