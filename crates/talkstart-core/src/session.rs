//! # Session Module
//!
//! The screening wizard: a linear state machine over one catalog.
//!
//! ```text
//! Welcome --begin--> AgeSelection --choose_age_group--> Screening --answer (last)--> Results
//!    ^                   |                                 | answer (not last)          |
//!    +-------back--------+                                 +--> Screening               |
//!    +------------------------------restart-----------------------------------------+
//! ```
//!
//! Every action either completes fully (state change, scoring, analytics
//! notification) or is rejected with a [`ScreeningError`] and leaves the
//! session untouched. There is no way to move backward within Screening.
//!
//! Session state is volatile: nothing here is persisted, and `restart` wipes
//! the selection, answers, question pointer and feedback.

use crate::analytics::{AnalyticsEvent, AnalyticsSink, NoopSink};
use crate::primitives::MAX_FEEDBACK_COMMENT_LENGTH;
use crate::scoring::{ResultTier, ScreeningReport, ScreeningScore};
use crate::{
    AgeGroup, AgeGroupId, Catalog, Feedback, FeedbackRating, Milestone, MilestoneId, Phase,
    ScreeningError,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of an accepted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// More questions remain; `question_index` is the new current question.
    Next { question_index: usize },
    /// The last question was answered and the session is in Results.
    Completed { score: ScreeningScore },
}

/// Position within the current screening pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Questions answered so far.
    pub answered: usize,
    /// Questions in the selected group.
    pub total: usize,
    /// `answered / total` as a whole percentage, rounded down.
    pub percent: u8,
}

/// One screening attempt.
///
/// The catalog is shared, not owned; `selected` is an index into it.
pub struct ScreeningSession {
    catalog: Arc<Catalog>,
    sink: Arc<dyn AnalyticsSink>,
    phase: Phase,
    selected: Option<usize>,
    answers: BTreeMap<MilestoneId, bool>,
    question_index: usize,
    feedback: Option<Feedback>,
}

impl std::fmt::Debug for ScreeningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreeningSession")
            .field("phase", &self.phase)
            .field("selected", &self.selected)
            .field("answers", &self.answers)
            .field("question_index", &self.question_index)
            .field("feedback", &self.feedback)
            .finish_non_exhaustive()
    }
}

impl Default for ScreeningSession {
    fn default() -> Self {
        Self::new(Arc::new(Catalog::standard()), Arc::new(NoopSink))
    }
}

impl ScreeningSession {
    /// Create a fresh session in the Welcome phase.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, sink: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            catalog,
            sink,
            phase: Phase::Welcome,
            selected: None,
            answers: BTreeMap::new(),
            question_index: 0,
            feedback: None,
        }
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Welcome -> AgeSelection.
    pub fn begin(&mut self) -> Result<(), ScreeningError> {
        self.require(Phase::Welcome, "begin")?;
        self.phase = Phase::AgeSelection;
        Ok(())
    }

    /// AgeSelection -> Welcome.
    pub fn back(&mut self) -> Result<(), ScreeningError> {
        self.require(Phase::AgeSelection, "go back")?;
        self.phase = Phase::Welcome;
        self.notify(AnalyticsEvent::GoBack {
            from_step: Phase::AgeSelection.name().to_string(),
        });
        Ok(())
    }

    /// AgeSelection -> Screening for the given group.
    pub fn choose_age_group(&mut self, id: &AgeGroupId) -> Result<(), ScreeningError> {
        self.require(Phase::AgeSelection, "choose an age group")?;
        let index = self
            .catalog
            .position(id)
            .ok_or_else(|| ScreeningError::InvalidSelection(id.clone()))?;

        self.selected = Some(index);
        self.answers.clear();
        self.question_index = 0;
        self.phase = Phase::Screening;

        let name = self.group_name();
        self.notify(AnalyticsEvent::SelectAgeGroup {
            age_group: name.clone(),
        });
        self.notify(AnalyticsEvent::StartScreening { age_group: name });
        Ok(())
    }

    /// Record the answer to the current question.
    ///
    /// `milestone_id` must be the id of [`Self::current_milestone`].
    pub fn answer(
        &mut self,
        milestone_id: &MilestoneId,
        value: bool,
    ) -> Result<AnswerOutcome, ScreeningError> {
        let catalog = Arc::clone(&self.catalog);
        let selected = self.selected.and_then(|i| catalog.group_at(i));
        let (group, expected) = match (self.phase, selected) {
            (Phase::Screening, Some(g)) => match g.milestones.get(self.question_index) {
                Some(m) => (g, &m.id),
                None => {
                    return Err(ScreeningError::OutOfSequenceAnswer {
                        expected: None,
                        got: milestone_id.clone(),
                    });
                }
            },
            _ => {
                return Err(ScreeningError::OutOfSequenceAnswer {
                    expected: None,
                    got: milestone_id.clone(),
                });
            }
        };
        if expected != milestone_id {
            return Err(ScreeningError::OutOfSequenceAnswer {
                expected: Some(expected.clone()),
                got: milestone_id.clone(),
            });
        }

        self.answers.insert(expected.clone(), value);
        self.notify(AnalyticsEvent::AnswerQuestion {
            milestone_id: milestone_id.as_str().to_string(),
            answer: value,
        });

        if self.question_index.saturating_add(1) < group.total() {
            self.question_index = self.question_index.saturating_add(1);
            return Ok(AnswerOutcome::Next {
                question_index: self.question_index,
            });
        }

        self.phase = Phase::Results;
        let score = ScreeningScore::compute(group, &self.answers);
        self.notify(AnalyticsEvent::CompleteScreening {
            age_group: group.name.clone(),
            score: score.achieved,
            percentage: score.percentage,
        });
        Ok(AnswerOutcome::Completed { score })
    }

    /// Results -> Welcome, clearing all session state.
    pub fn restart(&mut self) -> Result<(), ScreeningError> {
        self.require(Phase::Results, "restart")?;
        self.phase = Phase::Welcome;
        self.selected = None;
        self.answers.clear();
        self.question_index = 0;
        self.feedback = None;
        self.notify(AnalyticsEvent::RestartScreening);
        Ok(())
    }

    /// Export the results. Does not change state; may be called repeatedly.
    pub fn save_results(&self) -> Result<ScreeningReport, ScreeningError> {
        self.require(Phase::Results, "save results")?;
        let report = self.report().ok_or(ScreeningError::InvalidTransition {
            phase: self.phase,
            action: "save results",
        })?;
        self.notify(AnalyticsEvent::SaveResults {
            age_group: report.age_group_name.clone(),
            percentage: report.score.percentage,
        });
        Ok(report)
    }

    /// Leave feedback on the results. Once per pass.
    pub fn submit_feedback(
        &mut self,
        rating: FeedbackRating,
        comment: impl Into<String>,
    ) -> Result<(), ScreeningError> {
        self.require(Phase::Results, "submit feedback")?;
        if self.feedback.is_some() {
            return Err(ScreeningError::FeedbackAlreadySubmitted);
        }

        let comment = comment.into().trim().to_string();
        if comment.len() > MAX_FEEDBACK_COMMENT_LENGTH {
            return Err(ScreeningError::InvalidFeedback(format!(
                "Comment length {} exceeds maximum {} bytes",
                comment.len(),
                MAX_FEEDBACK_COMMENT_LENGTH
            )));
        }

        self.notify(AnalyticsEvent::ProvideFeedback {
            rating: rating.score(),
            comment: comment.clone(),
        });
        self.feedback = Some(Feedback { rating, comment });
        Ok(())
    }

    // =========================================================================
    // READ ACCESSORS
    // =========================================================================

    /// The catalog this session screens against.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Selected age group, present from Screening on.
    #[must_use]
    pub fn selected_age_group(&self) -> Option<&AgeGroup> {
        self.selected.and_then(|i| self.catalog.group_at(i))
    }

    /// Current question while in Screening.
    #[must_use]
    pub fn current_milestone(&self) -> Option<&Milestone> {
        if self.phase != Phase::Screening {
            return None;
        }
        self.selected_age_group()
            .and_then(|g| g.milestones.get(self.question_index))
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<MilestoneId, bool> {
        &self.answers
    }

    #[must_use]
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Progress through the selected group, while in Screening or Results.
    #[must_use]
    pub fn progress(&self) -> Option<Progress> {
        let group = self.selected_age_group()?;
        let total = group.total();
        let answered = self.answers.len().min(total);
        let percent = if total > 0 {
            (answered.saturating_mul(100) / total) as u8
        } else {
            0
        };
        Some(Progress {
            answered,
            total,
            percent,
        })
    }

    /// Final score, available in Results.
    #[must_use]
    pub fn score(&self) -> Option<ScreeningScore> {
        if self.phase != Phase::Results {
            return None;
        }
        self.compute_score()
    }

    /// Final tier, available in Results.
    #[must_use]
    pub fn tier(&self) -> Option<ResultTier> {
        self.score().map(|s| s.tier())
    }

    /// Full report, available in Results.
    #[must_use]
    pub fn report(&self) -> Option<ScreeningReport> {
        if self.phase != Phase::Results {
            return None;
        }
        self.selected_age_group()
            .map(|g| ScreeningReport::build(g, &self.answers))
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn require(&self, phase: Phase, action: &'static str) -> Result<(), ScreeningError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ScreeningError::InvalidTransition {
                phase: self.phase,
                action,
            })
        }
    }

    fn compute_score(&self) -> Option<ScreeningScore> {
        self.selected_age_group()
            .map(|g| ScreeningScore::compute(g, &self.answers))
    }

    fn group_name(&self) -> String {
        self.selected_age_group()
            .map(|g| g.name.clone())
            .unwrap_or_default()
    }

    /// Hand an event to the sink. Delivery failures are not our concern.
    fn notify(&self, event: AnalyticsEvent) {
        let _ = self.sink.record(&event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::RecordingSink;

    fn session_with_sink() -> (ScreeningSession, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let session = ScreeningSession::new(Arc::new(Catalog::standard()), sink.clone());
        (session, sink)
    }

    fn start(session: &mut ScreeningSession, group: &str) {
        session.begin().expect("begin");
        session
            .choose_age_group(&AgeGroupId::new(group))
            .expect("choose");
    }

    #[test]
    fn new_session_is_welcome() {
        let session = ScreeningSession::default();
        assert_eq!(session.phase(), Phase::Welcome);
        assert!(session.selected_age_group().is_none());
        assert!(session.current_milestone().is_none());
        assert!(session.progress().is_none());
    }

    #[test]
    fn begin_only_from_welcome() {
        let mut session = ScreeningSession::default();
        session.begin().expect("begin");
        assert_eq!(
            session.begin(),
            Err(ScreeningError::InvalidTransition {
                phase: Phase::AgeSelection,
                action: "begin",
            })
        );
    }

    #[test]
    fn back_returns_to_welcome_and_notifies() {
        let (mut session, sink) = session_with_sink();
        session.begin().expect("begin");
        session.back().expect("back");
        assert_eq!(session.phase(), Phase::Welcome);
        assert_eq!(
            sink.events(),
            vec![AnalyticsEvent::GoBack {
                from_step: "age-selection".to_string()
            }]
        );
    }

    #[test]
    fn unknown_group_is_rejected_without_transition() {
        let mut session = ScreeningSession::default();
        session.begin().expect("begin");
        let err = session
            .choose_age_group(&AgeGroupId::new("48-60"))
            .expect_err("unknown group");
        assert_eq!(err, ScreeningError::InvalidSelection(AgeGroupId::new("48-60")));
        assert_eq!(session.phase(), Phase::AgeSelection);
        assert!(session.selected_age_group().is_none());
    }

    #[test]
    fn choosing_group_starts_screening() {
        let (mut session, sink) = session_with_sink();
        start(&mut session, "18-24");
        assert_eq!(session.phase(), Phase::Screening);
        assert_eq!(session.question_index(), 0);
        assert_eq!(
            session.current_milestone().map(|m| m.id.as_str()),
            Some("m5")
        );
        assert_eq!(sink.names(), vec!["select_age_group", "start_screening"]);
    }

    #[test]
    fn wrong_milestone_is_rejected() {
        let mut session = ScreeningSession::default();
        start(&mut session, "12-18");
        let err = session
            .answer(&MilestoneId::new("m2"), true)
            .expect_err("out of sequence");
        assert_eq!(
            err,
            ScreeningError::OutOfSequenceAnswer {
                expected: Some(MilestoneId::new("m1")),
                got: MilestoneId::new("m2"),
            }
        );
        assert!(session.answers().is_empty());
        assert_eq!(session.question_index(), 0);
    }

    #[test]
    fn answer_outside_screening_is_rejected() {
        let mut session = ScreeningSession::default();
        assert!(matches!(
            session.answer(&MilestoneId::new("m1"), true),
            Err(ScreeningError::OutOfSequenceAnswer { expected: None, .. })
        ));
    }

    #[test]
    fn mixed_answers_score_caution() {
        let (mut session, sink) = session_with_sink();
        start(&mut session, "12-18");

        let outcome = session.answer(&MilestoneId::new("m1"), true).expect("m1");
        assert_eq!(outcome, AnswerOutcome::Next { question_index: 1 });
        session.answer(&MilestoneId::new("m2"), true).expect("m2");
        session.answer(&MilestoneId::new("m3"), false).expect("m3");
        let outcome = session.answer(&MilestoneId::new("m4"), true).expect("m4");

        let expected = ScreeningScore {
            achieved: 3,
            total: 4,
            percentage: 75,
        };
        assert_eq!(outcome, AnswerOutcome::Completed { score: expected });
        assert_eq!(session.phase(), Phase::Results);
        assert_eq!(session.tier(), Some(ResultTier::Caution));
        assert_eq!(
            sink.events().last(),
            Some(&AnalyticsEvent::CompleteScreening {
                age_group: "12-18 months".to_string(),
                score: 3,
                percentage: 75,
            })
        );
    }

    #[test]
    fn completion_score_counts_final_answer() {
        let (mut session, sink) = session_with_sink();
        start(&mut session, "12-18");
        for id in ["m1", "m2", "m3"] {
            session.answer(&MilestoneId::new(id), false).expect("answer");
        }

        let outcome = session.answer(&MilestoneId::new("m4"), true).expect("answer");

        let score = session.score().expect("score");
        assert_eq!((score.achieved, score.total, score.percentage), (1, 4, 25));
        assert_eq!(outcome, AnswerOutcome::Completed { score });
        assert!(matches!(
            sink.events().last(),
            Some(AnalyticsEvent::CompleteScreening { score: 1, percentage: 25, .. })
        ));
    }

    #[test]
    fn progress_tracks_answers() {
        let mut session = ScreeningSession::default();
        start(&mut session, "24-36");
        session.answer(&MilestoneId::new("m9"), true).expect("m9");
        let progress = session.progress().expect("progress");
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.total, 4);
        assert_eq!(progress.percent, 25);
    }

    #[test]
    fn feedback_once_per_pass() {
        let (mut session, sink) = session_with_sink();
        assert!(matches!(
            session.submit_feedback(FeedbackRating::Helpful, ""),
            Err(ScreeningError::InvalidTransition { .. })
        ));

        start(&mut session, "12-18");
        for id in ["m1", "m2", "m3", "m4"] {
            session.answer(&MilestoneId::new(id), true).expect("answer");
        }
        session
            .submit_feedback(FeedbackRating::Helpful, "  clear questions ")
            .expect("feedback");
        assert_eq!(
            session.feedback().map(|f| f.comment.as_str()),
            Some("clear questions")
        );
        assert_eq!(
            session.submit_feedback(FeedbackRating::NotHelpful, ""),
            Err(ScreeningError::FeedbackAlreadySubmitted)
        );
        assert_eq!(sink.names().last(), Some(&"provide_feedback"));

        session.restart().expect("restart");
        assert!(session.feedback().is_none());
    }

    #[test]
    fn oversized_feedback_rejected() {
        let mut session = ScreeningSession::default();
        start(&mut session, "12-18");
        for id in ["m1", "m2", "m3", "m4"] {
            session.answer(&MilestoneId::new(id), false).expect("answer");
        }
        let comment = "x".repeat(MAX_FEEDBACK_COMMENT_LENGTH + 1);
        assert!(matches!(
            session.submit_feedback(FeedbackRating::NotHelpful, comment),
            Err(ScreeningError::InvalidFeedback(_))
        ));
        assert!(session.feedback().is_none());
    }

    #[test]
    fn restart_only_from_results() {
        let mut session = ScreeningSession::default();
        start(&mut session, "12-18");
        assert!(matches!(
            session.restart(),
            Err(ScreeningError::InvalidTransition {
                phase: Phase::Screening,
                ..
            })
        ));
    }
}
