//! # Core Type Definitions
//!
//! This module contains the shared types of the screening core:
//! - Identifiers (`MilestoneId`, `AgeGroupId`)
//! - Reference data (`Milestone`, `AgeGroup`)
//! - Wizard state (`Phase`, `Feedback`, `FeedbackRating`)
//! - Error types (`ScreeningError`, `CatalogError`, `AnalyticsError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they key a `BTreeMap`

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Stable identifier of a milestone question, unique across the catalog.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(pub String);

impl MilestoneId {
    /// Create a new milestone id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of an age group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeGroupId(pub String);

impl AgeGroupId {
    /// Create a new age group id.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgeGroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// One yes/no developmental-behaviour question tied to an age bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    /// Prompt shown to the parent. Never empty.
    pub question: String,
    /// Label of the owning bracket; always equals `AgeGroup::range`.
    pub age_range: String,
    /// Free-text classification ("Speech", "Understanding", ...).
    pub category: String,
}

impl Milestone {
    /// Create a new milestone.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        age_range: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: MilestoneId::new(id),
            question: question.into(),
            age_range: age_range.into(),
            category: category.into(),
        }
    }
}

/// A named age bracket with its ordered list of milestones.
///
/// Milestone order is the presentation order of the questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroup {
    pub id: AgeGroupId,
    pub name: String,
    pub range: String,
    /// Display glyph. Carries no behaviour.
    #[serde(default)]
    pub icon: String,
    pub milestones: Vec<Milestone>,
}

impl AgeGroup {
    /// Number of milestones in this group.
    #[must_use]
    pub fn total(&self) -> usize {
        self.milestones.len()
    }

    /// Check whether a milestone id belongs to this group.
    #[must_use]
    pub fn contains(&self, id: &MilestoneId) -> bool {
        self.milestones.iter().any(|m| &m.id == id)
    }
}

// =============================================================================
// WIZARD STATE
// =============================================================================

/// The wizard's current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Welcome,
    AgeSelection,
    Screening,
    Results,
}

impl Phase {
    /// Step name, as used in analytics labels.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Welcome => "welcome",
            Phase::AgeSelection => "age-selection",
            Phase::Screening => "screening",
            Phase::Results => "results",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Thumbs up / thumbs down on the usefulness of a screening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    Helpful,
    NotHelpful,
}

impl FeedbackRating {
    /// Numeric rating reported to analytics (5 = helpful, 1 = not helpful).
    #[must_use]
    pub const fn score(self) -> u8 {
        match self {
            FeedbackRating::Helpful => 5,
            FeedbackRating::NotHelpful => 1,
        }
    }
}

/// Feedback left on the results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: FeedbackRating,
    pub comment: String,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Precondition violations of the screening state machine.
///
/// A rejected call never mutates the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScreeningError {
    /// The requested age group does not exist in the catalog.
    #[error("Unknown age group: {0}")]
    InvalidSelection(AgeGroupId),

    /// An answer was given for a milestone other than the current question.
    #[error("Out of sequence answer for {got}, expected {}", .expected.as_ref().map_or("no question", MilestoneId::as_str))]
    OutOfSequenceAnswer {
        expected: Option<MilestoneId>,
        got: MilestoneId,
    },

    /// The action is not defined in the current phase.
    #[error("Cannot {action} while in {phase}")]
    InvalidTransition { phase: Phase, action: &'static str },

    /// Feedback was already recorded for this pass.
    #[error("Feedback already submitted")]
    FeedbackAlreadySubmitted,

    /// Feedback payload rejected.
    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),
}

/// Data-integrity errors in catalog reference data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Catalog has no age groups")]
    EmptyCatalog,

    /// A group without milestones would make scoring undefined.
    #[error("Age group {0} has no milestones")]
    EmptyAgeGroup(AgeGroupId),

    #[error("Duplicate age group id: {0}")]
    DuplicateAgeGroup(AgeGroupId),

    #[error("Duplicate milestone id: {0}")]
    DuplicateMilestone(MilestoneId),

    #[error("Milestone {milestone} has age range {found:?}, group expects {expected:?}")]
    AgeRangeMismatch {
        milestone: MilestoneId,
        expected: String,
        found: String,
    },

    #[error("Milestone {0} has an empty question")]
    EmptyQuestion(MilestoneId),

    #[error("Catalog parse error: {0}")]
    ParseError(String),
}

/// Failure reported by an analytics sink. Never reaches session control flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("Analytics sink unavailable")]
    Unavailable,

    #[error("Analytics delivery failed: {0}")]
    Delivery(String),
}

// =============================================================================
// TESTS
// =============================================================================
