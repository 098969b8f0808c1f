//! # talkstart-core
//!
//! The screening logic for talkstart - THE LOGIC.
//!
//! A parent picks an age bracket, answers that bracket's yes/no milestone
//! questions in order, and receives a percentage score bucketed into one of
//! three result tiers with fixed guidance text.
//!
//! ## Components
//!
//! - `catalog`: immutable age groups and milestone questions
//! - `session`: the Welcome → AgeSelection → Screening → Results wizard
//! - `scoring`: percentage, tier and exportable report
//! - `analytics`: event vocabulary and the best-effort sink seam
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no floating point
//! - Rejected actions never mutate a session
//! - Analytics failures never influence session control flow

// =============================================================================
// MODULES
// =============================================================================

pub mod analytics;
pub mod catalog;
pub mod primitives;
pub mod scoring;
pub mod session;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AgeGroup, AgeGroupId, AnalyticsError, CatalogError, Feedback, FeedbackRating, Milestone,
    MilestoneId, Phase, ScreeningError,
};

// =============================================================================
// RE-EXPORTS: Screening Engine
// =============================================================================

pub use analytics::{
    AnalyticsConfig, AnalyticsEvent, AnalyticsSink, NoopSink, ParamValue, RecordingSink,
};
pub use catalog::Catalog;
pub use scoring::{AnswerLine, ResultTier, ScreeningReport, ScreeningScore, percentage};
pub use session::{AnswerOutcome, Progress, ScreeningSession};
