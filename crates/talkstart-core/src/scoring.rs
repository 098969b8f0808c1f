//! # Scoring
//!
//! Percentage scoring and result tiers for a completed screening.
//!
//! ## Tier Definitions
//!
//! | Tier | Percentage | Follow-up suggested |
//! |------|------------|---------------------|
//! | Positive | >= 80 | no |
//! | Caution | 60..80 | yes |
//! | Concern | < 60 | yes |
//!
//! Percentages use integer round-half-up, which agrees with a browser's
//! `Math.round` for ratios in `[0, 1]`.

use crate::primitives::{CAUTION_THRESHOLD, POSITIVE_THRESHOLD};
use crate::{AgeGroup, AgeGroupId, MilestoneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// GUIDANCE TEXT
// =============================================================================

const GUIDANCE_ALWAYS: [&str; 2] = [
    "Continue reading and talking with your child daily",
    "Play interactive games and sing songs together",
];

const GUIDANCE_FOLLOW_UP: [&str; 2] = [
    "Consider discussing results with your pediatrician",
    "Look into early intervention services if recommended",
];

const GUIDANCE_RESCREEN: &str = "Re-screen in 3-6 months to track progress";

// =============================================================================
// PERCENTAGE
// =============================================================================

/// `round(achieved / total * 100)` with halves rounded up, in integers.
///
/// Returns 0 when `total` is zero; a validated catalog never produces that.
#[must_use]
pub fn percentage(achieved: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let achieved = achieved.min(total) as u64;
    let total = total as u64;
    (achieved.saturating_mul(200).saturating_add(total) / total.saturating_mul(2)) as u8
}

// =============================================================================
// RESULT TIER
// =============================================================================

/// Qualitative bucket for a final percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTier {
    /// Meeting most milestones.
    Positive,
    /// Meeting some milestones.
    Caution,
    /// Consider professional evaluation.
    Concern,
}

impl ResultTier {
    /// Pick the tier for a percentage.
    #[must_use]
    pub fn from_percentage(percentage: u8) -> Self {
        if percentage >= POSITIVE_THRESHOLD {
            ResultTier::Positive
        } else if percentage >= CAUTION_THRESHOLD {
            ResultTier::Caution
        } else {
            ResultTier::Concern
        }
    }

    /// Heading shown with the result.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            ResultTier::Positive => "Great Development!",
            ResultTier::Caution => "Some Concerns",
            ResultTier::Concern => "Consider Professional Help",
        }
    }

    /// Body text shown with the result.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            ResultTier::Positive => {
                "Your child appears to be meeting most speech milestones for their age. Keep encouraging their communication!"
            }
            ResultTier::Caution => {
                "Your child is meeting some milestones but may benefit from additional support or evaluation."
            }
            ResultTier::Concern => {
                "Your child may benefit from a professional speech evaluation. Early intervention can be very helpful."
            }
        }
    }

    /// Whether the pediatrician / early-intervention bullets apply.
    #[must_use]
    pub fn suggests_follow_up(&self) -> bool {
        !matches!(self, ResultTier::Positive)
    }

    /// "What's Next?" bullets, in display order.
    #[must_use]
    pub fn guidance(&self) -> Vec<&'static str> {
        let mut items: Vec<&'static str> = GUIDANCE_ALWAYS.to_vec();
        if self.suggests_follow_up() {
            items.extend(GUIDANCE_FOLLOW_UP);
        }
        items.push(GUIDANCE_RESCREEN);
        items
    }
}

impl std::fmt::Display for ResultTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self, self.title())
    }
}

// =============================================================================
// SCORE
// =============================================================================

/// Raw score of a screening pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningScore {
    /// Number of milestones answered "yes".
    pub achieved: usize,
    /// Number of milestones in the age group.
    pub total: usize,
    /// `achieved / total` as a rounded percentage in `0..=100`.
    pub percentage: u8,
}

impl ScreeningScore {
    /// Score the answers recorded for a group.
    ///
    /// Only `true` answers to milestones of `group` count.
    #[must_use]
    pub fn compute(group: &AgeGroup, answers: &BTreeMap<MilestoneId, bool>) -> Self {
        let total = group.total();
        let achieved = group
            .milestones
            .iter()
            .filter(|m| answers.get(&m.id).copied().unwrap_or(false))
            .count();

        Self {
            achieved,
            total,
            percentage: percentage(achieved, total),
        }
    }

    /// Tier for this score.
    #[must_use]
    pub fn tier(&self) -> ResultTier {
        ResultTier::from_percentage(self.percentage)
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// One answered question, as exported with a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLine {
    pub milestone_id: MilestoneId,
    pub question: String,
    pub category: String,
    pub answer: bool,
}

/// Exportable summary of a finished screening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningReport {
    pub age_group_id: AgeGroupId,
    pub age_group_name: String,
    pub age_range: String,
    pub score: ScreeningScore,
    pub tier: ResultTier,
    pub title: String,
    pub message: String,
    pub suggest_follow_up: bool,
    pub guidance: Vec<String>,
    pub answers: Vec<AnswerLine>,
}

impl ScreeningReport {
    /// Build the report for a group and its answers.
    #[must_use]
    pub fn build(group: &AgeGroup, answers: &BTreeMap<MilestoneId, bool>) -> Self {
        let score = ScreeningScore::compute(group, answers);
        let tier = score.tier();

        let answers = group
            .milestones
            .iter()
            .filter_map(|m| {
                answers.get(&m.id).map(|&answer| AnswerLine {
                    milestone_id: m.id.clone(),
                    question: m.question.clone(),
                    category: m.category.clone(),
                    answer,
                })
            })
            .collect();

        Self {
            age_group_id: group.id.clone(),
            age_group_name: group.name.clone(),
            age_range: group.range.clone(),
            score,
            tier,
            title: tier.title().to_string(),
            message: tier.message().to_string(),
            suggest_follow_up: tier.suggests_follow_up(),
            guidance: tier.guidance().into_iter().map(String::from).collect(),
            answers,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
