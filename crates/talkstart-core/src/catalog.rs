//! # Screening Catalog
//!
//! The fixed, ordered list of age groups and their milestone questions.
//!
//! The catalog is immutable reference data: it is built once, shared behind an
//! `Arc`, and only ever read. Two invariants hold for every catalog:
//!
//! - every age group has at least one milestone (scoring divides by the count)
//! - milestone ids are unique across all groups, and every milestone's
//!   `age_range` equals its owning group's `range`
//!
//! [`Catalog::standard`] is the compiled-in data set. [`Catalog::from_groups`]
//! accepts operator-supplied data and rejects anything that breaks the
//! invariants.

use crate::primitives::{MAX_AGE_GROUPS, MAX_MILESTONES_PER_GROUP};
use crate::{AgeGroup, AgeGroupId, CatalogError, Milestone, MilestoneId};
use serde::Serialize;
use std::collections::BTreeSet;

/// Read-only collection of age groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    groups: Vec<AgeGroup>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    /// Build a catalog from arbitrary groups, validating every invariant.
    pub fn from_groups(groups: Vec<AgeGroup>) -> Result<Self, CatalogError> {
        validate(&groups)?;
        Ok(Self { groups })
    }

    /// The compiled-in speech milestone catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            groups: vec![
                group(
                    "12-18",
                    "12-18 months",
                    "12-18 months",
                    "👶",
                    &[
                        ("m1", "Says first words like 'mama', 'dada', or 'bye-bye'", "Speech"),
                        ("m2", "Responds to their name when called", "Understanding"),
                        (
                            "m3",
                            "Uses gestures to communicate (pointing, showing, waving)",
                            "Communication",
                        ),
                        ("m4", "Tries to copy sounds and words you say", "Speech"),
                    ],
                ),
                group(
                    "18-24",
                    "18-24 months",
                    "18-24 months",
                    "🧒",
                    &[
                        ("m5", "Says at least 20 different words", "Speech"),
                        (
                            "m6",
                            "Follows simple one-step directions without gestures (e.g., 'get your shoes')",
                            "Understanding",
                        ),
                        (
                            "m7",
                            "Points to body parts or familiar pictures when named",
                            "Understanding",
                        ),
                        ("m8", "Imitates new words and sounds during play", "Speech"),
                    ],
                ),
                group(
                    "24-36",
                    "2-3 years",
                    "24-36 months",
                    "👦",
                    &[
                        ("m9", "Puts 2-3 words together ('want cookie', 'go car')", "Speech"),
                        ("m10", "Has 50+ words in vocabulary", "Speech"),
                        (
                            "m11",
                            "Strangers can understand about half of what they say",
                            "Speech",
                        ),
                        (
                            "m12",
                            "Follows two-step directions like 'get your cup and sit down'",
                            "Understanding",
                        ),
                    ],
                ),
            ],
        }
    }

    /// All age groups in presentation order.
    #[must_use]
    pub fn groups(&self) -> &[AgeGroup] {
        &self.groups
    }

    /// Number of age groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Check whether the catalog has no groups. Never true for a validated catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Look up an age group by id.
    #[must_use]
    pub fn group(&self, id: &AgeGroupId) -> Option<&AgeGroup> {
        self.groups.iter().find(|g| &g.id == id)
    }

    /// Position of an age group within the catalog.
    #[must_use]
    pub fn position(&self, id: &AgeGroupId) -> Option<usize> {
        self.groups.iter().position(|g| &g.id == id)
    }

    /// Age group at a catalog position.
    #[must_use]
    pub fn group_at(&self, index: usize) -> Option<&AgeGroup> {
        self.groups.get(index)
    }

    /// Look up a milestone by id across all groups.
    #[must_use]
    pub fn milestone(&self, id: &MilestoneId) -> Option<&Milestone> {
        self.groups
            .iter()
            .flat_map(|g| g.milestones.iter())
            .find(|m| &m.id == id)
    }
}

/// Build a group whose milestones all share the group's range.
fn group(
    id: &str,
    name: &str,
    range: &str,
    icon: &str,
    milestones: &[(&str, &str, &str)],
) -> AgeGroup {
    AgeGroup {
        id: AgeGroupId::new(id),
        name: name.to_string(),
        range: range.to_string(),
        icon: icon.to_string(),
        milestones: milestones
            .iter()
            .map(|(mid, question, category)| Milestone::new(*mid, *question, range, *category))
            .collect(),
    }
}

fn validate(groups: &[AgeGroup]) -> Result<(), CatalogError> {
    if groups.is_empty() {
        return Err(CatalogError::EmptyCatalog);
    }
    if groups.len() > MAX_AGE_GROUPS {
        return Err(CatalogError::ParseError(format!(
            "{} age groups exceeds maximum {}",
            groups.len(),
            MAX_AGE_GROUPS
        )));
    }

    let mut group_ids = BTreeSet::new();
    let mut milestone_ids = BTreeSet::new();

    for g in groups {
        if !group_ids.insert(&g.id) {
            return Err(CatalogError::DuplicateAgeGroup(g.id.clone()));
        }
        if g.milestones.is_empty() {
            return Err(CatalogError::EmptyAgeGroup(g.id.clone()));
        }
        if g.milestones.len() > MAX_MILESTONES_PER_GROUP {
            return Err(CatalogError::ParseError(format!(
                "Age group {} has {} milestones, maximum is {}",
                g.id,
                g.milestones.len(),
                MAX_MILESTONES_PER_GROUP
            )));
        }

        for m in &g.milestones {
            if !milestone_ids.insert(&m.id) {
                return Err(CatalogError::DuplicateMilestone(m.id.clone()));
            }
            if m.question.trim().is_empty() {
                return Err(CatalogError::EmptyQuestion(m.id.clone()));
            }
            if m.age_range != g.range {
                return Err(CatalogError::AgeRangeMismatch {
                    milestone: m.id.clone(),
                    expected: g.range.clone(),
                    found: m.age_range.clone(),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
