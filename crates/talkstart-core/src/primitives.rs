//! # Primitives
//!
//! Hardcoded runtime constants for the screening core.
//! These are compiled into the binary and are immutable at runtime.

/// Percentage at or above which a screening lands in the Positive tier.
pub const POSITIVE_THRESHOLD: u8 = 80;

/// Percentage at or above which a screening lands in the Caution tier.
///
/// Anything below is Concern.
pub const CAUTION_THRESHOLD: u8 = 60;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length (bytes) of a feedback comment.
pub const MAX_FEEDBACK_COMMENT_LENGTH: usize = 2000;

/// Maximum number of age groups a custom catalog may declare.
pub const MAX_AGE_GROUPS: usize = 64;

/// Maximum number of milestones per age group in a custom catalog.
pub const MAX_MILESTONES_PER_GROUP: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_ordered() {
        assert!(CAUTION_THRESHOLD < POSITIVE_THRESHOLD);
        assert!(POSITIVE_THRESHOLD <= 100);
    }
}
