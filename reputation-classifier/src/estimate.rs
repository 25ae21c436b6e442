//! `EstimateSent`.
//!
//! **Testing-only.** The default estimator multiplies the observed failure
//! count by a fixed factor, which couples the denominator to the numerator —
//! the rejection ratio becomes approximately constant by construction and
//! every threshold in [`crate::config::ClassifierConfig`] collapses.
//! Integration with an authoritative "messages attempted" counter from the
//! upstream MTA is a prerequisite for production correctness. This function
//! exists so the Aggregator has *something* to call before that integration
//! lands, not as a production-quality estimator.
use crate::config::ClassifierConfig;

const FAILURE_MULTIPLIER: u64 = 20;

/// Clamp `failures_in_window * 20` to at least `min_volume_for_assessment`,
/// keeping the estimator's known bias reproducible rather than silently
/// different run to run.
#[must_use]
pub fn estimate_sent(failures_in_window: u64, config: &ClassifierConfig) -> u64 {
    (failures_in_window * FAILURE_MULTIPLIER).max(config.min_volume_for_assessment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_minimum_volume_when_failures_are_few() {
        let config = ClassifierConfig::default();
        assert_eq!(estimate_sent(0, &config), config.min_volume_for_assessment);
    }

    #[test]
    fn scales_with_failure_count_above_the_floor() {
        let config = ClassifierConfig::default();
        assert_eq!(estimate_sent(10, &config), 200);
    }
}
