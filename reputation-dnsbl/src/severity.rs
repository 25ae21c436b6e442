//! Severity derivation: a pure function of the listings set.

use std::collections::BTreeSet;

use reputation_store::model::Severity;

#[must_use]
pub fn derive_severity(listings: &BTreeSet<String>) -> Severity {
    if listings.iter().any(|zone| zone.contains("spamhaus")) {
        return Severity::Critical;
    }
    match listings.len() {
        0 => Severity::None,
        1 => Severity::Low,
        2 => Severity::Medium,
        _ => Severity::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn spamhaus_listing_is_always_critical_regardless_of_count() {
        assert_eq!(derive_severity(&zones(&["zen.spamhaus.org"])), Severity::Critical);
    }

    #[test]
    fn empty_listings_is_none() {
        assert_eq!(derive_severity(&zones(&[])), Severity::None);
    }

    #[test]
    fn one_non_spamhaus_listing_is_low() {
        assert_eq!(derive_severity(&zones(&["bl.spamcop.net"])), Severity::Low);
    }

    #[test]
    fn two_listings_is_medium() {
        assert_eq!(
            derive_severity(&zones(&["bl.spamcop.net", "cbl.abuseat.org"])),
            Severity::Medium
        );
    }

    #[test]
    fn three_or_more_listings_is_high() {
        assert_eq!(
            derive_severity(&zones(&[
                "bl.spamcop.net",
                "cbl.abuseat.org",
                "dronebl.org"
            ])),
            Severity::High
        );
    }
}
