//! The closed major-provider set — used by the Classifier as a signal
//! amplifier, not as a general-purpose domain taxonomy.

/// Recipient domains treated as "major providers". A rejection from one of
/// these carries more weight than a rejection from an arbitrary small
/// domain, because major providers' rejections are a stronger signal of
/// real reputation damage.
pub const MAJOR_PROVIDERS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "yahoo.com",
    "ymail.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "protonmail.com",
    "mail.com",
];

/// Whether `domain` (expected lower-cased) is in the closed major-provider set.
#[must_use]
pub fn is_major_provider(domain: &str) -> bool {
    MAJOR_PROVIDERS.contains(&domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_gmail() {
        assert!(is_major_provider("gmail.com"));
    }

    #[test]
    fn rejects_unknown_domain() {
        assert!(!is_major_provider("unknown-domain.com"));
    }

    #[test]
    fn is_case_sensitive_expects_lowercase_input() {
        assert!(!is_major_provider("Gmail.com"));
    }
}
