//! `${VAR:default}` environment-variable substitution for TOML configuration
//! files, shared by every crate that loads its own config sub-struct.

use std::env::VarError;

/// Substitute every `${VAR}` or `${VAR:default}` occurrence in `raw` with the
/// value of the environment variable `VAR`, falling back to `default` (the
/// text after the first `:`) when the variable is unset. A reference with no
/// default and an unset variable is left untouched — callers typically feed
/// the result through `toml::from_str`, whose own validation will then
/// surface a clear "missing field" or "invalid value" error rather than this
/// function silently producing `${VAR}` in the parsed output.
#[must_use]
pub fn substitute_env(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let Some(end_offset) = rest[start..].find('}') else {
            out.push_str(&rest[start..]);
            break;
        };
        let end = start + end_offset;
        let inner = &rest[start + 2..end];
        let (var_name, default) = inner
            .split_once(':')
            .map_or((inner, None), |(name, default)| (name, Some(default)));

        match std::env::var(var_name) {
            Ok(value) => out.push_str(&value),
            Err(VarError::NotPresent | VarError::NotUnicode(_)) => {
                if let Some(default) = default {
                    out.push_str(default);
                } else {
                    out.push_str(&rest[start..=end]);
                }
            }
        }

        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_from_environment() {
        // SAFETY: tests run single-threaded enough for this to be stable in
        // practice for this crate's test binary; no other test reads this var.
        unsafe { std::env::set_var("REPUTATION_TEST_VAR", "hello") };
        assert_eq!(substitute_env("value = \"${REPUTATION_TEST_VAR}\""), "value = \"hello\"");
        unsafe { std::env::remove_var("REPUTATION_TEST_VAR") };
    }

    #[test]
    fn falls_back_to_default_when_unset() {
        unsafe { std::env::remove_var("REPUTATION_DEFINITELY_UNSET") };
        assert_eq!(
            substitute_env("port = ${REPUTATION_DEFINITELY_UNSET:8080}"),
            "port = 8080"
        );
    }

    #[test]
    fn leaves_unresolvable_reference_without_default_untouched() {
        unsafe { std::env::remove_var("REPUTATION_DEFINITELY_UNSET") };
        assert_eq!(
            substitute_env("port = ${REPUTATION_DEFINITELY_UNSET}"),
            "port = ${REPUTATION_DEFINITELY_UNSET}"
        );
    }

    #[test]
    fn handles_multiple_substitutions() {
        unsafe {
            std::env::set_var("REPUTATION_TEST_A", "a");
            std::env::set_var("REPUTATION_TEST_B", "b");
        }
        assert_eq!(
            substitute_env("${REPUTATION_TEST_A}-${REPUTATION_TEST_B}"),
            "a-b"
        );
        unsafe {
            std::env::remove_var("REPUTATION_TEST_A");
            std::env::remove_var("REPUTATION_TEST_B");
        }
    }

    #[test]
    fn passes_through_text_with_no_references() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }
}
