//! Zero-cost domain newtypes.
//!
//! These wrap an `Arc<str>` (or a parsed value) so that "recipient domain",
//! "sending IP", "fingerprint", and "enhanced status code" are distinct
//! types at compile time instead of interchangeable `String`s.

use std::{fmt, net::IpAddr, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// A validated, textual sending IP address (v4 or v6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SendingIp(Arc<str>);

impl SendingIp {
    /// Parse and validate `raw` as an IPv4 or IPv6 address.
    ///
    /// # Errors
    /// Returns [`ErrorKind::InvalidInput`] if `raw` does not parse as an
    /// [`IpAddr`].
    pub fn parse(raw: &str) -> Result<Self, ErrorKind> {
        raw.parse::<IpAddr>()
            .map(|_| Self(Arc::from(raw)))
            .map_err(|_| ErrorKind::InvalidInput)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parsed [`IpAddr`]. Infallible because construction already
    /// validated the textual form.
    #[must_use]
    pub fn to_ip_addr(&self) -> IpAddr {
        self.0
            .parse()
            .expect("SendingIp invariant: constructed from a validated address")
    }

    #[must_use]
    pub fn is_ipv4(&self) -> bool {
        matches!(self.to_ip_addr(), IpAddr::V4(_))
    }
}

impl fmt::Display for SendingIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SendingIp {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SendingIp {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A lower-cased recipient domain, derived from everything after the final
/// `@` of a recipient address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RecipientDomain(Arc<str>);

impl RecipientDomain {
    #[must_use]
    pub fn new(domain: impl AsRef<str>) -> Self {
        Self(Arc::from(domain.as_ref().to_ascii_lowercase()))
    }

    /// Derive the recipient domain from a full recipient address.
    ///
    /// Returns `None` if `address` contains no `@`.
    #[must_use]
    pub fn from_recipient_address(address: &str) -> Option<Self> {
        let (_, domain) = address.rsplit_once('@')?;
        Some(Self::new(domain))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RecipientDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecipientDomain {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for RecipientDomain {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An externally supplied, globally unique delivery-failure event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Fingerprint(Arc<str>);

impl Fingerprint {
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A parsed RFC 3463 enhanced status code, `class.subject.detail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnhancedCode {
    pub class: u16,
    pub subject: u16,
    pub detail: u16,
}

impl EnhancedCode {
    #[must_use]
    pub const fn new(class: u16, subject: u16, detail: u16) -> Self {
        Self {
            class,
            subject,
            detail,
        }
    }
}

impl fmt::Display for EnhancedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.class, self.subject, self.detail)
    }
}

impl FromStr for EnhancedCode {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '.');
        let (Some(class), Some(subject), Some(detail), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ErrorKind::InvalidInput);
        };
        let class = class.parse().map_err(|_| ErrorKind::InvalidInput)?;
        let subject = subject.parse().map_err(|_| ErrorKind::InvalidInput)?;
        let detail = detail.parse().map_err(|_| ErrorKind::InvalidInput)?;
        Ok(Self::new(class, subject, detail))
    }
}

impl Serialize for EnhancedCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EnhancedCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|_| {
            serde::de::Error::custom(format!("invalid enhanced status code: {raw:?}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sending_ip_accepts_v4_and_v6() {
        assert!(SendingIp::parse("203.0.113.10").is_ok());
        assert!(SendingIp::parse("2001:db8::1").is_ok());
    }

    #[test]
    fn sending_ip_rejects_garbage() {
        assert!(SendingIp::parse("not-an-ip").is_err());
    }

    #[test]
    fn sending_ip_is_ipv4() {
        let ip = SendingIp::parse("203.0.113.10").unwrap();
        assert!(ip.is_ipv4());
        let ip6 = SendingIp::parse("2001:db8::1").unwrap();
        assert!(!ip6.is_ipv4());
    }

    #[test]
    fn recipient_domain_lowercases_and_strips_local_part() {
        let domain = RecipientDomain::from_recipient_address("local@DoMaIn.TLD").unwrap();
        assert_eq!(domain.as_str(), "domain.tld");
    }

    #[test]
    fn recipient_domain_rejects_missing_at() {
        assert!(RecipientDomain::from_recipient_address("not-an-address").is_none());
    }

    #[test]
    fn enhanced_code_round_trips_through_display_and_parse() {
        let code: EnhancedCode = "5.7.1".parse().unwrap();
        assert_eq!(code, EnhancedCode::new(5, 7, 1));
        assert_eq!(code.to_string(), "5.7.1");
    }

    #[test]
    fn enhanced_code_rejects_malformed_triples() {
        assert!("5.7".parse::<EnhancedCode>().is_err());
        assert!("5.7.1.2".parse::<EnhancedCode>().is_err());
        assert!("a.b.c".parse::<EnhancedCode>().is_err());
    }

    #[test]
    fn enhanced_code_serde_round_trip() {
        let code = EnhancedCode::new(5, 7, 1);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"5.7.1\"");
        let back: EnhancedCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn fingerprint_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(Fingerprint::new("abc"), 1);
        assert_eq!(map.get(&Fingerprint::new("abc")), Some(&1));
    }
}
