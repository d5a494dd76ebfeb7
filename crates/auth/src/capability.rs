use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of one grantable capability.
///
/// Keys are `domain:action` or `domain:action:scope` (e.g. `finance:read`,
/// `events:delete:own`). Every segment is non-empty and made of lowercase
/// ASCII letters, digits or `_`.
///
/// A syntactically valid key is not necessarily a *registered* one; see
/// [`crate::registry::CapabilityRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityKey(Cow<'static, str>);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("capability key is empty")]
    Empty,

    #[error("capability key '{0}' must have 2 or 3 ':'-separated segments")]
    SegmentCount(String),

    #[error("capability key '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("capability key '{key}' contains invalid character {found:?}")]
    InvalidCharacter { key: String, found: char },
}

impl CapabilityKey {
    pub fn parse(raw: impl Into<Cow<'static, str>>) -> Result<Self, KeyParseError> {
        let raw = raw.into();
        check_syntax(&raw)?;
        Ok(Self(raw))
    }

    /// Build a key from its parts, e.g. `("events", "delete", Some("own"))`.
    pub fn from_parts(domain: &str, action: &str, scope: Option<&str>) -> Result<Self, KeyParseError> {
        let raw = match scope {
            Some(scope) => format!("{domain}:{action}:{scope}"),
            None => format!("{domain}:{action}"),
        };
        Self::parse(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.segments().0
    }

    pub fn action(&self) -> &str {
        self.segments().1
    }

    pub fn scope(&self) -> Option<&str> {
        self.segments().2
    }

    pub fn is_scoped(&self) -> bool {
        self.scope().is_some()
    }

    /// The `domain:action` prefix shared by all scoped variants of this key.
    pub fn unscoped(&self) -> &str {
        match self.0.rfind(':') {
            Some(idx) if self.is_scoped() => &self.0[..idx],
            _ => &self.0,
        }
    }

    fn segments(&self) -> (&str, &str, Option<&str>) {
        // Syntax was checked at construction, so there are always 2 or 3 parts.
        let mut parts = self.0.splitn(3, ':');
        let domain = parts.next().unwrap_or_default();
        let action = parts.next().unwrap_or_default();
        (domain, action, parts.next())
    }
}

fn check_syntax(raw: &str) -> Result<(), KeyParseError> {
    if raw.is_empty() {
        return Err(KeyParseError::Empty);
    }

    let segments: Vec<&str> = raw.split(':').collect();
    if !(2..=3).contains(&segments.len()) {
        return Err(KeyParseError::SegmentCount(raw.to_string()));
    }

    for segment in segments {
        if segment.is_empty() {
            return Err(KeyParseError::EmptySegment(raw.to_string()));
        }
        if let Some(found) = segment
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_'))
        {
            return Err(KeyParseError::InvalidCharacter {
                key: raw.to_string(),
                found,
            });
        }
    }

    Ok(())
}

impl TryFrom<String> for CapabilityKey {
    type Error = KeyParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CapabilityKey> for String {
    fn from(value: CapabilityKey) -> Self {
        value.0.into_owned()
    }
}

impl core::str::FromStr for CapabilityKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_string())
    }
}

impl core::fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scoped_key() {
        let key = CapabilityKey::parse("events:delete:own").unwrap();
        assert_eq!(key.domain(), "events");
        assert_eq!(key.action(), "delete");
        assert_eq!(key.scope(), Some("own"));
        assert_eq!(key.unscoped(), "events:delete");
    }

    #[test]
    fn unscoped_key_has_no_scope() {
        let key = CapabilityKey::parse("finance:read").unwrap();
        assert_eq!(key.scope(), None);
        assert_eq!(key.unscoped(), "finance:read");
        assert!(!key.is_scoped());
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(CapabilityKey::parse(""), Err(KeyParseError::Empty));
        assert!(matches!(
            CapabilityKey::parse("finance"),
            Err(KeyParseError::SegmentCount(_))
        ));
        assert!(matches!(
            CapabilityKey::parse("a:b:c:d"),
            Err(KeyParseError::SegmentCount(_))
        ));
        assert!(matches!(
            CapabilityKey::parse("events::own"),
            Err(KeyParseError::EmptySegment(_))
        ));
        assert!(matches!(
            CapabilityKey::parse("Events:read"),
            Err(KeyParseError::InvalidCharacter { found: 'E', .. })
        ));
        assert!(matches!(
            CapabilityKey::parse("finance.read:x"),
            Err(KeyParseError::InvalidCharacter { found: '.', .. })
        ));
    }

    #[test]
    fn from_parts_matches_parse() {
        let a = CapabilityKey::from_parts("chat", "delete", Some("any")).unwrap();
        let b: CapabilityKey = "chat:delete:any".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn deserialize_enforces_syntax() {
        let ok: CapabilityKey = serde_json::from_str("\"brain:read\"").unwrap();
        assert_eq!(ok.as_str(), "brain:read");
        assert!(serde_json::from_str::<CapabilityKey>("\"brain\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"brain:read\"");
    }
}
