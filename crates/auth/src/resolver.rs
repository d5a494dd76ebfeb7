//! Capability resolution: does a bundle grant a given check?
//!
//! Matching rules:
//!
//! - an unscoped check (`events:delete`) is granted by the unscoped key or by
//!   any scoped variant (`events:delete:own`, `events:delete:any`);
//! - a scoped check (`events:delete:any`) is granted only by that exact key or
//!   by the unscoped `events:delete`. A different scope never satisfies it.
//!
//! Anything else is denied. Resolution never fails.

use std::borrow::Cow;

use serde::Serialize;

use crate::bundle::PermissionBundle;
use crate::capability::CapabilityKey;

/// A capability requirement, e.g. `finance:read` or `events:delete:own`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CapabilityCheck {
    pub domain: Cow<'static, str>,
    pub action: Cow<'static, str>,
    pub scope: Option<Cow<'static, str>>,
}

impl CapabilityCheck {
    pub fn new(domain: impl Into<Cow<'static, str>>, action: impl Into<Cow<'static, str>>) -> Self {
        Self {
            domain: domain.into(),
            action: action.into(),
            scope: None,
        }
    }

    pub fn scoped(mut self, scope: impl Into<Cow<'static, str>>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// The check a key answers for itself.
    pub fn for_key(key: &CapabilityKey) -> Self {
        Self {
            domain: Cow::Owned(key.domain().to_string()),
            action: Cow::Owned(key.action().to_string()),
            scope: key.scope().map(|s| Cow::Owned(s.to_string())),
        }
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Exact registry key this check names (`domain:action[:scope]`).
    pub fn key_string(&self) -> String {
        match self.scope() {
            Some(scope) => format!("{}:{}:{}", self.domain, self.action, scope),
            None => format!("{}:{}", self.domain, self.action),
        }
    }

    fn is_satisfied_by(&self, key: &CapabilityKey) -> bool {
        satisfies(key, &self.domain, &self.action, self.scope())
    }

    fn is_exactly(&self, key: &CapabilityKey) -> bool {
        key.domain() == self.domain && key.action() == self.action && key.scope() == self.scope()
    }
}

impl core::fmt::Display for CapabilityCheck {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.key_string())
    }
}

/// The single matching rule, compared segment by segment.
///
/// A requested segment containing `:` can never equal a parsed key segment,
/// so malformed requests are denied.
fn satisfies(key: &CapabilityKey, domain: &str, action: &str, scope: Option<&str>) -> bool {
    if key.domain() != domain || key.action() != action {
        return false;
    }
    match (scope, key.scope()) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(wanted), Some(granted)) => wanted == granted,
    }
}

/// First key in `bundle` that satisfies `check`, preferring an exact match.
pub fn matching_key<'a>(bundle: &'a PermissionBundle, check: &CapabilityCheck) -> Option<&'a CapabilityKey> {
    bundle
        .iter()
        .find(|key| check.is_exactly(key))
        .or_else(|| bundle.iter().find(|key| check.is_satisfied_by(key)))
}

pub fn has_capability(bundle: &PermissionBundle, domain: &str, action: &str, scope: Option<&str>) -> bool {
    bundle.iter().any(|key| satisfies(key, domain, action, scope))
}

pub fn has_key(bundle: &PermissionBundle, key: &CapabilityKey) -> bool {
    has_capability(bundle, key.domain(), key.action(), key.scope())
}

pub fn check(bundle: &PermissionBundle, check: &CapabilityCheck) -> bool {
    matching_key(bundle, check).is_some()
}
