//! Permission bundles and write-time validation against the registry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::CapabilityKey;
use crate::registry::CapabilityRegistry;

/// The set of capability keys granted to a role (or resolved for a user).
///
/// Order is irrelevant; the backing set is ordered so serialized bundles are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionBundle(BTreeSet<CapabilityKey>);

impl PermissionBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: CapabilityKey) -> bool {
        self.0.insert(key)
    }

    pub fn remove(&mut self, key: &CapabilityKey) -> bool {
        self.0.remove(key)
    }

    pub fn contains(&self, key: &CapabilityKey) -> bool {
        self.0.contains(key)
    }

    pub fn contains_str(&self, key: &str) -> bool {
        self.0.iter().any(|k| k.as_str() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge another bundle into this one.
    pub fn extend_from(&mut self, other: &PermissionBundle) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Drop every key the registry does not know.
    pub fn retain_registered(&mut self, registry: &CapabilityRegistry) -> usize {
        let before = self.0.len();
        self.0.retain(|key| registry.is_valid_key(key.as_str()));
        before - self.0.len()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|k| k.to_string()).collect()
    }
}

impl FromIterator<CapabilityKey> for PermissionBundle {
    fn from_iter<I: IntoIterator<Item = CapabilityKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionBundle {
    type Item = &'a CapabilityKey;
    type IntoIter = std::collections::btree_set::Iter<'a, CapabilityKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A key that is not in the capability registry.
#[derive(Debug, Error, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[error("capability key '{key}' is not registered")]
pub struct InvalidKeyError {
    pub key: String,
}

/// Every invalid key found in a bundle, collected in one pass.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("bundle rejected: {} invalid capability key(s): {}", .errors.len(), joined_keys(.errors))]
pub struct BundleValidationError {
    pub errors: Vec<InvalidKeyError>,
}

impl BundleValidationError {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.key.as_str())
    }
}

fn joined_keys(errors: &[InvalidKeyError]) -> String {
    errors
        .iter()
        .map(|e| e.key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl CapabilityRegistry {
    /// Report every key of `bundle` missing from this registry.
    pub fn validate_bundle(&self, bundle: &PermissionBundle) -> Result<(), BundleValidationError> {
        let errors: Vec<InvalidKeyError> = bundle
            .iter()
            .filter(|key| !self.is_valid_key(key.as_str()))
            .map(|key| InvalidKeyError {
                key: key.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BundleValidationError { errors })
        }
    }

    /// Parse and validate raw strings (e.g. from a role editor or a database
    /// column). Unparsable strings are reported the same way as unregistered
    /// ones. Duplicates are reported once.
    pub fn validate_keys<I, S>(&self, raw: I) -> Result<PermissionBundle, BundleValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bundle = PermissionBundle::new();
        let mut invalid: BTreeSet<InvalidKeyError> = BTreeSet::new();

        for raw in raw {
            let raw = raw.as_ref();
            match CapabilityKey::parse(raw.to_string()) {
                Ok(key) if self.is_valid_key(key.as_str()) => {
                    bundle.insert(key);
                }
                _ => {
                    invalid.insert(InvalidKeyError {
                        key: raw.to_string(),
                    });
                }
            }
        }

        if invalid.is_empty() {
            Ok(bundle)
        } else {
            Err(BundleValidationError {
                errors: invalid.into_iter().collect(),
            })
        }
    }
}

/// Validate a bundle against the global registry.
pub fn validate_bundle(bundle: &PermissionBundle) -> Result<(), BundleValidationError> {
    CapabilityRegistry::global().validate_bundle(bundle)
}

/// Parse and validate raw keys against the global registry.
pub fn validate_keys<I, S>(raw: I) -> Result<PermissionBundle, BundleValidationError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    CapabilityRegistry::global().validate_keys(raw)
}
