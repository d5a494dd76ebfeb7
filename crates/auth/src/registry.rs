//! Capability registry: the closed set of keys a bundle may contain.
//!
//! The table below is the single source of truth. Role bundles are validated
//! against it when they are written, and the resolver never grants a key that
//! is not listed here.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::capability::{CapabilityKey, KeyParseError};

/// One registered capability (for validation and audit/display).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityDefinition {
    pub key: &'static str,
    pub description: &'static str,
}

const fn cap(key: &'static str, description: &'static str) -> CapabilityDefinition {
    CapabilityDefinition { key, description }
}

/// Every capability known to the product.
pub const CAPABILITIES: &[CapabilityDefinition] = &[
    cap("workspace:read", "View workspace settings"),
    cap("workspace:update", "Rename the workspace and edit its settings"),
    cap("workspace:delete", "Delete the workspace"),
    cap("members:read", "List workspace members"),
    cap("members:invite", "Invite new members"),
    cap("members:remove", "Remove members from the workspace"),
    cap("roles:read", "View roles and their capabilities"),
    cap("roles:manage", "Create, edit and retire roles and assign them to members"),
    cap("onboarding:complete", "Finish workspace onboarding"),
    cap("chat:read", "Read chat conversations"),
    cap("chat:send", "Send chat messages"),
    cap("chat:delete:own", "Delete own chat messages"),
    cap("chat:delete:any", "Delete any chat message"),
    cap("events:read", "View calendar events"),
    cap("events:create", "Create calendar events"),
    cap("events:update:own", "Edit events created by the member"),
    cap("events:update:any", "Edit any event"),
    cap("events:delete:own", "Delete events created by the member"),
    cap("events:delete:any", "Delete any event"),
    cap("finance:read", "View finance records"),
    cap("finance:write", "Create and edit finance records"),
    cap("finance:export", "Export finance records"),
    cap("brain:read", "Explore the knowledge graph"),
    cap("brain:edit", "Add and edit knowledge graph nodes"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry entry is malformed: {0}")]
    Malformed(#[from] KeyParseError),

    #[error("registry entry '{0}' is listed more than once")]
    Duplicate(&'static str),
}

/// Lookup structure over a capability table.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: BTreeMap<&'static str, CapabilityDefinition>,
}

impl CapabilityRegistry {
    /// Build a registry, rejecting malformed or duplicate entries.
    pub fn from_definitions(definitions: &[CapabilityDefinition]) -> Result<Self, RegistryError> {
        let mut entries = BTreeMap::new();
        for def in definitions {
            CapabilityKey::parse(def.key)?;
            if entries.insert(def.key, *def).is_some() {
                return Err(RegistryError::Duplicate(def.key));
            }
        }
        Ok(Self { entries })
    }

    /// The process-wide registry built from [`CAPABILITIES`].
    ///
    /// If the table is broken the registry comes up empty, which denies
    /// everything.
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<CapabilityRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            Self::from_definitions(CAPABILITIES).unwrap_or_else(|err| {
                tracing::error!(error = %err, "capability table rejected; all capabilities denied");
                Self::default()
            })
        })
    }

    /// Exact, literal membership. No prefix, case or scope folding.
    pub fn is_valid_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&CapabilityDefinition> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All definitions, sorted by key.
    pub fn definitions(&self) -> impl Iterator<Item = &CapabilityDefinition> {
        self.entries.values()
    }

    /// Every registered key, parsed.
    pub fn keys(&self) -> impl Iterator<Item = CapabilityKey> + '_ {
        self.entries
            .keys()
            .filter_map(|key| CapabilityKey::parse(*key).ok())
    }

    pub fn domains(&self) -> BTreeSet<&'static str> {
        self.entries
            .keys()
            .filter_map(|key| key.split(':').next())
            .collect()
    }

    pub fn keys_for_domain<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = CapabilityKey> + 'a {
        self.keys().filter(move |key| key.domain() == domain)
    }
}

/// Membership check against the global registry.
pub fn is_valid_key(key: &str) -> bool {
    CapabilityRegistry::global().is_valid_key(key)
}
