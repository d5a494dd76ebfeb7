//! Workspace role aggregate (event-sourced).
//!
//! A role owns exactly one permission bundle. Every command that introduces
//! capability keys validates them against the registry before any event is
//! emitted, so a stored bundle never contains an unregistered key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use capgate_core::{Aggregate, AggregateRoot, DomainError, Event, RoleId, WorkspaceId};

use crate::bundle::{BundleValidationError, PermissionBundle, validate_keys};
use crate::capability::CapabilityKey;
use crate::registry::CapabilityRegistry;
use crate::roles::RoleName;

// ─────────────────────────────────────────────────────────────────────────────
// Role Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    #[default]
    Active,
    /// Retired roles grant nothing and accept no further changes.
    Retired,
}

// ─────────────────────────────────────────────────────────────────────────────
// Role Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// A role within one workspace.
///
/// # Invariants
/// - `workspace_id` is fixed at definition time.
/// - `bundle` only ever contains registered keys.
/// - Retired roles cannot be modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRole {
    pub id: RoleId,
    pub workspace_id: Option<WorkspaceId>,
    pub name: Option<RoleName>,
    pub description: Option<String>,
    pub bundle: PermissionBundle,
    pub status: RoleStatus,
    pub version: u64,
    pub created: bool,
}

impl WorkspaceRole {
    pub fn empty(id: RoleId) -> Self {
        Self {
            id,
            workspace_id: None,
            name: None,
            description: None,
            bundle: PermissionBundle::new(),
            status: RoleStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status == RoleStatus::Active
    }

    /// Capabilities this role currently grants (nothing once retired).
    pub fn effective_bundle(&self) -> PermissionBundle {
        if self.is_active() {
            self.bundle.clone()
        } else {
            PermissionBundle::new()
        }
    }

    fn ensure_exists(&self, workspace_id: WorkspaceId) -> Result<(), RoleError> {
        if !self.created {
            return Err(DomainError::NotFound.into());
        }
        if self.workspace_id != Some(workspace_id) {
            return Err(DomainError::WorkspaceMismatch.into());
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), RoleError> {
        if self.status == RoleStatus::Retired {
            return Err(DomainError::invariant("role is retired").into());
        }
        Ok(())
    }
}

impl AggregateRoot for WorkspaceRole {
    type Id = RoleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Define a new role. Capabilities arrive as raw strings from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefineRole {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub capabilities: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Replace the whole bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceBundle {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub capabilities: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantCapabilities {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub capabilities: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeCapabilities {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub capabilities: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetireRole {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoleCommand {
    Define(DefineRole),
    ReplaceBundle(ReplaceBundle),
    Grant(GrantCapabilities),
    Revoke(RevokeCapabilities),
    Retire(RetireRole),
}

impl RoleCommand {
    pub fn workspace_id(&self) -> WorkspaceId {
        match self {
            RoleCommand::Define(c) => c.workspace_id,
            RoleCommand::ReplaceBundle(c) => c.workspace_id,
            RoleCommand::Grant(c) => c.workspace_id,
            RoleCommand::Revoke(c) => c.workspace_id,
            RoleCommand::Retire(c) => c.workspace_id,
        }
    }

    pub fn role_id(&self) -> RoleId {
        match self {
            RoleCommand::Define(c) => c.role_id,
            RoleCommand::ReplaceBundle(c) => c.role_id,
            RoleCommand::Grant(c) => c.role_id,
            RoleCommand::Revoke(c) => c.role_id,
            RoleCommand::Retire(c) => c.role_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefined {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub name: RoleName,
    pub description: Option<String>,
    pub bundle: PermissionBundle,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReplaced {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub bundle: PermissionBundle,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesGranted {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub granted: PermissionBundle,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesRevoked {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub revoked: PermissionBundle,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRetired {
    pub workspace_id: WorkspaceId,
    pub role_id: RoleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleEvent {
    Defined(RoleDefined),
    BundleReplaced(BundleReplaced),
    CapabilitiesGranted(CapabilitiesGranted),
    CapabilitiesRevoked(CapabilitiesRevoked),
    Retired(RoleRetired),
}

impl Event for RoleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RoleEvent::Defined(_) => "auth.role.defined",
            RoleEvent::BundleReplaced(_) => "auth.role.bundle_replaced",
            RoleEvent::CapabilitiesGranted(_) => "auth.role.capabilities_granted",
            RoleEvent::CapabilitiesRevoked(_) => "auth.role.capabilities_revoked",
            RoleEvent::Retired(_) => "auth.role.retired",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RoleEvent::Defined(e) => e.occurred_at,
            RoleEvent::BundleReplaced(e) => e.occurred_at,
            RoleEvent::CapabilitiesGranted(e) => e.occurred_at,
            RoleEvent::CapabilitiesRevoked(e) => e.occurred_at,
            RoleEvent::Retired(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error(transparent)]
    InvalidBundle(#[from] BundleValidationError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for WorkspaceRole {
    type Command = RoleCommand;
    type Event = RoleEvent;
    type Error = RoleError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RoleEvent::Defined(e) => {
                self.id = e.role_id;
                self.workspace_id = Some(e.workspace_id);
                self.name = Some(e.name.clone());
                self.description = e.description.clone();
                self.bundle = e.bundle.clone();
                self.status = RoleStatus::Active;
                self.created = true;
            }
            RoleEvent::BundleReplaced(e) => self.bundle = e.bundle.clone(),
            RoleEvent::CapabilitiesGranted(e) => self.bundle.extend_from(&e.granted),
            RoleEvent::CapabilitiesRevoked(e) => {
                for key in &e.revoked {
                    self.bundle.remove(key);
                }
            }
            RoleEvent::Retired(_) => self.status = RoleStatus::Retired,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RoleCommand::Define(cmd) => self.handle_define(cmd),
            RoleCommand::ReplaceBundle(cmd) => self.handle_replace(cmd),
            RoleCommand::Grant(cmd) => self.handle_grant(cmd),
            RoleCommand::Revoke(cmd) => self.handle_revoke(cmd),
            RoleCommand::Retire(cmd) => self.handle_retire(cmd),
        }
    }
}

impl WorkspaceRole {
    fn handle_define(&self, cmd: &DefineRole) -> Result<Vec<RoleEvent>, RoleError> {
        if self.created {
            return Err(DomainError::invariant("role already exists").into());
        }

        let name = RoleName::parse(&cmd.name)?;
        let bundle = validate_keys(&cmd.capabilities)?;
        let description = cmd
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(vec![RoleEvent::Defined(RoleDefined {
            workspace_id: cmd.workspace_id,
            role_id: cmd.role_id,
            name,
            description,
            bundle,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_replace(&self, cmd: &ReplaceBundle) -> Result<Vec<RoleEvent>, RoleError> {
        self.ensure_exists(cmd.workspace_id)?;
        self.ensure_active()?;

        let bundle = validate_keys(&cmd.capabilities)?;
        if bundle == self.bundle {
            return Ok(Vec::new());
        }

        Ok(vec![RoleEvent::BundleReplaced(BundleReplaced {
            workspace_id: cmd.workspace_id,
            role_id: cmd.role_id,
            bundle,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_grant(&self, cmd: &GrantCapabilities) -> Result<Vec<RoleEvent>, RoleError> {
        self.ensure_exists(cmd.workspace_id)?;
        self.ensure_active()?;

        let requested = validate_keys(&cmd.capabilities)?;
        let granted: PermissionBundle = requested
            .iter()
            .filter(|key| !self.bundle.contains(key))
            .cloned()
            .collect();

        if granted.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![RoleEvent::CapabilitiesGranted(CapabilitiesGranted {
            workspace_id: cmd.workspace_id,
            role_id: cmd.role_id,
            granted,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_revoke(&self, cmd: &RevokeCapabilities) -> Result<Vec<RoleEvent>, RoleError> {
        self.ensure_exists(cmd.workspace_id)?;
        self.ensure_active()?;

        // Revocation only needs well-formed keys: a key dropped from the
        // registry must still be removable from old bundles.
        let mut revoked = PermissionBundle::new();
        let mut missing = Vec::new();
        for raw in &cmd.capabilities {
            match CapabilityKey::parse(raw.clone()) {
                Ok(key) if self.bundle.contains(&key) => {
                    revoked.insert(key);
                }
                _ => missing.push(raw.as_str()),
            }
        }

        if !missing.is_empty() {
            return Err(DomainError::invariant(format!(
                "capabilities not granted by this role: {}",
                missing.join(", ")
            ))
            .into());
        }

        if revoked.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![RoleEvent::CapabilitiesRevoked(CapabilitiesRevoked {
            workspace_id: cmd.workspace_id,
            role_id: cmd.role_id,
            revoked,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_retire(&self, cmd: &RetireRole) -> Result<Vec<RoleEvent>, RoleError> {
        self.ensure_exists(cmd.workspace_id)?;
        self.ensure_active()?;

        Ok(vec![RoleEvent::Retired(RoleRetired {
            workspace_id: cmd.workspace_id,
            role_id: cmd.role_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Templates
// ─────────────────────────────────────────────────────────────────────────────

/// Capabilities a built-in role starts with.
#[derive(Debug, Clone, Copy)]
pub enum TemplateGrant {
    /// Everything in the registry.
    All,
    Keys(&'static [&'static str]),
}

/// Built-in role seeded into new workspaces.
#[derive(Debug, Clone, Copy)]
pub struct RoleTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub grant: TemplateGrant,
}

pub const ROLE_TEMPLATES: &[RoleTemplate] = &[
    RoleTemplate {
        name: "owner",
        description: "Full control over the workspace",
        grant: TemplateGrant::All,
    },
    RoleTemplate {
        name: "admin",
        description: "Manages members, roles and all workspace content",
        grant: TemplateGrant::Keys(&[
            "workspace:read",
            "workspace:update",
            "members:read",
            "members:invite",
            "members:remove",
            "roles:read",
            "roles:manage",
            "onboarding:complete",
            "chat:read",
            "chat:send",
            "chat:delete:any",
            "events:read",
            "events:create",
            "events:update:any",
            "events:delete:any",
            "finance:read",
            "finance:write",
            "finance:export",
            "brain:read",
            "brain:edit",
        ]),
    },
    RoleTemplate {
        name: "member",
        description: "Day-to-day collaboration on own content",
        grant: TemplateGrant::Keys(&[
            "workspace:read",
            "members:read",
            "onboarding:complete",
            "chat:read",
            "chat:send",
            "chat:delete:own",
            "events:read",
            "events:create",
            "events:update:own",
            "events:delete:own",
            "brain:read",
        ]),
    },
    RoleTemplate {
        name: "viewer",
        description: "Read-only access",
        grant: TemplateGrant::Keys(&["workspace:read", "chat:read", "events:read", "brain:read"]),
    },
];

impl RoleTemplate {
    pub fn find(name: &str) -> Option<&'static RoleTemplate> {
        ROLE_TEMPLATES.iter().find(|t| t.name == name)
    }

    pub fn capabilities(&self, registry: &CapabilityRegistry) -> Vec<String> {
        match self.grant {
            TemplateGrant::All => registry.definitions().map(|d| d.key.to_string()).collect(),
            TemplateGrant::Keys(keys) => keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Command that defines this template as a role in `workspace_id`.
    pub fn define_command(
        &self,
        workspace_id: WorkspaceId,
        role_id: RoleId,
        occurred_at: DateTime<Utc>,
    ) -> RoleCommand {
        RoleCommand::Define(DefineRole {
            workspace_id,
            role_id,
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            capabilities: self.capabilities(CapabilityRegistry::global()),
            occurred_at,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn defined(workspace_id: WorkspaceId, caps: &[&str]) -> WorkspaceRole {
        let role_id = RoleId::new();
        let mut role = WorkspaceRole::empty(role_id);
        let cmd = RoleCommand::Define(DefineRole {
            workspace_id,
            role_id,
            name: "Planner".to_string(),
            description: Some("  plans events ".to_string()),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            occurred_at: now(),
        });
        for event in role.handle(&cmd).unwrap() {
            role.apply(&event);
        }
        role
    }

    #[test]
    fn define_role_success() {
        let workspace_id = WorkspaceId::new();
        let role = defined(workspace_id, &["events:read", "events:create"]);

        assert!(role.is_active());
        assert_eq!(role.name.as_ref().unwrap().as_str(), "planner");
        assert_eq!(role.description.as_deref(), Some("plans events"));
        assert_eq!(role.bundle.len(), 2);
        assert_eq!(role.version, 1);
    }

    #[test]
    fn define_rejects_all_invalid_keys_together() {
        let role_id = RoleId::new();
        let role = WorkspaceRole::empty(role_id);
        let cmd = RoleCommand::Define(DefineRole {
            workspace_id: WorkspaceId::new(),
            role_id,
            name: "broken".to_string(),
            description: None,
            capabilities: vec![
                "events:read".to_string(),
                "events:nuke".to_string(),
                "payroll:read".to_string(),
            ],
            occurred_at: now(),
        });

        let RoleError::InvalidBundle(err) = role.handle(&cmd).unwrap_err() else {
            panic!("expected InvalidBundle");
        };
        let keys: Vec<&str> = err.keys().collect();
        assert_eq!(keys, vec!["events:nuke", "payroll:read"]);
    }

    #[test]
    fn grant_emits_only_new_keys() {
        let workspace_id = WorkspaceId::new();
        let role = defined(workspace_id, &["events:read"]);

        let cmd = RoleCommand::Grant(GrantCapabilities {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["events:read".to_string(), "events:delete:own".to_string()],
            occurred_at: now(),
        });
        let events = role.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);

        let RoleEvent::CapabilitiesGranted(e) = &events[0] else {
            panic!("expected CapabilitiesGranted");
        };
        assert_eq!(e.granted.to_strings(), vec!["events:delete:own".to_string()]);
    }

    #[test]
    fn grant_validates_before_emitting() {
        let workspace_id = WorkspaceId::new();
        let role = defined(workspace_id, &["events:read"]);

        let cmd = RoleCommand::Grant(GrantCapabilities {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["events:delete".to_string()],
            occurred_at: now(),
        });
        assert!(matches!(role.handle(&cmd), Err(RoleError::InvalidBundle(_))));
    }

    #[test]
    fn replace_and_revoke() {
        let workspace_id = WorkspaceId::new();
        let mut role = defined(workspace_id, &["events:read"]);

        let replace = RoleCommand::ReplaceBundle(ReplaceBundle {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["finance:read".to_string(), "finance:export".to_string()],
            occurred_at: now(),
        });
        for event in role.handle(&replace).unwrap() {
            role.apply(&event);
        }
        assert_eq!(
            role.bundle.to_strings(),
            vec!["finance:export".to_string(), "finance:read".to_string()]
        );

        let revoke = RoleCommand::Revoke(RevokeCapabilities {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["finance:export".to_string()],
            occurred_at: now(),
        });
        for event in role.handle(&revoke).unwrap() {
            role.apply(&event);
        }
        assert_eq!(role.bundle.to_strings(), vec!["finance:read".to_string()]);
        assert_eq!(role.version, 3);
    }

    #[test]
    fn revoking_ungranted_key_fails() {
        let workspace_id = WorkspaceId::new();
        let role = defined(workspace_id, &["events:read"]);

        let revoke = RoleCommand::Revoke(RevokeCapabilities {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["finance:read".to_string()],
            occurred_at: now(),
        });
        let err = role.handle(&revoke).unwrap_err().to_string();
        assert!(err.contains("finance:read"));
    }

    #[test]
    fn retired_role_is_frozen_and_grants_nothing() {
        let workspace_id = WorkspaceId::new();
        let mut role = defined(workspace_id, &["events:read"]);

        let retire = RoleCommand::Retire(RetireRole {
            workspace_id,
            role_id: role.id,
            occurred_at: now(),
        });
        for event in role.handle(&retire).unwrap() {
            role.apply(&event);
        }
        assert_eq!(role.status, RoleStatus::Retired);
        assert!(role.effective_bundle().is_empty());

        let grant = RoleCommand::Grant(GrantCapabilities {
            workspace_id,
            role_id: role.id,
            capabilities: vec!["chat:read".to_string()],
            occurred_at: now(),
        });
        let err = role.handle(&grant).unwrap_err().to_string();
        assert!(err.contains("retired"));
    }

    #[test]
    fn workspace_isolation_enforced() {
        let role = defined(WorkspaceId::new(), &["events:read"]);

        let grant = RoleCommand::Grant(GrantCapabilities {
            workspace_id: WorkspaceId::new(),
            role_id: role.id,
            capabilities: vec!["chat:read".to_string()],
            occurred_at: now(),
        });
        assert_eq!(
            role.handle(&grant).unwrap_err(),
            RoleError::Domain(DomainError::WorkspaceMismatch)
        );
    }

    #[test]
    fn templates_only_use_registered_keys() {
        let registry = CapabilityRegistry::global();
        for template in ROLE_TEMPLATES {
            let caps = template.capabilities(registry);
            assert!(
                registry.validate_keys(&caps).is_ok(),
                "template '{}' has unregistered keys",
                template.name
            );
        }
        let owner = RoleTemplate::find("owner").unwrap();
        assert_eq!(owner.capabilities(registry).len(), registry.len());
    }

    #[test]
    fn template_defines_valid_role() {
        let workspace_id = WorkspaceId::new();
        let role_id = RoleId::new();
        let mut role = WorkspaceRole::empty(role_id);
        let cmd = RoleTemplate::find("member")
            .unwrap()
            .define_command(workspace_id, role_id, now());
        for event in role.handle(&cmd).unwrap() {
            role.apply(&event);
        }
        assert!(role.bundle.contains_str("events:delete:own"));
        assert!(!role.bundle.contains_str("events:delete:any"));
    }

    #[test]
    fn event_types_are_stable() {
        let workspace_id = WorkspaceId::new();
        let mut role = defined(workspace_id, &["events:read"]);
        let role_id = role.id;
        let keys = |caps: &[&str]| caps.iter().map(|c| c.to_string()).collect::<Vec<_>>();

        let commands = [
            RoleCommand::Grant(GrantCapabilities {
                workspace_id,
                role_id,
                capabilities: keys(&["events:create"]),
                occurred_at: now(),
            }),
            RoleCommand::Revoke(RevokeCapabilities {
                workspace_id,
                role_id,
                capabilities: keys(&["events:create"]),
                occurred_at: now(),
            }),
            RoleCommand::ReplaceBundle(ReplaceBundle {
                workspace_id,
                role_id,
                capabilities: keys(&["chat:read"]),
                occurred_at: now(),
            }),
            RoleCommand::Retire(RetireRole {
                workspace_id,
                role_id,
                occurred_at: now(),
            }),
        ];

        let mut types = Vec::new();
        for cmd in &commands {
            for event in role.handle(cmd).unwrap() {
                types.push(event.event_type());
                role.apply(&event);
            }
        }
        assert_eq!(
            types,
            vec![
                "auth.role.capabilities_granted",
                "auth.role.capabilities_revoked",
                "auth.role.bundle_replaced",
                "auth.role.retired",
            ]
        );

        let fresh_id = RoleId::new();
        let define = RoleCommand::Define(DefineRole {
            workspace_id,
            role_id: fresh_id,
            name: "reader".to_string(),
            description: None,
            capabilities: Vec::new(),
            occurred_at: now(),
        });
        let defined_events = WorkspaceRole::empty(fresh_id).handle(&define).unwrap();
        assert_eq!(defined_events[0].event_type(), "auth.role.defined");
    }
}
