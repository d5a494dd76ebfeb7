//! Role persistence boundary and per-request capability resolution.
//!
//! The real store is a relational database owned by the host application;
//! [`InMemoryRoleStore`] backs tests and local development.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use capgate_core::{Aggregate, AggregateRoot, DomainError, Event, ExpectedVersion, RoleId, UserId, WorkspaceId};

use crate::bundle::PermissionBundle;
use crate::claims::ResolvedIdentityClaims;
use crate::registry::CapabilityRegistry;
use crate::role::{RoleCommand, RoleError, WorkspaceRole};
use crate::roles::RoleName;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("role {0} not found")]
    RoleNotFound(RoleId),

    #[error("role name '{0}' is already used in this workspace")]
    DuplicateRoleName(String),

    #[error("role belongs to another workspace")]
    WorkspaceMismatch,

    #[error("cannot assign a retired role")]
    RoleRetired,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("role store unavailable: {0}")]
    Backend(String),
}

/// Persistence of workspace roles and member assignments.
///
/// Implementations must scope every lookup by workspace.
pub trait RoleStore: Send + Sync {
    /// Persist `role`, requiring the stored copy to be at `expected`.
    fn save_role(&self, role: &WorkspaceRole, expected: ExpectedVersion) -> Result<(), StoreError>;

    fn role(&self, workspace_id: WorkspaceId, role_id: RoleId) -> Result<Option<WorkspaceRole>, StoreError>;

    /// Look a role up by name. `name` is normalized like [`RoleName::parse`];
    /// a name that cannot be a role name finds nothing.
    fn role_by_name(&self, workspace_id: WorkspaceId, name: &str) -> Result<Option<WorkspaceRole>, StoreError>;

    fn assign_role(&self, workspace_id: WorkspaceId, user_id: UserId, role_id: RoleId) -> Result<(), StoreError>;

    /// Returns whether an assignment was removed.
    fn unassign_role(&self, workspace_id: WorkspaceId, user_id: UserId, role_id: RoleId) -> Result<bool, StoreError>;

    /// Roles assigned to `user_id` in `workspace_id`, retired ones included.
    fn roles_for_user(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<Vec<WorkspaceRole>, StoreError>;
}

#[derive(Debug, Default)]
struct Tables {
    roles: HashMap<(WorkspaceId, RoleId), WorkspaceRole>,
    assignments: HashMap<(WorkspaceId, UserId), BTreeSet<RoleId>>,
}

/// In-memory role store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    tables: RwLock<Tables>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("role store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("role store lock poisoned".to_string()))
    }
}

impl RoleStore for InMemoryRoleStore {
    fn save_role(&self, role: &WorkspaceRole, expected: ExpectedVersion) -> Result<(), StoreError> {
        let workspace_id = role
            .workspace_id
            .ok_or_else(|| DomainError::invariant("role has not been defined"))?;
        let mut tables = self.write()?;

        let current = tables
            .roles
            .get(&(workspace_id, role.id))
            .map(|r| r.version())
            .unwrap_or(0);
        expected.check(current)?;

        if let Some(name) = &role.name {
            let taken = tables.roles.values().any(|other| {
                other.workspace_id == Some(workspace_id) && other.id != role.id && other.name.as_ref() == Some(name)
            });
            if taken {
                return Err(StoreError::DuplicateRoleName(name.to_string()));
            }
        }

        tables.roles.insert((workspace_id, role.id), role.clone());
        Ok(())
    }

    fn role(&self, workspace_id: WorkspaceId, role_id: RoleId) -> Result<Option<WorkspaceRole>, StoreError> {
        Ok(self.read()?.roles.get(&(workspace_id, role_id)).cloned())
    }

    fn role_by_name(&self, workspace_id: WorkspaceId, name: &str) -> Result<Option<WorkspaceRole>, StoreError> {
        let Ok(name) = RoleName::parse(name) else {
            return Ok(None);
        };
        let tables = self.read()?;
        Ok(tables
            .roles
            .values()
            .find(|r| r.workspace_id == Some(workspace_id) && r.name.as_ref() == Some(&name))
            .cloned())
    }

    fn assign_role(&self, workspace_id: WorkspaceId, user_id: UserId, role_id: RoleId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let role = tables
            .roles
            .get(&(workspace_id, role_id))
            .ok_or(StoreError::RoleNotFound(role_id))?;
        if !role.is_active() {
            return Err(StoreError::RoleRetired);
        }

        tables
            .assignments
            .entry((workspace_id, user_id))
            .or_default()
            .insert(role_id);
        Ok(())
    }

    fn unassign_role(&self, workspace_id: WorkspaceId, user_id: UserId, role_id: RoleId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let key = (workspace_id, user_id);
        let Some(roles) = tables.assignments.get_mut(&key) else {
            return Ok(false);
        };
        let removed = roles.remove(&role_id);
        if roles.is_empty() {
            tables.assignments.remove(&key);
        }
        Ok(removed)
    }

    fn roles_for_user(&self, workspace_id: WorkspaceId, user_id: UserId) -> Result<Vec<WorkspaceRole>, StoreError> {
        let tables = self.read()?;
        let Some(role_ids) = tables.assignments.get(&(workspace_id, user_id)) else {
            return Ok(Vec::new());
        };
        Ok(role_ids
            .iter()
            .filter_map(|id| tables.roles.get(&(workspace_id, *id)))
            .cloned()
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Union of the bundles of every active role in `roles`.
///
/// Roles from another workspace contribute nothing, and keys no longer in
/// the registry are dropped.
pub fn resolve_from_roles(
    workspace_id: WorkspaceId,
    user_id: UserId,
    roles: &[WorkspaceRole],
    now: DateTime<Utc>,
) -> ResolvedIdentityClaims {
    let mut bundle = PermissionBundle::new();
    for role in roles.iter().filter(|r| r.workspace_id == Some(workspace_id)) {
        bundle.extend_from(&role.effective_bundle());
    }
    let dropped = bundle.retain_registered(CapabilityRegistry::global());
    if dropped > 0 {
        tracing::warn!(
            workspace_id = %workspace_id,
            user_id = %user_id,
            dropped,
            "stored roles grant unregistered capabilities; ignoring them"
        );
    }
    ResolvedIdentityClaims::new(workspace_id, user_id, bundle, now)
}

/// Per-request resolution path: the user's active role names in the
/// workspace and the snapshot they resolve to.
pub fn resolve_membership(
    store: &dyn RoleStore,
    workspace_id: WorkspaceId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<(Vec<RoleName>, ResolvedIdentityClaims), StoreError> {
    let roles = store.roles_for_user(workspace_id, user_id)?;
    let resolved = resolve_from_roles(workspace_id, user_id, &roles, now);
    let names: Vec<RoleName> = roles
        .iter()
        .filter(|r| r.workspace_id == Some(workspace_id) && r.is_active())
        .filter_map(|r| r.name.clone())
        .collect();
    tracing::debug!(
        workspace_id = %workspace_id,
        user_id = %user_id,
        roles = names.len(),
        capabilities = resolved.bundle.len(),
        "resolved capabilities from role store"
    );
    Ok((names, resolved))
}

pub fn resolve_identity(
    store: &dyn RoleStore,
    workspace_id: WorkspaceId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<ResolvedIdentityClaims, StoreError> {
    resolve_membership(store, workspace_id, user_id, now).map(|(_, resolved)| resolved)
}

// ─────────────────────────────────────────────────────────────────────────────
// Role administration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleAdminError {
    #[error(transparent)]
    Role(#[from] RoleError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load a role, run `command` against it and persist the result.
///
/// Validation happens inside the aggregate, so nothing is written when the
/// command names unregistered keys. Concurrent edits surface as a
/// `DomainError::Conflict` from the version check.
pub fn execute_role_command(store: &dyn RoleStore, command: &RoleCommand) -> Result<WorkspaceRole, RoleAdminError> {
    let workspace_id = command.workspace_id();
    let role_id = command.role_id();

    let mut role = store
        .role(workspace_id, role_id)?
        .unwrap_or_else(|| WorkspaceRole::empty(role_id));
    let expected = ExpectedVersion(role.version());

    let events = match role.handle(command) {
        Ok(events) => events,
        Err(err) => {
            tracing::info!(
                workspace_id = %workspace_id,
                role_id = %role_id,
                error = %err,
                "role command rejected"
            );
            return Err(err.into());
        }
    };

    if events.is_empty() {
        return Ok(role);
    }

    for event in &events {
        role.apply(event);
    }
    store.save_role(&role, expected)?;

    for event in &events {
        tracing::info!(
            workspace_id = %workspace_id,
            role_id = %role_id,
            event_type = event.event_type(),
            occurred_at = %event.occurred_at(),
            version = role.version(),
            "role updated"
        );
    }
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::capability::CapabilityKey;
    use crate::role::{DefineRole, GrantCapabilities, RetireRole, RoleStatus, RoleTemplate};

    fn define(store: &InMemoryRoleStore, workspace_id: WorkspaceId, name: &str, caps: &[&str]) -> WorkspaceRole {
        let cmd = RoleCommand::Define(DefineRole {
            workspace_id,
            role_id: RoleId::new(),
            name: name.to_string(),
            description: None,
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
            occurred_at: Utc::now(),
        });
        execute_role_command(store, &cmd).unwrap()
    }

    #[test]
    fn resolution_unions_assigned_roles() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let user = UserId::new();

        let chat = define(&store, ws, "chatter", &["chat:read", "chat:send"]);
        let events = define(&store, ws, "planner", &["events:read", "chat:read"]);
        define(&store, ws, "accountant", &["finance:read"]);

        store.assign_role(ws, user, chat.id).unwrap();
        store.assign_role(ws, user, events.id).unwrap();

        let resolved = resolve_identity(&store, ws, user, Utc::now()).unwrap();
        assert_eq!(
            resolved.bundle.to_strings(),
            vec!["chat:read".to_string(), "chat:send".to_string(), "events:read".to_string()]
        );
    }

    #[test]
    fn unknown_user_resolves_to_empty_bundle() {
        let store = InMemoryRoleStore::new();
        let resolved = resolve_identity(&store, WorkspaceId::new(), UserId::new(), Utc::now()).unwrap();
        assert!(resolved.bundle.is_empty());
    }

    #[test]
    fn retired_roles_stop_granting() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let user = UserId::new();
        let role = define(&store, ws, "temp", &["finance:read"]);
        store.assign_role(ws, user, role.id).unwrap();

        let retire = RoleCommand::Retire(RetireRole {
            workspace_id: ws,
            role_id: role.id,
            occurred_at: Utc::now(),
        });
        execute_role_command(&store, &retire).unwrap();

        let resolved = resolve_identity(&store, ws, user, Utc::now()).unwrap();
        assert!(resolved.bundle.is_empty());
        assert_eq!(store.assign_role(ws, UserId::new(), role.id), Err(StoreError::RoleRetired));
    }

    #[test]
    fn invalid_grant_writes_nothing() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let role = define(&store, ws, "viewer", &["chat:read"]);

        let cmd = RoleCommand::Grant(GrantCapabilities {
            workspace_id: ws,
            role_id: role.id,
            capabilities: vec!["chat:read:all".to_string(), "chat:send".to_string()],
            occurred_at: Utc::now(),
        });
        let err = execute_role_command(&store, &cmd).unwrap_err();
        assert!(matches!(err, RoleAdminError::Role(RoleError::InvalidBundle(_))));

        let stored = store.role(ws, role.id).unwrap().unwrap();
        assert_eq!(stored, role);
    }

    #[test]
    fn role_names_are_unique_per_workspace() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        define(&store, ws, "member", &["chat:read"]);

        let dup = RoleCommand::Define(DefineRole {
            workspace_id: ws,
            role_id: RoleId::new(),
            name: "Member".to_string(),
            description: None,
            capabilities: Vec::new(),
            occurred_at: Utc::now(),
        });
        assert_eq!(
            execute_role_command(&store, &dup).unwrap_err(),
            RoleAdminError::Store(StoreError::DuplicateRoleName("member".to_string()))
        );

        // Same name in another workspace is fine.
        define(&store, WorkspaceId::new(), "member", &["chat:read"]);
    }

    #[test]
    fn stale_save_is_a_conflict() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let role = define(&store, ws, "editor", &["brain:read"]);

        let mut stale = role.clone();
        stale.version += 5;
        let err = store.save_role(&stale, ExpectedVersion(3)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn lookups_are_workspace_scoped() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let role = define(&store, ws, "owner", &["workspace:read"]);

        assert!(store.role(WorkspaceId::new(), role.id).unwrap().is_none());
        assert!(store.role_by_name(ws, "owner").unwrap().is_some());
        assert!(store.role_by_name(ws, " Owner ").unwrap().is_some());
        assert!(store.role_by_name(ws, "owner!").unwrap().is_none());
        assert!(store.role_by_name(WorkspaceId::new(), "owner").unwrap().is_none());
        assert_eq!(
            store.assign_role(WorkspaceId::new(), UserId::new(), role.id),
            Err(StoreError::RoleNotFound(role.id))
        );
    }

    #[test]
    fn unassign_removes_capabilities() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let user = UserId::new();
        let cmd = RoleTemplate::find("viewer")
            .unwrap()
            .define_command(ws, RoleId::new(), Utc::now());
        let viewer = execute_role_command(&store, &cmd).unwrap();

        store.assign_role(ws, user, viewer.id).unwrap();
        assert!(store.unassign_role(ws, user, viewer.id).unwrap());
        assert!(!store.unassign_role(ws, user, viewer.id).unwrap());
        assert!(resolve_identity(&store, ws, user, Utc::now()).unwrap().bundle.is_empty());
    }

    #[test]
    fn unassigning_the_last_role_drops_the_membership_entry() {
        let store = InMemoryRoleStore::new();
        let ws = WorkspaceId::new();
        let user = UserId::new();
        let a = define(&store, ws, "reader", &["chat:read"]);
        let b = define(&store, ws, "sender", &["chat:send"]);

        store.assign_role(ws, user, a.id).unwrap();
        store.assign_role(ws, user, b.id).unwrap();
        assert!(store.unassign_role(ws, user, a.id).unwrap());
        assert!(store.read().unwrap().assignments.contains_key(&(ws, user)));

        assert!(store.unassign_role(ws, user, b.id).unwrap());
        assert!(!store.read().unwrap().assignments.contains_key(&(ws, user)));

        // Unknown pairs neither fail nor leave an entry behind.
        assert!(!store.unassign_role(ws, UserId::new(), a.id).unwrap());
        assert!(store.read().unwrap().assignments.is_empty());
    }

    #[test]
    fn resolution_ignores_keys_dropped_from_the_registry() {
        let ws = WorkspaceId::new();
        let user = UserId::new();
        let mut legacy = WorkspaceRole::empty(RoleId::new());
        legacy.workspace_id = Some(ws);
        legacy.name = Some(RoleName::parse("legacy").unwrap());
        legacy.created = true;
        legacy.status = RoleStatus::Active;
        legacy.bundle.insert(CapabilityKey::parse("chat:read").unwrap());
        legacy.bundle.insert(CapabilityKey::parse("reports:archive").unwrap());

        let resolved = resolve_from_roles(ws, user, std::slice::from_ref(&legacy), Utc::now());
        assert_eq!(resolved.bundle.to_strings(), vec!["chat:read".to_string()]);

        let store = InMemoryRoleStore::new();
        store.save_role(&legacy, ExpectedVersion(0)).unwrap();
        store.assign_role(ws, user, legacy.id).unwrap();
        let (names, resolved) = resolve_membership(&store, ws, user, Utc::now()).unwrap();
        assert_eq!(names, vec![RoleName::parse("legacy").unwrap()]);
        assert_eq!(resolved.bundle.to_strings(), vec!["chat:read".to_string()]);
    }
}
