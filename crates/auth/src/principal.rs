use serde::Serialize;

use capgate_core::{UserId, WorkspaceId};

use crate::bundle::PermissionBundle;
use crate::claims::ResolvedIdentityClaims;
use crate::roles::RoleName;
use crate::session::ClaimMode;

/// A principal's membership in a workspace: which workspace, which roles,
/// and the capabilities those roles resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceMembership {
    pub workspace_id: WorkspaceId,
    pub roles: Vec<RoleName>,
    pub bundle: PermissionBundle,
}

/// A fully resolved principal for authorization decisions.
///
/// Built once per request (see [`crate::gate::CapabilityGate`]) and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub principal_id: UserId,
    pub active_workspace_id: WorkspaceId,
    pub membership: WorkspaceMembership,
    /// Where the bundle came from.
    pub claim_mode: ClaimMode,
}

impl Principal {
    pub fn from_snapshot(
        active_workspace_id: WorkspaceId,
        roles: Vec<RoleName>,
        snapshot: ResolvedIdentityClaims,
        claim_mode: ClaimMode,
    ) -> Self {
        Self {
            principal_id: snapshot.user_id,
            active_workspace_id,
            membership: WorkspaceMembership {
                workspace_id: snapshot.workspace_id,
                roles,
                bundle: snapshot.bundle,
            },
            claim_mode,
        }
    }

    pub fn bundle(&self) -> &PermissionBundle {
        &self.membership.bundle
    }
}
