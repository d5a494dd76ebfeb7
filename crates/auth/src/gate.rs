//! Request-time entry point: from validated claims to an authorized principal.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::authorize::{AuthzError, WorkspaceAction, authorize, authorize_action};
use crate::claims::JwtClaims;
use crate::embedding::ClaimEmbedder;
use crate::principal::Principal;
use crate::registry::CapabilityRegistry;
use crate::resolver::CapabilityCheck;
use crate::session::{ClaimMode, SessionClaims};
use crate::store::{RoleStore, StoreError, resolve_membership};

/// Builds principals from token claims, using the embedded snapshot when it
/// is usable and the role store otherwise.
pub struct CapabilityGate {
    store: Arc<dyn RoleStore>,
    embedder: ClaimEmbedder,
    registry: &'static CapabilityRegistry,
    max_staleness: Duration,
}

impl CapabilityGate {
    pub fn new(store: Arc<dyn RoleStore>, embedder: ClaimEmbedder, max_staleness: Duration) -> Self {
        Self {
            store,
            embedder,
            registry: CapabilityRegistry::global(),
            max_staleness,
        }
    }

    pub fn session(&self, claims: &JwtClaims, now: DateTime<Utc>) -> SessionClaims {
        SessionClaims::select(claims, &self.embedder, self.registry, self.max_staleness, now)
    }

    /// Resolve the principal for already-validated `claims`.
    ///
    /// Store failures are returned as errors; callers must treat them as a
    /// denial.
    pub fn principal_for(&self, claims: &JwtClaims, now: DateTime<Utc>) -> Result<Principal, StoreError> {
        match self.session(claims, now) {
            SessionClaims::Embedded(snapshot) => Ok(Principal::from_snapshot(
                claims.workspace_id,
                claims.roles.clone(),
                snapshot,
                ClaimMode::Embedded,
            )),
            SessionClaims::RequiresResolution => {
                let (role_names, snapshot) =
                    resolve_membership(&*self.store, claims.workspace_id, claims.sub, now)?;
                Ok(Principal::from_snapshot(
                    claims.workspace_id,
                    role_names,
                    snapshot,
                    ClaimMode::RequiresResolution,
                ))
            }
        }
    }

    pub fn authorize(&self, principal: &Principal, required: &CapabilityCheck) -> Result<(), AuthzError> {
        authorize(principal, required)
    }

    pub fn authorize_action<A: WorkspaceAction + ?Sized>(
        &self,
        principal: &Principal,
        action: &A,
    ) -> Result<(), AuthzError> {
        authorize_action(principal, action)
    }

    pub fn registry(&self) -> &'static CapabilityRegistry {
        self.registry
    }
}
