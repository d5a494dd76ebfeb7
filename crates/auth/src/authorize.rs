use serde::Serialize;
use thiserror::Error;

use capgate_core::{UserId, WorkspaceId};

use crate::Principal;
use crate::registry::CapabilityRegistry;
use crate::resolver::{CapabilityCheck, matching_key};
use crate::role::ROLE_TEMPLATES;
use crate::session::ClaimMode;

/// Log target for authorization decisions.
pub const AUDIT_TARGET: &str = "capgate::audit";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("workspace mismatch")]
    WorkspaceMismatch,

    #[error("forbidden: missing capability '{0}'")]
    Forbidden(String),
}

/// Capabilities a workspace action needs before it may run.
///
/// Implement this on server actions and data accessors; callers check it with
/// [`authorize_action`] before executing.
pub trait WorkspaceAction {
    fn required_capabilities(&self) -> Vec<CapabilityCheck>;
}

/// Authorize a principal within its active workspace.
///
/// - No IO
/// - No panics
/// - Deny by default
pub fn authorize(principal: &Principal, required: &CapabilityCheck) -> Result<(), AuthzError> {
    if principal.active_workspace_id != principal.membership.workspace_id {
        tracing::info!(
            target: AUDIT_TARGET,
            principal_id = %principal.principal_id,
            active_workspace_id = %principal.active_workspace_id,
            membership_workspace_id = %principal.membership.workspace_id,
            capability = %required,
            "denied: workspace mismatch"
        );
        return Err(AuthzError::WorkspaceMismatch);
    }

    match matching_key(principal.bundle(), required) {
        Some(key) => {
            tracing::debug!(
                target: AUDIT_TARGET,
                principal_id = %principal.principal_id,
                workspace_id = %principal.active_workspace_id,
                capability = %required,
                matched = %key,
                claim_mode = ?principal.claim_mode,
                "granted"
            );
            Ok(())
        }
        None => {
            tracing::info!(
                target: AUDIT_TARGET,
                principal_id = %principal.principal_id,
                workspace_id = %principal.active_workspace_id,
                capability = %required,
                claim_mode = ?principal.claim_mode,
                "denied: missing capability"
            );
            Err(AuthzError::Forbidden(required.to_string()))
        }
    }
}

/// Require every capability the action lists. Stops at the first denial.
pub fn authorize_action<A: WorkspaceAction + ?Sized>(principal: &Principal, action: &A) -> Result<(), AuthzError> {
    for required in action.required_capabilities() {
        authorize(principal, &required)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a check was (or would be) allowed or denied.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_capability: String,
    pub granted: bool,
    pub reason: String,
    /// Key in the principal's bundle that satisfied the check.
    pub matched_key: Option<String>,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: UserId,
    pub active_workspace_id: WorkspaceId,
    pub membership_workspace_id: WorkspaceId,
    pub roles: Vec<String>,
    pub capabilities: Vec<String>,
    pub claim_mode: ClaimMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    WorkspaceMismatch,
    MissingCapability,
    /// The check names a key no bundle could ever hold.
    UnregisteredCapability,
}

/// Explain an authorization decision for audit or support tooling.
///
/// Agrees with [`authorize`] on `granted`.
pub fn explain_authorization(
    principal: &Principal,
    required: &CapabilityCheck,
    registry: &CapabilityRegistry,
) -> AuthorizationExplanation {
    let required_str = required.to_string();
    let state = PrincipalState {
        principal_id: principal.principal_id,
        active_workspace_id: principal.active_workspace_id,
        membership_workspace_id: principal.membership.workspace_id,
        roles: principal.membership.roles.iter().map(|r| r.to_string()).collect(),
        capabilities: principal.bundle().to_strings(),
        claim_mode: principal.claim_mode,
    };

    if principal.active_workspace_id != principal.membership.workspace_id {
        return AuthorizationExplanation {
            required_capability: required_str,
            granted: false,
            reason: format!(
                "Workspace mismatch: principal is active in workspace {} but membership is for workspace {}",
                principal.active_workspace_id, principal.membership.workspace_id
            ),
            matched_key: None,
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::WorkspaceMismatch,
                message: "Principal is authenticated in a different workspace than their membership".to_string(),
                suggestions: vec![
                    "Re-issue the token for the workspace being accessed".to_string(),
                ],
            }),
        };
    }

    if let Some(key) = matching_key(principal.bundle(), required) {
        let reason = if key.as_str() == required_str {
            format!("Principal holds '{}'", key)
        } else {
            format!("Principal holds '{}', which covers '{}'", key, required_str)
        };
        return AuthorizationExplanation {
            required_capability: required_str,
            granted: true,
            reason,
            matched_key: Some(key.to_string()),
            principal: state,
            denial_reason: None,
        };
    }

    // Registered keys that would satisfy the check.
    let granting_keys: Vec<String> = registry
        .keys()
        .filter(|key| {
            let mut single = crate::bundle::PermissionBundle::new();
            single.insert(key.clone());
            matching_key(&single, required).is_some()
        })
        .map(|key| key.to_string())
        .collect();

    if granting_keys.is_empty() {
        return AuthorizationExplanation {
            required_capability: required_str.clone(),
            granted: false,
            reason: format!("'{}' does not correspond to any registered capability", required_str),
            matched_key: None,
            principal: state,
            denial_reason: Some(DenialReason {
                kind: DenialKind::UnregisteredCapability,
                message: format!("No registered capability satisfies '{}'", required_str),
                suggestions: vec!["Check the capability name against the registry".to_string()],
            }),
        };
    }

    let granting_templates: Vec<&str> = ROLE_TEMPLATES
        .iter()
        .filter(|t| {
            t.capabilities(registry)
                .iter()
                .any(|cap| granting_keys.contains(cap))
        })
        .map(|t| t.name)
        .collect();

    let mut suggestions = vec![format!(
        "Grant one of {:?} to a role held by the principal",
        granting_keys
    )];
    if !granting_templates.is_empty() {
        suggestions.push(format!(
            "Built-in roles that include it: {:?}",
            granting_templates
        ));
    }

    AuthorizationExplanation {
        required_capability: required_str.clone(),
        granted: false,
        reason: format!(
            "Principal does not hold a capability satisfying '{}'. Current capabilities: {:?}",
            required_str, state.capabilities
        ),
        matched_key: None,
        principal: state,
        denial_reason: Some(DenialReason {
            kind: DenialKind::MissingCapability,
            message: format!("Missing required capability: '{}'", required_str),
            suggestions,
        }),
    }
}
