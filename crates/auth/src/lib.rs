//! `capgate-auth` — capability-based authorization for workspace actions.
//!
//! Pure policy logic: no HTTP, no database driver. Hosts plug in a
//! [`RoleStore`] and call the gate before running a workspace action.

pub mod authorize;
pub mod bundle;
pub mod capability;
pub mod claims;
pub mod config;
pub mod embedding;
pub mod gate;
pub mod principal;
pub mod registry;
pub mod resolver;
pub mod role;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

pub use authorize::{
    AUDIT_TARGET, AuthorizationExplanation, AuthzError, WorkspaceAction, authorize, authorize_action,
    explain_authorization,
};
pub use bundle::{BundleValidationError, InvalidKeyError, PermissionBundle, validate_bundle, validate_keys};
pub use capability::{CapabilityKey, KeyParseError};
pub use claims::{AppMetadata, JwtClaims, ResolvedIdentityClaims, TokenValidationError, validate_claims};
pub use config::{ConfigError, GateComponents, GateConfig};
pub use embedding::{CLAIMS_NAMESPACE, ClaimEmbedder, ClaimsTooLargeError, EmbeddingError};
pub use gate::CapabilityGate;
pub use principal::{Principal, WorkspaceMembership};
pub use registry::{CAPABILITIES, CapabilityDefinition, CapabilityRegistry, is_valid_key};
pub use resolver::{CapabilityCheck, has_capability, has_key};
pub use role::{RoleCommand, RoleError, RoleEvent, RoleTemplate, WorkspaceRole};
pub use roles::RoleName;
pub use session::{ClaimMode, SessionClaims};
pub use store::{
    InMemoryRoleStore, RoleAdminError, RoleStore, StoreError, execute_role_command, resolve_identity, resolve_membership,
};
pub use token::{Hs256JwtValidator, IssuedToken, JwtValidator, TokenIssueError, TokenIssuer};
