use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use capgate_core::{UserId, WorkspaceId};

use crate::bundle::PermissionBundle;
use crate::roles::RoleName;

/// JWT claims model (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub sub: UserId,

    /// Workspace the token is scoped to.
    pub workspace_id: WorkspaceId,

    /// Roles held in that workspace at issuance.
    pub roles: Vec<RoleName>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,

    /// Namespaced application metadata. The authorization snapshot, when
    /// present, lives under [`crate::embedding::CLAIMS_NAMESPACE`].
    #[serde(default, skip_serializing_if = "AppMetadata::is_empty")]
    pub app_metadata: AppMetadata,
}

/// Free-form, namespaced token metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppMetadata(Map<String, Value>);

impl AppMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, namespace: &str) -> Option<&Value> {
        self.0.get(namespace)
    }

    pub fn insert(&mut self, namespace: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(namespace.into(), value)
    }

    pub fn remove(&mut self, namespace: &str) -> Option<Value> {
        self.0.remove(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Point-in-time snapshot of a user's effective capabilities in a workspace.
///
/// Read-only once built. A snapshot goes stale when the user's roles change;
/// consumers bound how old a snapshot they accept (see [`Self::is_fresh`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIdentityClaims {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
    pub bundle: PermissionBundle,
    pub resolved_at: DateTime<Utc>,
}

impl ResolvedIdentityClaims {
    pub fn new(
        workspace_id: WorkspaceId,
        user_id: UserId,
        bundle: PermissionBundle,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            workspace_id,
            user_id,
            bundle,
            resolved_at,
        }
    }

    /// Whether the snapshot is younger than `max_staleness` at `now`.
    ///
    /// Snapshots dated in the future are never fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_staleness: Duration) -> bool {
        self.resolved_at <= now && now < self.resolved_at + max_staleness
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Validate the claim time window.
///
/// Signature checks happen in [`crate::token::JwtValidator`] implementations.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(),
            workspace_id: WorkspaceId::new(),
            roles: vec![RoleName::parse("member").unwrap()],
            issued_at,
            expires_at,
            app_metadata: AppMetadata::new(),
        }
    }

    #[test]
    fn time_window_checks() {
        let now = Utc::now();
        let ok = claims(now - Duration::minutes(1), now + Duration::minutes(5));
        assert_eq!(validate_claims(&ok, now), Ok(()));

        let expired = claims(now - Duration::minutes(10), now - Duration::minutes(1));
        assert_eq!(validate_claims(&expired, now), Err(TokenValidationError::Expired));

        let future = claims(now + Duration::minutes(1), now + Duration::minutes(5));
        assert_eq!(validate_claims(&future, now), Err(TokenValidationError::NotYetValid));

        let inverted = claims(now, now);
        assert_eq!(
            validate_claims(&inverted, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn empty_metadata_is_not_serialized() {
        let now = Utc::now();
        let json = serde_json::to_value(claims(now, now + Duration::minutes(5))).unwrap();
        assert!(json.get("app_metadata").is_none());
    }

    #[test]
    fn snapshot_freshness_window() {
        let now = Utc::now();
        let snapshot = ResolvedIdentityClaims::new(
            WorkspaceId::new(),
            UserId::new(),
            PermissionBundle::new(),
            now - Duration::seconds(30),
        );
        assert!(snapshot.is_fresh(now, Duration::seconds(60)));
        assert!(!snapshot.is_fresh(now, Duration::seconds(30)));
        assert!(!snapshot.is_fresh(now - Duration::seconds(31), Duration::seconds(60)));
    }
}
