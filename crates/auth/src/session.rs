//! Per-session claim mode: use the embedded snapshot, or resolve from the store.
//!
//! The mode is chosen once from a validated token and does not change for the
//! rest of the session.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::claims::{JwtClaims, ResolvedIdentityClaims};
use crate::embedding::ClaimEmbedder;
use crate::registry::CapabilityRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimMode {
    Embedded,
    RequiresResolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClaims {
    Embedded(ResolvedIdentityClaims),
    RequiresResolution,
}

impl SessionClaims {
    /// Decide how this session's capabilities are sourced.
    ///
    /// The embedded snapshot is used only if it decodes, names the token's
    /// subject and workspace, and is younger than `max_staleness`.
    pub fn select(
        claims: &JwtClaims,
        embedder: &ClaimEmbedder,
        registry: &CapabilityRegistry,
        max_staleness: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let snapshot = match embedder.read_back(&claims.app_metadata, registry) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Self::RequiresResolution,
            Err(err) => {
                tracing::warn!(user_id = %claims.sub, error = %err, "ignoring unreadable capability snapshot");
                return Self::RequiresResolution;
            }
        };

        if snapshot.user_id != claims.sub || snapshot.workspace_id != claims.workspace_id {
            tracing::warn!(
                user_id = %claims.sub,
                workspace_id = %claims.workspace_id,
                "capability snapshot does not match token subject"
            );
            return Self::RequiresResolution;
        }

        if !snapshot.is_fresh(now, max_staleness) {
            tracing::debug!(
                user_id = %claims.sub,
                resolved_at = %snapshot.resolved_at,
                "capability snapshot is stale"
            );
            return Self::RequiresResolution;
        }

        Self::Embedded(snapshot)
    }

    pub fn mode(&self) -> ClaimMode {
        match self {
            SessionClaims::Embedded(_) => ClaimMode::Embedded,
            SessionClaims::RequiresResolution => ClaimMode::RequiresResolution,
        }
    }
}
