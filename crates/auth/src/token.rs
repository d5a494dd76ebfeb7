//! HS256 token issuance and validation.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use capgate_core::{UserId, WorkspaceId};

use crate::claims::{AppMetadata, JwtClaims, ResolvedIdentityClaims, TokenValidationError, validate_claims};
use crate::embedding::ClaimEmbedder;
use crate::roles::RoleName;
use crate::session::ClaimMode;

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// Shared-secret HS256 validator.
///
/// Expiry is checked by [`validate_claims`] against the caller's clock, so the
/// library-level `exp` handling is disabled.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => TokenValidationError::InvalidSignature,
                _ => TokenValidationError::Malformed(e.to_string()),
            },
        )?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenIssueError {
    #[error("claims snapshot belongs to a different user or workspace")]
    SnapshotMismatch,

    #[error("token lifetime must be positive")]
    InvalidTtl,

    #[error("failed to encode token: {0}")]
    Encoding(String),
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: JwtClaims,
    pub claim_mode: ClaimMode,
}

/// Signs tokens and runs the claim embedding hook at issuance.
pub struct TokenIssuer {
    key: EncodingKey,
    embedder: ClaimEmbedder,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, embedder: ClaimEmbedder, ttl: Duration) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
            embedder,
            ttl,
        }
    }

    /// Issue a token for `sub` in `workspace_id`.
    ///
    /// When `resolved` is given it is embedded into `app_metadata`. If that
    /// fails (typically [`crate::ClaimsTooLargeError`]) the token is still
    /// issued, without the snapshot, and requests fall back to store
    /// resolution.
    pub fn issue(
        &self,
        sub: UserId,
        workspace_id: WorkspaceId,
        roles: Vec<RoleName>,
        resolved: Option<&ResolvedIdentityClaims>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenIssueError> {
        if self.ttl <= Duration::zero() {
            return Err(TokenIssueError::InvalidTtl);
        }

        let mut app_metadata = AppMetadata::new();
        let mut claim_mode = ClaimMode::RequiresResolution;

        if let Some(snapshot) = resolved {
            if snapshot.user_id != sub || snapshot.workspace_id != workspace_id {
                return Err(TokenIssueError::SnapshotMismatch);
            }
            match self.embedder.embed(snapshot, &mut app_metadata) {
                Ok(_) => claim_mode = ClaimMode::Embedded,
                Err(err) => {
                    tracing::warn!(
                        user_id = %sub,
                        workspace_id = %workspace_id,
                        error = %err,
                        "capability snapshot not embedded; falling back to per-request resolution"
                    );
                }
            }
        }

        let claims = JwtClaims {
            sub,
            workspace_id,
            roles,
            issued_at: now,
            expires_at: now + self.ttl,
            app_metadata,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| TokenIssueError::Encoding(e.to_string()))?;

        tracing::info!(
            user_id = %sub,
            workspace_id = %workspace_id,
            claim_mode = ?claim_mode,
            "issued token"
        );

        Ok(IssuedToken {
            token,
            claims,
            claim_mode,
        })
    }
}
