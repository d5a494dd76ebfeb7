//! Claim embedding: carry a resolved bundle inside signed token metadata.
//!
//! The embedder is stateless apart from its size limit, so one instance can
//! serve concurrent token issuance for many users.

use serde_json::Value;
use thiserror::Error;

use crate::claims::{AppMetadata, ResolvedIdentityClaims};
use crate::registry::CapabilityRegistry;

/// Key under `app_metadata` that holds the snapshot.
pub const CLAIMS_NAMESPACE: &str = "capgate";

pub const DEFAULT_MAX_CLAIMS_BYTES: usize = 2048;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("embedded claims too large: {size} bytes exceeds limit of {limit} bytes")]
pub struct ClaimsTooLargeError {
    pub size: usize,
    pub limit: usize,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error(transparent)]
    TooLarge(#[from] ClaimsTooLargeError),

    #[error("failed to encode claims snapshot: {0}")]
    Encode(String),

    #[error("failed to decode claims snapshot: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimEmbedder {
    max_bytes: usize,
}

impl Default for ClaimEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLAIMS_BYTES)
    }
}

impl ClaimEmbedder {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Write `snapshot` into `metadata` under [`CLAIMS_NAMESPACE`].
    ///
    /// Returns the encoded size. On any error `metadata` is left untouched.
    pub fn embed(
        &self,
        snapshot: &ResolvedIdentityClaims,
        metadata: &mut AppMetadata,
    ) -> Result<usize, EmbeddingError> {
        let encoded =
            serde_json::to_vec(snapshot).map_err(|e| EmbeddingError::Encode(e.to_string()))?;
        if encoded.len() > self.max_bytes {
            return Err(ClaimsTooLargeError {
                size: encoded.len(),
                limit: self.max_bytes,
            }
            .into());
        }

        let value: Value =
            serde_json::from_slice(&encoded).map_err(|e| EmbeddingError::Encode(e.to_string()))?;
        metadata.insert(CLAIMS_NAMESPACE, value);

        tracing::debug!(
            workspace_id = %snapshot.workspace_id,
            user_id = %snapshot.user_id,
            capabilities = snapshot.bundle.len(),
            bytes = encoded.len(),
            "embedded capability snapshot"
        );
        Ok(encoded.len())
    }

    /// Read the snapshot back, if one was embedded.
    ///
    /// Keys that are no longer registered are dropped so a registry change
    /// never widens what an old token grants.
    pub fn read_back(
        &self,
        metadata: &AppMetadata,
        registry: &CapabilityRegistry,
    ) -> Result<Option<ResolvedIdentityClaims>, EmbeddingError> {
        let Some(value) = metadata.get(CLAIMS_NAMESPACE) else {
            return Ok(None);
        };

        let mut snapshot: ResolvedIdentityClaims = serde_json::from_value(value.clone())
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        let dropped = snapshot.bundle.retain_registered(registry);
        if dropped > 0 {
            tracing::warn!(
                user_id = %snapshot.user_id,
                dropped,
                "embedded snapshot carried unregistered capabilities"
            );
        }
        Ok(Some(snapshot))
    }
}
