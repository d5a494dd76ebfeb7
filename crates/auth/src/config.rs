//! Environment-driven configuration for token issuance and the gate.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use thiserror::Error;

use crate::embedding::{ClaimEmbedder, DEFAULT_MAX_CLAIMS_BYTES};
use crate::gate::CapabilityGate;
use crate::store::RoleStore;
use crate::token::{Hs256JwtValidator, TokenIssuer};

pub const ENV_JWT_SECRET: &str = "CAPGATE_JWT_SECRET";
pub const ENV_TOKEN_TTL_SECS: &str = "CAPGATE_TOKEN_TTL_SECS";
pub const ENV_MAX_CLAIMS_BYTES: &str = "CAPGATE_MAX_CLAIMS_BYTES";
pub const ENV_CLAIMS_MAX_STALENESS_SECS: &str = "CAPGATE_CLAIMS_MAX_STALENESS_SECS";
/// `production` makes a missing signing secret a startup error.
pub const ENV_ENVIRONMENT: &str = "CAPGATE_ENV";

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub max_claims_bytes: usize,
    /// How old an embedded snapshot may be before the gate re-resolves.
    pub claims_max_staleness: Duration,
}

impl core::fmt::Debug for GateConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GateConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("max_claims_bytes", &self.max_claims_bytes)
            .field("claims_max_staleness", &self.claims_max_staleness)
            .finish()
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::seconds(3600),
            max_claims_bytes: DEFAULT_MAX_CLAIMS_BYTES,
            claims_max_staleness: Duration::seconds(300),
        }
    }
}

impl GateConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let production = lookup(ENV_ENVIRONMENT).is_some_and(|env| env.trim().eq_ignore_ascii_case("production"));

        let jwt_secret = match lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None if production => return Err(ConfigError::Missing(ENV_JWT_SECRET)),
            None => {
                tracing::warn!("{ENV_JWT_SECRET} not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        let token_ttl = parse_positive(&lookup, ENV_TOKEN_TTL_SECS)?
            .map(|secs| Duration::seconds(secs as i64))
            .unwrap_or(defaults.token_ttl);
        let max_claims_bytes = parse_positive(&lookup, ENV_MAX_CLAIMS_BYTES)?
            .map(|bytes| bytes as usize)
            .unwrap_or(defaults.max_claims_bytes);
        let claims_max_staleness = parse_positive(&lookup, ENV_CLAIMS_MAX_STALENESS_SECS)?
            .map(|secs| Duration::seconds(secs as i64))
            .unwrap_or(defaults.claims_max_staleness);

        Ok(Self {
            jwt_secret,
            token_ttl,
            max_claims_bytes,
            claims_max_staleness,
        })
    }

    pub fn embedder(&self) -> ClaimEmbedder {
        ClaimEmbedder::new(self.max_claims_bytes)
    }
}

fn parse_positive<F>(lookup: &F, var: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

/// Everything a host needs to issue tokens and guard workspace actions.
pub struct GateComponents {
    pub config: GateConfig,
    pub issuer: TokenIssuer,
    pub validator: Hs256JwtValidator,
    pub gate: CapabilityGate,
}

impl GateComponents {
    pub fn new(config: GateConfig, store: Arc<dyn RoleStore>) -> Self {
        let issuer = TokenIssuer::new(&config.jwt_secret, config.embedder(), config.token_ttl);
        let validator = Hs256JwtValidator::new(&config.jwt_secret);
        let gate = CapabilityGate::new(store, config.embedder(), config.claims_max_staleness);
        Self {
            config,
            issuer,
            validator,
            gate,
        }
    }

    pub fn from_env(store: Arc<dyn RoleStore>) -> anyhow::Result<Self> {
        let config = GateConfig::from_env().context("loading capability gate configuration")?;
        tracing::info!(config = ?config, "capability gate configured");
        Ok(Self::new(config, store))
    }
}
