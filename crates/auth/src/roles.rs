use serde::{Deserialize, Serialize};

use capgate_core::DomainError;

const MAX_ROLE_NAME_LEN: usize = 64;

/// Name of a workspace role (e.g. "owner", "finance_viewer").
///
/// Normalized to trimmed lowercase; only ASCII letters, digits, `_` and `-`
/// are accepted. Names are unique within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.len() > MAX_ROLE_NAME_LEN {
            return Err(DomainError::validation(format!(
                "role name exceeds {MAX_ROLE_NAME_LEN} characters"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(DomainError::validation(format!(
                "role name '{name}' contains invalid characters"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
