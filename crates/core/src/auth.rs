use serde::{Deserialize, Serialize};

use crate::{AppError, TenantId};

/// Role attached to an authenticated actor.
///
/// A closed set so policy checks stay exhaustive: adding a role forces every
/// `match` over this enum to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Full administrative access across the tenant.
    Administrator,
    /// Manages campaigns and the workers assigned to them.
    Manager,
    /// Ordinary worker claiming leads from assigned campaigns.
    BusinessDeveloper,
}

impl ActorRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Manager => "manager",
            Self::BusinessDeveloper => "business_developer",
        }
    }

    /// Parses a storage value into a role.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "administrator" => Ok(Self::Administrator),
            "manager" => Ok(Self::Manager),
            "business_developer" => Ok(Self::BusinessDeveloper),
            _ => Err(AppError::Validation(format!(
                "unknown actor role '{value}'"
            ))),
        }
    }

    /// Returns whether this role bypasses campaign membership checks.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        match self {
            Self::Administrator | Self::Manager => true,
            Self::BusinessDeveloper => false,
        }
    }
}

/// Actor information asserted by the authentication layer.
///
/// Issued outside this engine; every operation trusts it as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorIdentity {
    subject: String,
    role: ActorRole,
    tenant_id: TenantId,
}

impl ActorIdentity {
    /// Creates an actor identity from authentication and tenancy data.
    #[must_use]
    pub fn new(subject: impl Into<String>, role: ActorRole, tenant_id: TenantId) -> Self {
        Self {
            subject: subject.into(),
            role,
            tenant_id,
        }
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the role attached to the identity.
    #[must_use]
    pub fn role(&self) -> ActorRole {
        self.role
    }

    /// Returns the tenant linked to the identity.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
