use prospekt_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by lease operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseAuditAction {
    /// Emitted when a claimant receives the next eligible lead.
    Claimed,
    /// Emitted when an actor locks a specific lead by id.
    ManuallyLocked,
    /// Emitted when a lease is released.
    Unlocked,
    /// Emitted when a stale lease is reclaimed without the holder.
    Reclaimed,
}

impl LeaseAuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claimed => "lead.claimed",
            Self::ManuallyLocked => "lead.locked",
            Self::Unlocked => "lead.unlocked",
            Self::Reclaimed => "lead.reclaimed",
        }
    }

    /// Parses a storage value into an action.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "lead.claimed" => Ok(Self::Claimed),
            "lead.locked" => Ok(Self::ManuallyLocked),
            "lead.unlocked" => Ok(Self::Unlocked),
            "lead.reclaimed" => Ok(Self::Reclaimed),
            _ => Err(AppError::Validation(format!(
                "unknown lease audit action '{value}'"
            ))),
        }
    }
}
