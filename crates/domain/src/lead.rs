use chrono::{DateTime, TimeDelta, Utc};
use prospekt_core::{AppError, AppResult, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a lead record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(Uuid);

impl LeadId {
    /// Creates a new random lead identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a lead identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CampaignId(Uuid);

impl CampaignId {
    /// Creates a new random campaign identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a campaign identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lease age beyond which the holder is presumed gone and the lead becomes
/// claimable by others.
pub const LEASE_STALE_AFTER_SECONDS: i64 = 30 * 60;

/// Returns the staleness threshold as a time delta.
#[must_use]
pub fn lease_stale_after() -> TimeDelta {
    TimeDelta::seconds(LEASE_STALE_AFTER_SECONDS)
}

/// Lead lifecycle status.
///
/// `New` and `Locked` cycle under this engine; the remaining statuses are
/// terminal and set by downstream CRM actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Unleased and eligible for distribution.
    New,
    /// Leased and being worked by one actor.
    Locked,
    /// Outreach happened; outcome pending.
    Contacted,
    /// Converted into a qualified opportunity.
    Qualified,
    /// Parked for a later touch.
    Nurture,
    /// Closed without conversion.
    Lost,
}

impl LeadStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Locked => "locked",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Nurture => "nurture",
            Self::Lost => "lost",
        }
    }

    /// Parses a storage value into a status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "new" => Ok(Self::New),
            "locked" => Ok(Self::Locked),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "nurture" => Ok(Self::Nurture),
            "lost" => Ok(Self::Lost),
            _ => Err(AppError::Validation(format!(
                "unknown lead status '{value}'"
            ))),
        }
    }

    /// Returns whether this status is owned by downstream CRM actions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::New | Self::Locked => false,
            Self::Contacted | Self::Qualified | Self::Nurture | Self::Lost => true,
        }
    }
}

/// Exclusive working claim on one lead.
///
/// Holder and acquisition timestamp travel together; a half-set lease is
/// unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    holder: String,
    acquired_at: DateTime<Utc>,
}

impl Lease {
    /// Creates a lease held by `holder` starting at `acquired_at`.
    #[must_use]
    pub fn new(holder: impl Into<String>, acquired_at: DateTime<Utc>) -> Self {
        Self {
            holder: holder.into(),
            acquired_at,
        }
    }

    /// Returns the subject holding the lease.
    #[must_use]
    pub fn holder(&self) -> &str {
        self.holder.as_str()
    }

    /// Returns when the lease was acquired.
    #[must_use]
    pub fn acquired_at(&self) -> DateTime<Utc> {
        self.acquired_at
    }

    /// Returns whether the lease has exceeded the staleness threshold at
    /// `now`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.acquired_at > lease_stale_after()
    }
}

/// One unit of prospecting work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    id: LeadId,
    tenant_id: TenantId,
    campaign_id: CampaignId,
    status: LeadStatus,
    priority_inputs: Value,
    lease: Option<Lease>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Lead {
    /// Creates a lead, enforcing status/lease consistency.
    ///
    /// `Locked` requires a lease and every other status forbids one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LeadId,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        status: LeadStatus,
        priority_inputs: Value,
        lease: Option<Lease>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        match (status, lease.as_ref()) {
            (LeadStatus::Locked, None) => {
                return Err(AppError::Validation(format!(
                    "lead '{id}' is locked but carries no lease"
                )));
            }
            (status, Some(_)) if status != LeadStatus::Locked => {
                return Err(AppError::Validation(format!(
                    "lead '{id}' has status '{}' but carries a lease",
                    status.as_str()
                )));
            }
            _ => {}
        }

        Ok(Self {
            id,
            tenant_id,
            campaign_id,
            status,
            priority_inputs,
            lease,
            created_at,
            updated_at,
        })
    }

    /// Returns the lead identifier.
    #[must_use]
    pub fn id(&self) -> LeadId {
        self.id
    }

    /// Returns the owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the owning campaign.
    #[must_use]
    pub fn campaign_id(&self) -> CampaignId {
        self.campaign_id
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> LeadStatus {
        self.status
    }

    /// Returns the scoring attributes owned by the external scorer.
    #[must_use]
    pub fn priority_inputs(&self) -> &Value {
        &self.priority_inputs
    }

    /// Returns the active lease, if any.
    #[must_use]
    pub fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }

    /// Returns when the lead was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the lead was last touched.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the numeric ranking score.
    ///
    /// Reads the `leadScore` member of the priority inputs; absent or
    /// non-numeric values rank as zero.
    #[must_use]
    pub fn priority_score(&self) -> f64 {
        self.priority_inputs
            .get("leadScore")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    /// Returns whether the lead can be handed to a claimant at `now`.
    ///
    /// Eligible means unleased in `New`, or `Locked` under a lease old
    /// enough to be presumed abandoned.
    #[must_use]
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.lease.as_ref()) {
            (LeadStatus::New, None) => true,
            (LeadStatus::Locked, Some(lease)) => lease.is_stale(now),
            _ => false,
        }
    }

    /// Returns a copy leased by `holder` at `now` with status `Locked`.
    #[must_use]
    pub fn with_lease(&self, holder: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut leased = self.clone();
        leased.status = LeadStatus::Locked;
        leased.lease = Some(Lease::new(holder, now));
        leased.updated_at = now;
        leased
    }

    /// Returns a copy with the lease cleared and status reverted to `New`.
    #[must_use]
    pub fn with_lease_cleared(&self, now: DateTime<Utc>) -> Self {
        let mut released = self.clone();
        released.status = LeadStatus::New;
        released.lease = None;
        released.updated_at = now;
        released
    }
}
