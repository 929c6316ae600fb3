use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prospekt_core::{AppResult, TenantId};
use prospekt_domain::{CampaignId, Lead, LeadId};

/// Result of a targeted lock attempt.
///
/// `AlreadyLeased` is a contention outcome, not an error; callers branch on
/// it.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAttempt {
    /// The lead is now leased by the requesting actor.
    Locked(Lead),
    /// A fresh lease is held by someone else.
    AlreadyLeased {
        /// Subject currently holding the lease.
        holder: String,
    },
    /// No lead exists with the requested id.
    NotFound,
}

/// Result of an unlock attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UnlockAttempt {
    /// The lead is unleased after the attempt.
    ///
    /// `released` is decided inside the adapter's atomic unit, so callers
    /// can tell a real clear from a no-op without re-reading the row.
    Unlocked {
        /// The lead after the attempt.
        lead: Lead,
        /// Whether this call actually cleared a lease.
        released: bool,
    },
    /// The guarded holder no longer matches the lease.
    NotHolder {
        /// Subject currently holding the lease.
        holder: String,
    },
    /// No lead exists with the requested id.
    NotFound,
}

/// Repository port for the lead work-item store.
///
/// Adapters supply the atomicity: each mutating operation is one atomic unit
/// against the store, so no caller ever observes a half-written lease. The
/// Postgres adapter uses row locks with skip semantics; the in-memory adapter
/// serializes on one mutex.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Claims the highest-priority eligible lead in a campaign for `holder`.
    ///
    /// Eligible means unleased in `New`, or carrying a lease stale at `now`.
    /// Selection and claim happen inside the same atomic unit; concurrent
    /// claimants skip rows mid-claim by another transaction instead of
    /// blocking behind them. Returns `None` when the queue is empty.
    async fn claim_next(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Lead>>;

    /// Leases one specific lead for `holder`.
    ///
    /// Succeeds when the lead is unleased, already held by `holder` (the
    /// lease timestamp refreshes), or held under a stale lease (takeover).
    async fn lock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LockAttempt>;

    /// Clears the lease on one lead and reverts it to `New`.
    ///
    /// When `expected_holder` is set the clear only happens while that
    /// subject still holds the lease; `None` clears unconditionally
    /// (elevated callers). Unlocking an unleased lead is a no-op success.
    async fn unlock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        expected_holder: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<UnlockAttempt>;

    /// Returns one lead by id.
    async fn find_lead(&self, tenant_id: TenantId, lead_id: LeadId) -> AppResult<Option<Lead>>;

    /// Reverts every lead whose lease is stale at `now` back to `New`.
    ///
    /// Housekeeping for the sweeper; claim-time eligibility does not depend
    /// on it. Returns the reverted leads so audit entries can be emitted.
    async fn reclaim_stale(&self, now: DateTime<Utc>) -> AppResult<Vec<Lead>>;
}

/// Repository port for campaign and membership lookups.
///
/// Both relations are owned by campaign-management functionality outside
/// this engine; reads only.
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Returns whether a campaign exists in the tenant.
    async fn campaign_exists(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> AppResult<bool>;

    /// Returns whether a subject holds an assignment for the campaign.
    async fn assignment_exists(
        &self,
        tenant_id: TenantId,
        subject: &str,
        campaign_id: CampaignId,
    ) -> AppResult<bool>;
}
