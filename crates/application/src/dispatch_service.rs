use std::sync::Arc;

use chrono::Utc;
use prospekt_core::{ActorIdentity, AppError, AppResult};
use prospekt_domain::{CampaignId, Lead, LeadId, LeaseAuditAction};
use tracing::debug;

use crate::{
    AccessGate, AuditEvent, AuditRepository, CampaignRepository, LeadRepository, LockAttempt,
    UnlockAttempt,
};

/// Result of asking for the next lead.
///
/// An empty queue is a normal outcome, not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// One lead was claimed for the actor.
    Claimed(Lead),
    /// No eligible lead exists in the campaign right now.
    NoneAvailable,
}

/// Result of a manual lock request.
#[derive(Debug, Clone, PartialEq)]
pub enum LockOutcome {
    /// The lead is now leased by the actor.
    Locked(Lead),
    /// A fresh lease is held by someone else; try again later.
    AlreadyLeased {
        /// Subject currently holding the lease.
        holder: String,
    },
}

/// Orchestrates gate, claim, and audit for lead distribution.
#[derive(Clone)]
pub struct DispatchService {
    access_gate: AccessGate,
    leads: Arc<dyn LeadRepository>,
    campaigns: Arc<dyn CampaignRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl DispatchService {
    /// Creates a dispatch service over the store, gate, and audit sink.
    #[must_use]
    pub fn new(
        access_gate: AccessGate,
        leads: Arc<dyn LeadRepository>,
        campaigns: Arc<dyn CampaignRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            access_gate,
            leads,
            campaigns,
            audit_repository,
        }
    }

    /// Claims the next eligible lead in a campaign for the actor.
    ///
    /// Checks campaign existence, then authorization, then performs the
    /// atomic claim and appends one audit entry on success.
    pub async fn claim_next(
        &self,
        actor: &ActorIdentity,
        campaign_id: CampaignId,
    ) -> AppResult<ClaimOutcome> {
        let tenant_id = actor.tenant_id();

        if !self.campaigns.campaign_exists(tenant_id, campaign_id).await? {
            return Err(AppError::NotFound(format!(
                "campaign '{campaign_id}' does not exist in tenant '{tenant_id}'"
            )));
        }

        self.access_gate.authorize(actor, campaign_id).await?;

        let claimed = self
            .leads
            .claim_next(tenant_id, campaign_id, actor.subject(), Utc::now())
            .await?;

        let Some(lead) = claimed else {
            debug!(
                campaign_id = %campaign_id,
                subject = actor.subject(),
                "no eligible lead available"
            );
            return Ok(ClaimOutcome::NoneAvailable);
        };

        self.append_audit(actor, LeaseAuditAction::Claimed, &lead)
            .await?;

        Ok(ClaimOutcome::Claimed(lead))
    }

    /// Leases one specific lead for the actor.
    pub async fn lock(&self, actor: &ActorIdentity, lead_id: LeadId) -> AppResult<LockOutcome> {
        let tenant_id = actor.tenant_id();

        let Some(existing) = self.leads.find_lead(tenant_id, lead_id).await? else {
            return Err(AppError::NotFound(format!(
                "lead '{lead_id}' does not exist in tenant '{tenant_id}'"
            )));
        };

        self.access_gate
            .authorize(actor, existing.campaign_id())
            .await?;

        let attempt = self
            .leads
            .lock(tenant_id, lead_id, actor.subject(), Utc::now())
            .await?;

        match attempt {
            LockAttempt::Locked(lead) => {
                self.append_audit(actor, LeaseAuditAction::ManuallyLocked, &lead)
                    .await?;
                Ok(LockOutcome::Locked(lead))
            }
            LockAttempt::AlreadyLeased { holder } => {
                debug!(
                    lead_id = %lead_id,
                    holder = holder.as_str(),
                    "lock attempt lost to an active lease"
                );
                Ok(LockOutcome::AlreadyLeased { holder })
            }
            // The lead vanished between find and lock; surface the same
            // not-found the caller would have seen a moment earlier.
            LockAttempt::NotFound => Err(AppError::NotFound(format!(
                "lead '{lead_id}' does not exist in tenant '{tenant_id}'"
            ))),
        }
    }

    /// Releases the lease on one lead and reverts it to `New`.
    ///
    /// Permitted for the current holder or an elevated role. Unlocking an
    /// already-unleased lead succeeds without changing anything.
    pub async fn unlock(&self, actor: &ActorIdentity, lead_id: LeadId) -> AppResult<Lead> {
        let tenant_id = actor.tenant_id();

        let Some(existing) = self.leads.find_lead(tenant_id, lead_id).await? else {
            return Err(AppError::NotFound(format!(
                "lead '{lead_id}' does not exist in tenant '{tenant_id}'"
            )));
        };

        self.access_gate
            .authorize(actor, existing.campaign_id())
            .await?;

        let elevated = actor.role().is_elevated();
        if !elevated
            && let Some(lease) = existing.lease()
            && lease.holder() != actor.subject()
        {
            return Err(AppError::Forbidden(format!(
                "subject '{}' does not hold the lease on lead '{lead_id}'",
                actor.subject()
            )));
        }

        let expected_holder = if elevated { None } else { Some(actor.subject()) };

        let attempt = self
            .leads
            .unlock(tenant_id, lead_id, expected_holder, Utc::now())
            .await?;

        match attempt {
            // `released` comes from inside the repository's atomic unit;
            // the snapshot read above may be stale by the time the row is
            // actually touched.
            UnlockAttempt::Unlocked { lead, released } => {
                if released {
                    self.append_audit(actor, LeaseAuditAction::Unlocked, &lead)
                        .await?;
                }
                Ok(lead)
            }
            UnlockAttempt::NotHolder { .. } => Err(AppError::Forbidden(format!(
                "subject '{}' does not hold the lease on lead '{lead_id}'",
                actor.subject()
            ))),
            UnlockAttempt::NotFound => Err(AppError::NotFound(format!(
                "lead '{lead_id}' does not exist in tenant '{tenant_id}'"
            ))),
        }
    }

    async fn append_audit(
        &self,
        actor: &ActorIdentity,
        action: LeaseAuditAction,
        lead: &Lead,
    ) -> AppResult<()> {
        // The lease mutation is already durable at this point; an audit
        // failure must not be mistaken for a retryable claim failure.
        self.audit_repository
            .append_event(AuditEvent {
                tenant_id: actor.tenant_id(),
                subject: actor.subject().to_owned(),
                action,
                lead_id: lead.id(),
                detail: None,
            })
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "lease change on lead '{}' committed but audit append failed: {error}",
                    lead.id()
                ))
            })
    }
}
