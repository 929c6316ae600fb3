use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prospekt_application::{LeadRepository, LockAttempt, UnlockAttempt};
use prospekt_core::{AppResult, TenantId};
use prospekt_domain::{CampaignId, Lead, LeadId, select_best};
use tokio::sync::RwLock;

/// In-memory lead store for tests and local runs.
///
/// One write-lock acquisition spans select-and-mark, giving the same
/// exclusivity the Postgres adapter gets from row locks.
#[derive(Debug, Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<LeadId, Lead>>,
}

impl InMemoryLeadRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            leads: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds one lead, replacing any lead with the same id.
    pub async fn insert_lead(&self, lead: Lead) {
        self.leads.write().await.insert(lead.id(), lead);
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn claim_next(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Lead>> {
        let mut leads = self.leads.write().await;

        let best_id = {
            let eligible = leads.values().filter(|lead| {
                lead.tenant_id() == tenant_id
                    && lead.campaign_id() == campaign_id
                    && lead.is_eligible(now)
            });
            select_best(eligible).map(Lead::id)
        };

        let Some(best_id) = best_id else {
            return Ok(None);
        };

        let claimed = leads
            .get(&best_id)
            .map(|lead| lead.with_lease(holder, now));
        if let Some(claimed) = claimed {
            leads.insert(best_id, claimed.clone());
            return Ok(Some(claimed));
        }

        Ok(None)
    }

    async fn lock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LockAttempt> {
        let mut leads = self.leads.write().await;

        let Some(existing) = leads
            .get(&lead_id)
            .filter(|lead| lead.tenant_id() == tenant_id)
        else {
            return Ok(LockAttempt::NotFound);
        };

        if let Some(lease) = existing.lease()
            && !lease.is_stale(now)
            && lease.holder() != holder
        {
            return Ok(LockAttempt::AlreadyLeased {
                holder: lease.holder().to_owned(),
            });
        }

        let locked = existing.with_lease(holder, now);
        leads.insert(lead_id, locked.clone());
        Ok(LockAttempt::Locked(locked))
    }

    async fn unlock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        expected_holder: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<UnlockAttempt> {
        let mut leads = self.leads.write().await;

        let Some(existing) = leads
            .get(&lead_id)
            .filter(|lead| lead.tenant_id() == tenant_id)
        else {
            return Ok(UnlockAttempt::NotFound);
        };

        let Some(lease) = existing.lease() else {
            return Ok(UnlockAttempt::Unlocked {
                lead: existing.clone(),
                released: false,
            });
        };

        if let Some(expected) = expected_holder
            && lease.holder() != expected
        {
            return Ok(UnlockAttempt::NotHolder {
                holder: lease.holder().to_owned(),
            });
        }

        let cleared = existing.with_lease_cleared(now);
        leads.insert(lead_id, cleared.clone());
        Ok(UnlockAttempt::Unlocked {
            lead: cleared,
            released: true,
        })
    }

    async fn find_lead(&self, tenant_id: TenantId, lead_id: LeadId) -> AppResult<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .await
            .get(&lead_id)
            .filter(|lead| lead.tenant_id() == tenant_id)
            .cloned())
    }

    async fn reclaim_stale(&self, now: DateTime<Utc>) -> AppResult<Vec<Lead>> {
        let mut leads = self.leads.write().await;

        let stale_ids: Vec<LeadId> = leads
            .values()
            .filter(|lead| lead.lease().is_some_and(|lease| lease.is_stale(now)))
            .map(Lead::id)
            .collect();

        let mut reverted = Vec::with_capacity(stale_ids.len());
        for lead_id in stale_ids {
            if let Some(existing) = leads.get(&lead_id) {
                let released = existing.with_lease_cleared(now);
                leads.insert(lead_id, released.clone());
                reverted.push(released);
            }
        }

        Ok(reverted)
    }
}
