use std::collections::HashSet;

use async_trait::async_trait;
use prospekt_application::CampaignRepository;
use prospekt_core::{AppResult, TenantId};
use prospekt_domain::CampaignId;
use tokio::sync::RwLock;

/// In-memory campaign and membership lookups for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryCampaignRepository {
    campaigns: RwLock<HashSet<(TenantId, CampaignId)>>,
    assignments: RwLock<HashSet<(TenantId, String, CampaignId)>>,
}

impl InMemoryCampaignRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            campaigns: RwLock::new(HashSet::new()),
            assignments: RwLock::new(HashSet::new()),
        }
    }

    /// Registers one campaign in a tenant.
    pub async fn insert_campaign(&self, tenant_id: TenantId, campaign_id: CampaignId) {
        self.campaigns.write().await.insert((tenant_id, campaign_id));
    }

    /// Grants one subject visibility into a campaign.
    pub async fn insert_assignment(
        &self,
        tenant_id: TenantId,
        subject: impl Into<String>,
        campaign_id: CampaignId,
    ) {
        self.assignments
            .write()
            .await
            .insert((tenant_id, subject.into(), campaign_id));
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn campaign_exists(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> AppResult<bool> {
        Ok(self
            .campaigns
            .read()
            .await
            .contains(&(tenant_id, campaign_id)))
    }

    async fn assignment_exists(
        &self,
        tenant_id: TenantId,
        subject: &str,
        campaign_id: CampaignId,
    ) -> AppResult<bool> {
        Ok(self
            .assignments
            .read()
            .await
            .contains(&(tenant_id, subject.to_owned(), campaign_id)))
    }
}
