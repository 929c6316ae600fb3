use std::sync::Arc;

use prospekt_core::{ActorIdentity, ActorRole, AppError, AppResult};
use prospekt_domain::CampaignId;

use crate::CampaignRepository;

/// Campaign-scoped authorization check for lease operations.
///
/// Pure lookup, no side effects. Campaign existence is a separate concern
/// surfaced by the dispatch service.
#[derive(Clone)]
pub struct AccessGate {
    campaigns: Arc<dyn CampaignRepository>,
}

impl AccessGate {
    /// Creates a gate over the campaign membership relation.
    #[must_use]
    pub fn new(campaigns: Arc<dyn CampaignRepository>) -> Self {
        Self { campaigns }
    }

    /// Ensures the actor may claim, lock, or unlock leads in the campaign.
    ///
    /// Elevated roles always pass; ordinary workers need an assignment row.
    pub async fn authorize(
        &self,
        actor: &ActorIdentity,
        campaign_id: CampaignId,
    ) -> AppResult<()> {
        match actor.role() {
            ActorRole::Administrator | ActorRole::Manager => Ok(()),
            ActorRole::BusinessDeveloper => {
                let assigned = self
                    .campaigns
                    .assignment_exists(actor.tenant_id(), actor.subject(), campaign_id)
                    .await?;

                if assigned {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(format!(
                        "subject '{}' is not assigned to campaign '{campaign_id}'",
                        actor.subject()
                    )))
                }
            }
        }
    }
}
