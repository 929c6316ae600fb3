use async_trait::async_trait;
use prospekt_application::CampaignRepository;
use prospekt_core::{AppError, AppResult, TenantId};
use prospekt_domain::CampaignId;
use sqlx::PgPool;

/// PostgreSQL-backed campaign and membership lookups.
#[derive(Clone)]
pub struct PostgresCampaignRepository {
    pool: PgPool,
}

impl PostgresCampaignRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn campaign_exists(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM campaigns
                WHERE tenant_id = $1
                  AND id = $2
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(campaign_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to check campaign '{campaign_id}' in tenant '{tenant_id}': {error}"
            ))
        })
    }

    async fn assignment_exists(
        &self,
        tenant_id: TenantId,
        subject: &str,
        campaign_id: CampaignId,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM campaign_assignments
                WHERE tenant_id = $1
                  AND subject = $2
                  AND campaign_id = $3
            )
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(subject)
        .bind(campaign_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to check assignment for '{subject}' on campaign '{campaign_id}': {error}"
            ))
        })
    }
}
