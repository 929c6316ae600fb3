use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prospekt_application::{LeadRepository, LockAttempt, UnlockAttempt};
use prospekt_core::{AppError, AppResult, TenantId};
use prospekt_domain::{CampaignId, Lead, LeadId, LeadStatus, Lease};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

mod claim;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed lead work-item store.
///
/// Every mutating operation is one transaction; the claim path relies on
/// `FOR UPDATE SKIP LOCKED` so concurrent claimants never double-assign and
/// never queue behind a row another transaction is mid-claiming.
#[derive(Clone)]
pub struct PostgresLeadRepository {
    pool: PgPool,
}

impl PostgresLeadRepository {
    /// Creates a lead repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LeadRow {
    id: uuid::Uuid,
    tenant_id: uuid::Uuid,
    campaign_id: uuid::Uuid,
    status: String,
    priority_inputs: Value,
    lease_holder: Option<String>,
    lease_acquired_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn lead_from_row(row: LeadRow) -> AppResult<Lead> {
    let lease = match (row.lease_holder, row.lease_acquired_at) {
        (Some(holder), Some(acquired_at)) => Some(Lease::new(holder, acquired_at)),
        (None, None) => None,
        _ => {
            return Err(AppError::Internal(format!(
                "lead '{}' has a half-set lease pair in storage",
                row.id
            )));
        }
    };

    Lead::new(
        LeadId::from_uuid(row.id),
        TenantId::from_uuid(row.tenant_id),
        CampaignId::from_uuid(row.campaign_id),
        LeadStatus::parse(row.status.as_str())?,
        row.priority_inputs,
        lease,
        row.created_at,
        row.updated_at,
    )
    .map_err(|error| AppError::Internal(format!("stored lead violates invariants: {error}")))
}

const SELECT_LEAD_COLUMNS: &str = r#"
    id,
    tenant_id,
    campaign_id,
    status,
    priority_inputs,
    lease_holder,
    lease_acquired_at,
    created_at,
    updated_at
"#;

#[async_trait]
impl LeadRepository for PostgresLeadRepository {
    async fn claim_next(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Lead>> {
        self.claim_next_impl(tenant_id, campaign_id, holder, now)
            .await
    }

    async fn lock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LockAttempt> {
        self.lock_impl(tenant_id, lead_id, holder, now).await
    }

    async fn unlock(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        expected_holder: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<UnlockAttempt> {
        self.unlock_impl(tenant_id, lead_id, expected_holder, now)
            .await
    }

    async fn find_lead(&self, tenant_id: TenantId, lead_id: LeadId) -> AppResult<Option<Lead>> {
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            SELECT {SELECT_LEAD_COLUMNS}
            FROM leads
            WHERE tenant_id = $1
              AND id = $2
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(lead_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load lead '{lead_id}' for tenant '{tenant_id}': {error}"
            ))
        })?;

        row.map(lead_from_row).transpose()
    }

    async fn reclaim_stale(&self, now: DateTime<Utc>) -> AppResult<Vec<Lead>> {
        let rows = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET
                status = 'new',
                lease_holder = NULL,
                lease_acquired_at = NULL,
                updated_at = $1
            WHERE status = 'locked'
              AND lease_acquired_at < $1 - make_interval(secs => $2::INT)
            RETURNING {SELECT_LEAD_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(stale_after_seconds_bind()?)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to reclaim stale leases: {error}"))
        })?;

        rows.into_iter().map(lead_from_row).collect()
    }
}

fn stale_after_seconds_bind() -> AppResult<i32> {
    i32::try_from(prospekt_domain::LEASE_STALE_AFTER_SECONDS).map_err(|error| {
        AppError::Internal(format!("lease staleness threshold out of range: {error}"))
    })
}
