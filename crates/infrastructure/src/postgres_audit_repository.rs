use async_trait::async_trait;
use prospekt_application::{AuditEvent, AuditRepository};
use prospekt_core::{AppError, AppResult};
use sqlx::PgPool;

/// PostgreSQL-backed append-only lease audit repository.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lead_audit_entries (
                tenant_id,
                subject,
                action,
                lead_id,
                detail
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.tenant_id.as_uuid())
        .bind(event.subject)
        .bind(event.action.as_str())
        .bind(event.lead_id.as_uuid())
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to append lease audit event: {error}"))
        })?;

        Ok(())
    }
}
