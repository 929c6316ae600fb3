use super::*;

impl PostgresLeadRepository {
    pub(super) async fn claim_next_impl(
        &self,
        tenant_id: TenantId,
        campaign_id: CampaignId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Lead>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start lead claim transaction: {error}"))
        })?;

        // Selection and claim are one statement. The candidate select orders
        // by the same keys as the domain comparator and takes the row lock
        // with SKIP LOCKED, so a contender mid-claim on the best row makes
        // us fall through to the next-best instead of blocking or
        // double-assigning.
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            WITH candidate_leads AS (
                SELECT id
                FROM leads
                WHERE tenant_id = $1
                  AND campaign_id = $2
                  AND (
                        status = 'new'
                        OR (
                            status = 'locked'
                            AND lease_acquired_at < $4 - make_interval(secs => $5::INT)
                        )
                      )
                ORDER BY
                    CASE
                        WHEN jsonb_typeof(priority_inputs -> 'leadScore') = 'number'
                            THEN (priority_inputs ->> 'leadScore')::DOUBLE PRECISION
                        ELSE 0
                    END DESC,
                    updated_at DESC,
                    created_at ASC,
                    id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE leads
            SET
                status = 'locked',
                lease_holder = $3,
                lease_acquired_at = $4,
                updated_at = $4
            FROM candidate_leads
            WHERE leads.id = candidate_leads.id
            RETURNING
                leads.id,
                leads.tenant_id,
                leads.campaign_id,
                leads.status,
                leads.priority_inputs,
                leads.lease_holder,
                leads.lease_acquired_at,
                leads.created_at,
                leads.updated_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(campaign_id.as_uuid())
        .bind(holder)
        .bind(now)
        .bind(stale_after_seconds_bind()?)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to claim next lead in campaign '{campaign_id}' for '{holder}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit lead claim transaction: {error}"))
        })?;

        row.map(lead_from_row).transpose()
    }

    pub(super) async fn lock_impl(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        holder: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LockAttempt> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start lead lock transaction: {error}"))
        })?;

        // Plain FOR UPDATE here: a targeted lock should wait out a
        // concurrent writer on this one row, then see its final state.
        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            SELECT {SELECT_LEAD_COLUMNS}
            FROM leads
            WHERE tenant_id = $1
              AND id = $2
            FOR UPDATE
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(lead_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load lead '{lead_id}' for locking: {error}"
            ))
        })?;

        let Some(row) = row else {
            transaction.rollback().await.ok();
            return Ok(LockAttempt::NotFound);
        };
        let existing = lead_from_row(row)?;

        if let Some(lease) = existing.lease()
            && !lease.is_stale(now)
            && lease.holder() != holder
        {
            transaction.rollback().await.ok();
            return Ok(LockAttempt::AlreadyLeased {
                holder: lease.holder().to_owned(),
            });
        }

        let updated = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET
                status = 'locked',
                lease_holder = $3,
                lease_acquired_at = $4,
                updated_at = $4
            WHERE tenant_id = $1
              AND id = $2
            RETURNING {SELECT_LEAD_COLUMNS}
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(lead_id.as_uuid())
        .bind(holder)
        .bind(now)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to lock lead '{lead_id}' for '{holder}': {error}"
            ))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit lead lock transaction: {error}"))
        })?;

        Ok(LockAttempt::Locked(lead_from_row(updated)?))
    }

    pub(super) async fn unlock_impl(
        &self,
        tenant_id: TenantId,
        lead_id: LeadId,
        expected_holder: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<UnlockAttempt> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start lead unlock transaction: {error}"))
        })?;

        let row = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            SELECT {SELECT_LEAD_COLUMNS}
            FROM leads
            WHERE tenant_id = $1
              AND id = $2
            FOR UPDATE
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(lead_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load lead '{lead_id}' for unlocking: {error}"
            ))
        })?;

        let Some(row) = row else {
            transaction.rollback().await.ok();
            return Ok(UnlockAttempt::NotFound);
        };
        let existing = lead_from_row(row)?;

        let Some(lease) = existing.lease() else {
            // Already unleased: idempotent no-op success.
            transaction.rollback().await.ok();
            return Ok(UnlockAttempt::Unlocked {
                lead: existing,
                released: false,
            });
        };

        if let Some(expected) = expected_holder
            && lease.holder() != expected
        {
            let holder = lease.holder().to_owned();
            transaction.rollback().await.ok();
            return Ok(UnlockAttempt::NotHolder { holder });
        }

        let updated = sqlx::query_as::<_, LeadRow>(&format!(
            r#"
            UPDATE leads
            SET
                status = 'new',
                lease_holder = NULL,
                lease_acquired_at = NULL,
                updated_at = $3
            WHERE tenant_id = $1
              AND id = $2
            RETURNING {SELECT_LEAD_COLUMNS}
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(lead_id.as_uuid())
        .bind(now)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to unlock lead '{lead_id}': {error}"))
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit lead unlock transaction: {error}"))
        })?;

        Ok(UnlockAttempt::Unlocked {
            lead: lead_from_row(updated)?,
            released: true,
        })
    }
}
