use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use prospekt_application::{LeadRepository, LockAttempt, UnlockAttempt};
use prospekt_core::TenantId;
use prospekt_domain::{CampaignId, LeadId, LeadStatus};

use super::PostgresLeadRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres lead tests: {error}");
    }

    Some(pool)
}

async fn ensure_campaign(pool: &PgPool, tenant_id: TenantId, campaign_id: CampaignId) {
    let insert = sqlx::query(
        r#"
        INSERT INTO campaigns (id, tenant_id, name)
        VALUES ($1, $2, 'Test Campaign')
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(campaign_id.as_uuid())
    .bind(tenant_id.as_uuid())
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}

#[allow(clippy::too_many_arguments)]
async fn seed_lead(
    pool: &PgPool,
    tenant_id: TenantId,
    campaign_id: CampaignId,
    score: f64,
    status: LeadStatus,
    lease_holder: Option<&str>,
    lease_acquired_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
) -> LeadId {
    let lead_id = LeadId::new();
    let insert = sqlx::query(
        r#"
        INSERT INTO leads (
            id,
            tenant_id,
            campaign_id,
            status,
            priority_inputs,
            lease_holder,
            lease_acquired_at,
            created_at,
            updated_at
        )
        VALUES ($1, $2, $3, $4, jsonb_build_object('leadScore', $5::DOUBLE PRECISION), $6, $7, $8, $8)
        "#,
    )
    .bind(lead_id.as_uuid())
    .bind(tenant_id.as_uuid())
    .bind(campaign_id.as_uuid())
    .bind(status.as_str())
    .bind(score)
    .bind(lease_holder)
    .bind(lease_acquired_at)
    .bind(updated_at)
    .execute(pool)
    .await;

    assert!(insert.is_ok(), "failed to seed lead: {insert:?}");
    lead_id
}

#[tokio::test]
async fn concurrent_claims_distribute_distinct_leads() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tenant_id = TenantId::new();
    let campaign_id = CampaignId::new();
    ensure_campaign(&pool, tenant_id, campaign_id).await;

    let now = Utc::now();
    for score in [10.0, 20.0, 30.0, 40.0, 50.0] {
        seed_lead(
            &pool,
            tenant_id,
            campaign_id,
            score,
            LeadStatus::New,
            None,
            None,
            now,
        )
        .await;
    }

    let repository = Arc::new(PostgresLeadRepository::new(pool));
    let mut handles = Vec::new();
    for worker in 0..8 {
        let repository = repository.clone();
        let holder = format!("bd-{worker}");
        handles.push(tokio::spawn(async move {
            repository
                .claim_next(tenant_id, campaign_id, holder.as_str(), Utc::now())
                .await
        }));
    }

    let mut claimed_ids = HashSet::new();
    let mut empty_results = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(Some(lead))) => {
                assert!(
                    claimed_ids.insert(lead.id()),
                    "lead {} distributed twice",
                    lead.id()
                );
                assert_eq!(lead.status(), LeadStatus::Locked);
            }
            Ok(Ok(None)) => empty_results += 1,
            Ok(Err(error)) => panic!("claim failed: {error}"),
            Err(error) => panic!("claim task panicked: {error}"),
        }
    }

    assert_eq!(claimed_ids.len(), 5);
    assert_eq!(empty_results, 3);
}

#[tokio::test]
async fn claim_orders_by_score_then_recency_then_age() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tenant_id = TenantId::new();
    let campaign_id = CampaignId::new();
    ensure_campaign(&pool, tenant_id, campaign_id).await;

    let base = Utc::now();
    let ten = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        10.0,
        LeadStatus::New,
        None,
        None,
        base,
    )
    .await;
    let cold_eighty = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        80.0,
        LeadStatus::New,
        None,
        None,
        base,
    )
    .await;
    let warm_eighty = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        80.0,
        LeadStatus::New,
        None,
        None,
        base + TimeDelta::minutes(5),
    )
    .await;
    let five = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        5.0,
        LeadStatus::New,
        None,
        None,
        base,
    )
    .await;

    let repository = PostgresLeadRepository::new(pool);
    for expected_id in [warm_eighty, cold_eighty, ten, five] {
        let claimed = repository
            .claim_next(tenant_id, campaign_id, "bd-1", Utc::now())
            .await;
        assert!(
            matches!(&claimed, Ok(Some(lead)) if lead.id() == expected_id),
            "expected lead {expected_id}, got {claimed:?}"
        );
    }

    let drained = repository
        .claim_next(tenant_id, campaign_id, "bd-1", Utc::now())
        .await;
    assert!(matches!(drained, Ok(None)));
}

#[tokio::test]
async fn stale_leases_are_claimable_and_fresh_ones_are_not() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tenant_id = TenantId::new();
    let campaign_id = CampaignId::new();
    ensure_campaign(&pool, tenant_id, campaign_id).await;

    let now = Utc::now();
    seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        50.0,
        LeadStatus::Locked,
        Some("bd-1"),
        Some(now - TimeDelta::minutes(29)),
        now,
    )
    .await;
    let stale = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        40.0,
        LeadStatus::Locked,
        Some("bd-1"),
        Some(now - TimeDelta::minutes(31)),
        now,
    )
    .await;

    let repository = PostgresLeadRepository::new(pool);
    let claimed = repository
        .claim_next(tenant_id, campaign_id, "bd-2", Utc::now())
        .await;
    assert!(
        matches!(&claimed, Ok(Some(lead))
            if lead.id() == stale
                && matches!(lead.lease(), Some(lease) if lease.holder() == "bd-2")),
        "expected the stale lead despite its lower score, got {claimed:?}"
    );

    let drained = repository
        .claim_next(tenant_id, campaign_id, "bd-2", Utc::now())
        .await;
    assert!(matches!(drained, Ok(None)));
}

#[tokio::test]
async fn lock_and_unlock_enforce_lease_ownership() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tenant_id = TenantId::new();
    let campaign_id = CampaignId::new();
    ensure_campaign(&pool, tenant_id, campaign_id).await;

    let now = Utc::now();
    let lead_id = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        10.0,
        LeadStatus::New,
        None,
        None,
        now,
    )
    .await;

    let repository = PostgresLeadRepository::new(pool);

    let locked = repository.lock(tenant_id, lead_id, "bd-1", Utc::now()).await;
    assert!(matches!(locked, Ok(LockAttempt::Locked(_))));

    let contended = repository.lock(tenant_id, lead_id, "bd-2", Utc::now()).await;
    assert!(
        matches!(&contended, Ok(LockAttempt::AlreadyLeased { holder }) if holder == "bd-1"),
        "expected conflict, got {contended:?}"
    );

    let guarded = repository
        .unlock(tenant_id, lead_id, Some("bd-2"), Utc::now())
        .await;
    assert!(
        matches!(&guarded, Ok(UnlockAttempt::NotHolder { holder }) if holder == "bd-1"),
        "expected holder guard, got {guarded:?}"
    );

    let released = repository
        .unlock(tenant_id, lead_id, Some("bd-1"), Utc::now())
        .await;
    assert!(
        matches!(&released, Ok(UnlockAttempt::Unlocked { lead, released: true })
            if lead.lease().is_none() && lead.status() == LeadStatus::New),
        "expected release, got {released:?}"
    );

    // Second unlock is a no-op success and reports no lease cleared.
    let repeated = repository
        .unlock(tenant_id, lead_id, Some("bd-1"), Utc::now())
        .await;
    assert!(matches!(
        repeated,
        Ok(UnlockAttempt::Unlocked {
            released: false,
            ..
        })
    ));

    let missing = repository
        .unlock(tenant_id, LeadId::new(), None, Utc::now())
        .await;
    assert!(matches!(missing, Ok(UnlockAttempt::NotFound)));
}

#[tokio::test]
async fn reclaim_stale_reverts_only_expired_leases() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tenant_id = TenantId::new();
    let campaign_id = CampaignId::new();
    ensure_campaign(&pool, tenant_id, campaign_id).await;

    let now = Utc::now();
    let fresh = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        10.0,
        LeadStatus::Locked,
        Some("bd-1"),
        Some(now - TimeDelta::minutes(5)),
        now,
    )
    .await;
    let stale = seed_lead(
        &pool,
        tenant_id,
        campaign_id,
        10.0,
        LeadStatus::Locked,
        Some("bd-1"),
        Some(now - TimeDelta::minutes(45)),
        now,
    )
    .await;

    let repository = PostgresLeadRepository::new(pool);
    let reverted = repository.reclaim_stale(Utc::now()).await;
    let Ok(reverted) = reverted else {
        panic!("reclaim failed: {reverted:?}");
    };

    let reverted_ids: Vec<_> = reverted
        .iter()
        .filter(|lead| lead.tenant_id() == tenant_id)
        .map(|lead| lead.id())
        .collect();
    assert_eq!(reverted_ids, vec![stale]);

    let untouched = repository.find_lead(tenant_id, fresh).await;
    assert!(
        matches!(&untouched, Ok(Some(lead)) if lead.status() == LeadStatus::Locked),
        "fresh lease must survive the sweep"
    );
}
