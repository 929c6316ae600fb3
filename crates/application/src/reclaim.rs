use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use prospekt_core::AppResult;
use prospekt_domain::LeaseAuditAction;

use crate::{AuditEvent, AuditRepository, LeadRepository};

/// Subject recorded on audit entries written by the sweeper.
const SWEEPER_SUBJECT: &str = "reclaim-sweeper";

/// Periodic housekeeping loop that reverts stale leases.
///
/// Claim-time eligibility already treats stale leases as claimable; the
/// sweeper only keeps dashboards honest and emits reclaim audit entries
/// eagerly. Owned by the process lifecycle: [`ReclaimSweeper::start`] spawns
/// the loop and the returned handle is the only way to stop it.
pub struct ReclaimSweeper {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReclaimSweeper {
    /// Starts the sweep loop with one pass every `interval`.
    #[must_use]
    pub fn start(
        leads: Arc<dyn LeadRepository>,
        audit_repository: Arc<dyn AuditRepository>,
        interval: Duration,
    ) -> Self {
        let (shutdown, mut shutdown_signal) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(error) = sweep_once(leads.as_ref(), audit_repository.as_ref()).await {
                            warn!(error = %error, "reclaim sweep failed; will retry next tick");
                        }
                    }
                    changed = shutdown_signal.changed() => {
                        if changed.is_err() || *shutdown_signal.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        Self { shutdown, task }
    }

    /// Signals the loop to stop and waits for the in-flight pass to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(error) = self.task.await {
            warn!(error = %error, "reclaim sweeper task did not shut down cleanly");
        }
    }
}

async fn sweep_once(
    leads: &dyn LeadRepository,
    audit_repository: &dyn AuditRepository,
) -> AppResult<()> {
    let reverted = leads.reclaim_stale(Utc::now()).await?;
    if reverted.is_empty() {
        return Ok(());
    }

    info!(reclaimed = reverted.len(), "reclaimed stale leases");

    for lead in reverted {
        let appended = audit_repository
            .append_event(AuditEvent {
                tenant_id: lead.tenant_id(),
                subject: SWEEPER_SUBJECT.to_owned(),
                action: LeaseAuditAction::Reclaimed,
                lead_id: lead.id(),
                detail: None,
            })
            .await;

        // The lease is already reverted, so a skipped entry never gets
        // re-emitted on a later tick; keep going for the rest of the batch.
        if let Err(error) = appended {
            warn!(
                lead_id = %lead.id(),
                error = %error,
                "failed to append reclaim audit entry"
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, Utc};
    use serde_json::json;
    use tokio::sync::Mutex;

    use prospekt_core::{AppError, AppResult, TenantId};
    use prospekt_domain::{
        CampaignId, Lead, LeadId, LeadStatus, Lease, LeaseAuditAction,
    };

    use crate::{
        AuditEvent, AuditRepository, LeadRepository, LockAttempt, UnlockAttempt,
    };

    use super::ReclaimSweeper;

    #[derive(Default)]
    struct RecordingAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for RecordingAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct StaleLeadRepository {
        leads: Mutex<Vec<Lead>>,
    }

    #[async_trait]
    impl LeadRepository for StaleLeadRepository {
        async fn claim_next(
            &self,
            _tenant_id: TenantId,
            _campaign_id: CampaignId,
            _holder: &str,
            _now: DateTime<Utc>,
        ) -> AppResult<Option<Lead>> {
            Ok(None)
        }

        async fn lock(
            &self,
            _tenant_id: TenantId,
            _lead_id: LeadId,
            _holder: &str,
            _now: DateTime<Utc>,
        ) -> AppResult<LockAttempt> {
            Ok(LockAttempt::NotFound)
        }

        async fn unlock(
            &self,
            _tenant_id: TenantId,
            _lead_id: LeadId,
            _expected_holder: Option<&str>,
            _now: DateTime<Utc>,
        ) -> AppResult<UnlockAttempt> {
            Ok(UnlockAttempt::NotFound)
        }

        async fn find_lead(
            &self,
            _tenant_id: TenantId,
            _lead_id: LeadId,
        ) -> AppResult<Option<Lead>> {
            Ok(None)
        }

        async fn reclaim_stale(&self, now: DateTime<Utc>) -> AppResult<Vec<Lead>> {
            let mut leads = self.leads.lock().await;
            let mut reverted = Vec::new();
            for lead in leads.iter_mut() {
                if lead.lease().is_some_and(|lease| lease.is_stale(now)) {
                    *lead = lead.with_lease_cleared(now);
                    reverted.push(lead.clone());
                }
            }
            Ok(reverted)
        }
    }

    #[allow(clippy::unwrap_used)]
    fn stale_lead() -> Lead {
        let now = Utc::now();
        Lead::new(
            LeadId::new(),
            TenantId::new(),
            CampaignId::new(),
            LeadStatus::Locked,
            json!({}),
            Some(Lease::new("bd-1", now - TimeDelta::minutes(45))),
            now,
            now,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sweeper_reverts_stale_leases_and_emits_audit_entries() {
        let lead = stale_lead();
        let leads = Arc::new(StaleLeadRepository {
            leads: Mutex::new(vec![lead.clone()]),
        });
        let audit = Arc::new(RecordingAuditRepository::default());

        let sweeper = ReclaimSweeper::start(
            leads.clone(),
            audit.clone(),
            Duration::from_millis(10),
        );

        // First tick fires immediately; give it room to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.stop().await;

        let reverted = leads.leads.lock().await;
        assert!(matches!(reverted.first(), Some(lead) if lead.lease().is_none()));
        assert_eq!(reverted.first().map(Lead::status), Some(LeadStatus::New));

        let events = audit.events.lock().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events.first(),
            Some(event)
                if event.action == LeaseAuditAction::Reclaimed
                    && event.lead_id == lead.id()
                    && event.subject == "reclaim-sweeper"
        ));
    }

    /// Audit sink that rejects the first `failures_left` appends.
    struct FlakyAuditRepository {
        failures_left: Mutex<u32>,
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for FlakyAuditRepository {
        async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
            let mut failures_left = self.failures_left.lock().await;
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(AppError::Internal("audit sink unavailable".to_owned()));
            }
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_failed_audit_append_does_not_drop_the_rest_of_the_batch() {
        let first = stale_lead();
        let second = stale_lead();
        let leads = Arc::new(StaleLeadRepository {
            leads: Mutex::new(vec![first.clone(), second.clone()]),
        });
        let audit = Arc::new(FlakyAuditRepository {
            failures_left: Mutex::new(1),
            events: Mutex::new(Vec::new()),
        });

        let sweeper = ReclaimSweeper::start(
            leads.clone(),
            audit.clone(),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        sweeper.stop().await;

        let reverted = leads.leads.lock().await;
        assert!(reverted.iter().all(|lead| lead.lease().is_none()));

        let events = audit.events.lock().await;
        assert_eq!(events.len(), 1, "the second entry must survive the first failure");
        assert_eq!(events.first().map(|event| event.lead_id), Some(second.id()));
    }

    #[tokio::test]
    async fn stop_terminates_the_loop() {
        let leads = Arc::new(StaleLeadRepository {
            leads: Mutex::new(Vec::new()),
        });
        let audit = Arc::new(RecordingAuditRepository::default());

        let sweeper = ReclaimSweeper::start(leads, audit, Duration::from_secs(3600));
        sweeper.stop().await;
    }
}
