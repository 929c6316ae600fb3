use async_trait::async_trait;
use prospekt_core::{AppResult, TenantId};
use prospekt_domain::{LeadId, LeaseAuditAction};

/// Immutable lead-touched event emitted on every lease transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Tenant scope for the event.
    pub tenant_id: TenantId,
    /// Subject that performed the action.
    pub subject: String,
    /// Stable lease action identifier.
    pub action: LeaseAuditAction,
    /// Lead the action touched.
    pub lead_id: LeadId,
    /// Optional audit detail payload.
    pub detail: Option<String>,
}

/// Port for persisting append-only lease audit events.
///
/// Owned by the external audit collaborator; write-only from this engine.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
