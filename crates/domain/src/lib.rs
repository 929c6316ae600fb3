//! Domain entities and invariants for lead distribution.

#![forbid(unsafe_code)]

mod audit;
mod lead;
mod priority;

pub use audit::LeaseAuditAction;
pub use lead::{
    CampaignId, LEASE_STALE_AFTER_SECONDS, Lead, LeadId, LeadStatus, Lease, lease_stale_after,
};
pub use priority::{compare_priority, select_best};
