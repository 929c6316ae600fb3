//! Application services and ports for lead distribution.

#![forbid(unsafe_code)]

mod access_gate;
mod dispatch_service;
mod lead_ports;
mod reclaim;

pub use access_gate::AccessGate;
pub use dispatch_service::{ClaimOutcome, DispatchService, LockOutcome};
pub use lead_ports::{
    AuditEvent, AuditRepository, CampaignRepository, LeadRepository, LockAttempt, UnlockAttempt,
};
pub use reclaim::ReclaimSweeper;
