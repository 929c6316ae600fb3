//! Ports between lead distribution services and their adapters.

mod audit;
mod repository;

pub use audit::{AuditEvent, AuditRepository};
pub use repository::{CampaignRepository, LeadRepository, LockAttempt, UnlockAttempt};
