//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_campaign_repository;
mod in_memory_lead_repository;
mod postgres_audit_repository;
mod postgres_campaign_repository;
mod postgres_lead_repository;

pub use in_memory_campaign_repository::InMemoryCampaignRepository;
pub use in_memory_lead_repository::InMemoryLeadRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_campaign_repository::PostgresCampaignRepository;
pub use postgres_lead_repository::PostgresLeadRepository;
