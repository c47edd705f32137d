// Service exports
pub mod airtable;
pub mod cache;
pub mod leads;
pub mod memory;
pub mod notifier;
pub mod ports;
pub mod postgres;
pub mod reranker;

pub use airtable::AirtableDirectory;
pub use cache::CachedDirectory;
pub use leads::{LeadError, LeadPipeline, LeadReceipt};
pub use memory::{InMemoryDirectory, InMemoryLedger};
pub use notifier::{LogNotifier, WebhookNotifier};
pub use ports::{
    DirectoryError, DistributionLedger, LeadContact, LeadContext, LedgerError, MatchedSurgeon,
    NotificationDispatcher, NotifyError, RerankError, Reranker, SurgeonDirectory,
};
pub use postgres::PostgresLedger;
pub use reranker::OpenAiReranker;
