//! Data models.

pub mod config;
pub mod record;

pub use config::PolicebookConfig;
pub use record::{Buyer, PurchaseRecord, SequencedPurchase};
