//! Persistence seams
//!
//! [`Store`] holds customers, partners and payments; [`CacheStore`] holds
//! short-lived proof material. Lookups return `Ok(None)` for absent records
//! so callers decide which error a miss becomes.

pub mod memory;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{CustomerRecord, PartnerIdentity, PaymentRecord};

pub use memory::{MemoryCache, MemoryStore};

/// Partner fields supplied at signup
#[derive(Debug, Clone)]
pub struct NewPartner {
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn customer_by_id(&self, id: &str) -> Result<Option<CustomerRecord>>;

    async fn customer_by_account(&self, account: &str) -> Result<Option<CustomerRecord>>;

    async fn partner_by_id(&self, id: &str) -> Result<Option<PartnerIdentity>>;

    async fn partner_by_username(&self, username: &str) -> Result<Option<PartnerIdentity>>;

    async fn partner_by_reference_no(&self, reference_no: &str)
        -> Result<Option<PartnerIdentity>>;

    /// Insert a partner, failing with `InvalidInput` if the username is taken.
    async fn insert_partner(&self, partner: NewPartner) -> Result<PartnerIdentity>;

    async fn insert_payment(&self, payment: PaymentRecord) -> Result<()>;

    async fn payment_by_id(&self, id: &str) -> Result<Option<PaymentRecord>>;
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically read and remove an entry.
    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn delete(&self, key: &str) -> Result<bool>;
}
