//! In-memory store and cache

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{CacheStore, NewPartner, Store};
use crate::error::{GatewayError, Result};
use crate::types::{CustomerRecord, PartnerIdentity, PaymentRecord};

#[derive(Default)]
pub struct MemoryStore {
    customers: RwLock<HashMap<String, CustomerRecord>>,
    partners: RwLock<HashMap<String, PartnerIdentity>>,
    payments: RwLock<HashMap<String, PaymentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_customer(&self, customer: CustomerRecord) {
        self.customers
            .write()
            .await
            .insert(customer.id.clone(), customer);
    }

    pub async fn add_partner(&self, partner: PartnerIdentity) {
        self.partners
            .write()
            .await
            .insert(partner.id.clone(), partner);
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn customer_by_id(&self, id: &str) -> Result<Option<CustomerRecord>> {
        Ok(self.customers.read().await.get(id).cloned())
    }

    async fn customer_by_account(&self, account: &str) -> Result<Option<CustomerRecord>> {
        Ok(self
            .customers
            .read()
            .await
            .values()
            .find(|c| c.account == account)
            .cloned())
    }

    async fn partner_by_id(&self, id: &str) -> Result<Option<PartnerIdentity>> {
        Ok(self.partners.read().await.get(id).cloned())
    }

    async fn partner_by_username(&self, username: &str) -> Result<Option<PartnerIdentity>> {
        Ok(self
            .partners
            .read()
            .await
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn partner_by_reference_no(
        &self,
        reference_no: &str,
    ) -> Result<Option<PartnerIdentity>> {
        Ok(self
            .partners
            .read()
            .await
            .values()
            .find(|p| p.reference_no == reference_no)
            .cloned())
    }

    async fn insert_partner(&self, partner: NewPartner) -> Result<PartnerIdentity> {
        // One write lock covers the uniqueness check and the insert.
        let mut partners = self.partners.write().await;
        if partners.values().any(|p| p.username == partner.username) {
            return Err(GatewayError::InvalidInput(format!(
                "username already taken: {}",
                partner.username
            )));
        }

        let id = uuid::Uuid::new_v4();
        let identity = PartnerIdentity {
            id: id.to_string(),
            reference_no: format!("P{}", &id.simple().to_string()[..12]),
            username: partner.username,
            password_hash: partner.password_hash,
        };
        partners.insert(identity.id.clone(), identity.clone());
        Ok(identity)
    }

    async fn insert_payment(&self, payment: PaymentRecord) -> Result<()> {
        self.payments
            .write()
            .await
            .insert(payment.id.clone(), payment);
        Ok(())
    }

    async fn payment_by_id(&self, id: &str) -> Result<Option<PaymentRecord>> {
        Ok(self.payments.read().await.get(id).cloned())
    }
}

struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// TTL cache; a zero TTL stores an already-expired entry.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live entries, for health reporting.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.is_live(now));
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone()))
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        Ok(self
            .entries
            .write()
            .await
            .remove(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(id: &str, account: &str) -> CustomerRecord {
        CustomerRecord {
            id: id.into(),
            ktp: format!("ktp-{id}"),
            account: account.into(),
            name: "Siti".into(),
            branch: "Jakarta".into(),
            mother_name: "Ani".into(),
        }
    }

    #[tokio::test]
    async fn test_customer_lookups() {
        let store = MemoryStore::new();
        store.add_customer(customer("C1", "001")).await;

        assert_eq!(store.customer_by_id("C1").await.unwrap().unwrap().account, "001");
        assert_eq!(store.customer_by_account("001").await.unwrap().unwrap().id, "C1");
        assert!(store.customer_by_id("C2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let partner = NewPartner {
            username: "acme".into(),
            password_hash: "h".into(),
        };

        let created = store.insert_partner(partner.clone()).await.unwrap();
        assert!(created.reference_no.starts_with('P'));
        assert_eq!(
            store
                .partner_by_reference_no(&created.reference_no)
                .await
                .unwrap()
                .unwrap()
                .username,
            "acme"
        );
        assert!(matches!(
            store.insert_partner(partner).await,
            Err(GatewayError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_ttl() {
        let cache = MemoryCache::new();
        cache.set("live", b"a".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.set("dead", b"b".to_vec(), Duration::ZERO).await.unwrap();

        assert_eq!(cache.get("live").await.unwrap(), Some(b"a".to_vec()));
        assert_eq!(cache.get("dead").await.unwrap(), None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_take_is_single_shot() {
        let cache = MemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.take("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(cache.take("k").await.unwrap(), None);
        assert!(!cache.delete("k").await.unwrap());
    }
}
