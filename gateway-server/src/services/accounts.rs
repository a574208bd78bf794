//! Partner accounts: signup, password login and store seeding

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::session::SessionTokenIssuer;
use crate::error::{GatewayError, Result};
use crate::store::{MemoryStore, NewPartner, Store};
use crate::types::{PartnerIdentity, SeedData, SessionTokens};

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| GatewayError::Upstream(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

pub struct AccountService {
    store: Arc<dyn Store>,
    sessions: Arc<SessionTokenIssuer>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, sessions: Arc<SessionTokenIssuer>) -> Self {
        Self { store, sessions }
    }

    #[instrument(skip(self, password))]
    pub async fn signup(&self, username: &str, password: &str) -> Result<PartnerIdentity> {
        if username.is_empty() {
            return Err(GatewayError::InvalidInput("username is required".into()));
        }
        if password.is_empty() {
            return Err(GatewayError::InvalidInput("password is required".into()));
        }

        let partner = self
            .store
            .insert_partner(NewPartner {
                username: username.to_string(),
                password_hash: hash_password(password)?,
            })
            .await?;

        info!(partner_id = %partner.id, reference_no = %partner.reference_no, "Partner signed up");
        Ok(partner)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens> {
        if username.is_empty() {
            return Err(GatewayError::InvalidInput("username is required".into()));
        }

        let partner = self
            .store
            .partner_by_username(username)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("partner {username}")))?;

        if !verify_password(password, &partner.password_hash) {
            warn!(partner_id = %partner.id, "Password mismatch");
            return Err(GatewayError::Unauthorized("password mismatch".into()));
        }

        self.sessions.issue(&partner)
    }
}

/// Load customers and partners from a JSON seed file.
pub async fn seed_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| GatewayError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    let seed: SeedData = serde_json::from_str(&raw)
        .map_err(|e| GatewayError::InvalidInput(format!("invalid seed file: {e}")))?;

    let (customers, partners) = (seed.customers.len(), seed.partners.len());
    for customer in seed.customers {
        store.add_customer(customer).await;
    }
    for partner in seed.partners {
        store
            .add_partner(PartnerIdentity {
                id: partner
                    .id
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                reference_no: partner.reference_no,
                username: partner.username,
                password_hash: hash_password(&partner.password)?,
            })
            .await;
    }

    info!(customers, partners, path = %path.display(), "Store seeded");
    Ok(())
}
