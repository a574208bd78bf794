//! Proof token protocol
//!
//! `issue` proves a statement about a customer and hands back an opaque token:
//!
//! ```text
//! token = base64( public_witness_bytes || "||" || customer_id )
//! ```
//!
//! The proof and public witness are cached under `{token}_proof` and
//! `{token}_witness` for the configured TTL. `redeem` re-derives everything
//! from the token and the cache and reports only `(customer_id, valid)`.
//! One protocol serves every algorithm; an [`AlgorithmDescriptor`] supplies
//! the circuit and the witness builder.

use base64::{engine::general_purpose::STANDARD, Engine};
use identity_proof::{
    eddsa, elliptic, hash, AlgorithmId, Assignment, CircuitError, CircuitStore, Proof,
    ProvingBackend, PublicWitness,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::{GatewayError, Result};
use crate::store::{CacheStore, Store};
use crate::types::CustomerRecord;

const TOKEN_DELIMITER: &[u8] = b"||";

/// Algorithm-specific half of the protocol
#[derive(Clone, Copy)]
pub struct AlgorithmDescriptor {
    pub id: AlgorithmId,
    build: fn(&CustomerRecord) -> identity_proof::Result<Assignment>,
}

impl AlgorithmDescriptor {
    pub fn for_algorithm(id: AlgorithmId) -> Self {
        let build: fn(&CustomerRecord) -> identity_proof::Result<Assignment> = match id {
            AlgorithmId::Elliptic => elliptic_assignment,
            AlgorithmId::Hash => hash_assignment,
            AlgorithmId::Eddsa => eddsa_assignment,
        };
        Self { id, build }
    }

    pub fn build_assignment(&self, customer: &CustomerRecord) -> Result<Assignment> {
        Ok((self.build)(customer)?)
    }
}

/// JSON-encoded customer id, fitted to 32 bytes.
fn customer_preimage(customer: &CustomerRecord) -> identity_proof::Result<[u8; 32]> {
    let encoded = serde_json::to_vec(&customer.id)
        .map_err(|e| CircuitError::InvalidAssignment(e.to_string()))?;
    Ok(hash::pad_preimage(&encoded))
}

/// x is the length of the customer name in UTF-8 bytes.
fn elliptic_assignment(customer: &CustomerRecord) -> identity_proof::Result<Assignment> {
    elliptic::assign(customer.name.len() as u64)
}

fn hash_assignment(customer: &CustomerRecord) -> identity_proof::Result<Assignment> {
    Ok(hash::assign(customer_preimage(customer)?))
}

fn eddsa_assignment(customer: &CustomerRecord) -> identity_proof::Result<Assignment> {
    eddsa::assign(customer_preimage(customer)?)
}

pub fn encode_token(public_witness: &[u8], customer_id: &str) -> String {
    let mut raw = Vec::with_capacity(public_witness.len() + TOKEN_DELIMITER.len() + customer_id.len());
    raw.extend_from_slice(public_witness);
    raw.extend_from_slice(TOKEN_DELIMITER);
    raw.extend_from_slice(customer_id.as_bytes());
    STANDARD.encode(raw)
}

/// Split a token at its last delimiter. Witness bytes may contain the
/// delimiter; customer ids may not.
pub fn decode_token(token: &str) -> Option<(Vec<u8>, String)> {
    let raw = STANDARD.decode(token).ok()?;
    let at = raw
        .windows(TOKEN_DELIMITER.len())
        .rposition(|window| window == TOKEN_DELIMITER)?;

    let customer_id = String::from_utf8(raw[at + TOKEN_DELIMITER.len()..].to_vec()).ok()?;
    if customer_id.is_empty() {
        return None;
    }
    Some((raw[..at].to_vec(), customer_id))
}

fn proof_key(token: &str) -> String {
    format!("{token}_proof")
}

fn witness_key(token: &str) -> String {
    format!("{token}_witness")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redemption {
    pub customer_id: String,
    pub valid: bool,
}

impl Redemption {
    pub fn accepted(customer_id: String) -> Self {
        Self {
            customer_id,
            valid: true,
        }
    }

    pub fn rejected() -> Self {
        Self {
            customer_id: String::new(),
            valid: false,
        }
    }
}

pub struct ProofTokenProtocol {
    backend: Arc<dyn ProvingBackend>,
    circuits: CircuitStore,
    store: Arc<dyn Store>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    single_use: bool,
}

impl ProofTokenProtocol {
    pub fn new(
        backend: Arc<dyn ProvingBackend>,
        circuits: CircuitStore,
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            backend,
            circuits,
            store,
            cache,
            ttl,
            single_use: false,
        }
    }

    /// Consume tokens on their first successful redemption.
    pub fn single_use(mut self, enabled: bool) -> Self {
        self.single_use = enabled;
        self
    }

    pub fn circuits(&self) -> &CircuitStore {
        &self.circuits
    }

    #[instrument(skip(self))]
    pub async fn issue(&self, customer_id: &str, algorithm: AlgorithmId) -> Result<String> {
        if customer_id.is_empty() {
            return Err(GatewayError::InvalidInput("customer id is required".into()));
        }
        if customer_id.contains("||") {
            return Err(GatewayError::InvalidInput(
                "customer id may not contain the token delimiter".into(),
            ));
        }

        let customer = self
            .store
            .customer_by_id(customer_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("customer {customer_id}")))?;

        let assignment = AlgorithmDescriptor::for_algorithm(algorithm).build_assignment(&customer)?;

        let key_load = |e: CircuitError| GatewayError::KeyLoad(e.to_string());
        let system = self.circuits.load_system(algorithm).map_err(key_load)?;
        let proving_key = self.circuits.load_proving_key(algorithm).map_err(key_load)?;

        let upstream = |e: CircuitError| GatewayError::Upstream(e.to_string());
        let proof = self
            .backend
            .prove(&system, &proving_key, &assignment)
            .map_err(upstream)?;
        let witness_bytes = assignment.public_witness().to_bytes().map_err(upstream)?;
        let proof_bytes = proof.to_bytes().map_err(upstream)?;

        let token = encode_token(&witness_bytes, &customer.id);
        self.cache.set(&proof_key(&token), proof_bytes, self.ttl).await?;
        self.cache
            .set(&witness_key(&token), witness_bytes, self.ttl)
            .await?;

        info!(algorithm = %algorithm, ttl_secs = self.ttl.as_secs(), "Proof token issued");
        Ok(token)
    }

    /// Never fails; every problem collapses into an invalid redemption.
    pub async fn redeem(&self, token: &str, algorithm: AlgorithmId) -> Redemption {
        match self.try_redeem(token, algorithm).await {
            Ok(customer_id) => {
                info!(algorithm = %algorithm, "Proof token redeemed");
                Redemption::accepted(customer_id)
            }
            Err(step) => {
                debug!(algorithm = %algorithm, step, "Proof token rejected");
                Redemption::rejected()
            }
        }
    }

    async fn try_redeem(
        &self,
        token: &str,
        algorithm: AlgorithmId,
    ) -> std::result::Result<String, &'static str> {
        let (witness_bytes, customer_id) = decode_token(token).ok_or("decode token")?;

        let customer = self
            .store
            .customer_by_id(&customer_id)
            .await
            .ok()
            .flatten()
            .ok_or("resolve customer")?;

        let system = self
            .circuits
            .load_system(algorithm)
            .map_err(|_| "load constraint system")?;
        let verifying_key = self
            .circuits
            .load_verifying_key(algorithm)
            .map_err(|_| "load verifying key")?;
        if !verifying_key.matches(&system) {
            return Err("verifying key does not match constraint system");
        }

        let proof_key = proof_key(token);
        let witness_key = witness_key(token);
        let cached_proof = self
            .cache
            .get(&proof_key)
            .await
            .ok()
            .flatten()
            .ok_or("cached proof")?;
        let cached_witness = self
            .cache
            .get(&witness_key)
            .await
            .ok()
            .flatten()
            .ok_or("cached witness")?;
        if cached_witness != witness_bytes {
            return Err("witness differs from cache");
        }

        let proof = Proof::from_bytes(&cached_proof).map_err(|_| "decode proof")?;
        let public = PublicWitness::from_bytes(&cached_witness).map_err(|_| "decode witness")?;
        self.backend
            .verify(&proof, &verifying_key, &public)
            .map_err(|_| "verify proof")?;

        if self.single_use {
            // Only one concurrent redeemer wins the take.
            if self.cache.take(&proof_key).await.ok().flatten().is_none() {
                return Err("already redeemed");
            }
            let _ = self.cache.delete(&witness_key).await;
        }

        Ok(customer.id)
    }
}
