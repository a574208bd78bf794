//! Proving backend
//!
//! [`ProvingBackend`] is the seam between the gateway and a proof system.
//! [`DevBackend`] is the development implementation: `prove` checks the
//! circuit relation in full, then seals the public witness with the circuit's
//! setup key. Proofs are attested rather than zero-knowledge, which keeps the
//! whole issue/redeem flow runnable without a SNARK toolchain.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

use crate::witness::bytes64;
use crate::{AlgorithmId, Assignment, CircuitError, PublicWitness, Result};

/// Bumped whenever a relation changes, invalidating stored artifacts.
pub const CONSTRAINT_VERSION: u32 = 1;

/// Compiled form of a circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSystem {
    pub circuit: AlgorithmId,
    pub version: u32,
    pub digest: [u8; 32],
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProvingKey {
    pub circuit: AlgorithmId,
    pub system_digest: [u8; 32],
    secret: [u8; 32],
}

impl fmt::Debug for ProvingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvingKey")
            .field("circuit", &self.circuit)
            .field("system_digest", &hex::encode(self.system_digest))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey {
    pub circuit: AlgorithmId,
    pub system_digest: [u8; 32],
    pub key: [u8; 32],
}

impl VerifyingKey {
    /// Whether this key was produced by setup over `system`.
    pub fn matches(&self, system: &ConstraintSystem) -> bool {
        self.circuit == system.circuit && self.system_digest == system.digest
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub circuit: AlgorithmId,
    pub system_digest: [u8; 32],
    #[serde(with = "bytes64")]
    pub seal: [u8; 64],
}

impl Proof {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

pub trait ProvingBackend: Send + Sync {
    fn compile(&self, circuit: AlgorithmId) -> ConstraintSystem;

    fn setup(&self, system: &ConstraintSystem) -> Result<(ProvingKey, VerifyingKey)>;

    fn prove(
        &self,
        system: &ConstraintSystem,
        proving_key: &ProvingKey,
        assignment: &Assignment,
    ) -> Result<Proof>;

    fn verify(
        &self,
        proof: &Proof,
        verifying_key: &VerifyingKey,
        public: &PublicWitness,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DevBackend;

impl DevBackend {
    pub fn new() -> Self {
        Self
    }

    fn relation(circuit: AlgorithmId) -> &'static str {
        match circuit {
            AlgorithmId::Elliptic => "y == x*x*x + x + 5; public y",
            AlgorithmId::Hash => "digest == H(domain || preimage); public digest",
            AlgorithmId::Eddsa => {
                "ed25519.verify(public_key, message, signature); public public_key, signature, message"
            }
        }
    }

    fn seal_message(
        circuit: AlgorithmId,
        system_digest: &[u8; 32],
        public: &PublicWitness,
    ) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(b"identity-proof:seal:v1");
        hasher.update(circuit.circuit_id().as_bytes());
        hasher.update(system_digest);
        hasher.update(public.to_bytes()?);
        Ok(hasher.finalize().into())
    }
}

impl ProvingBackend for DevBackend {
    fn compile(&self, circuit: AlgorithmId) -> ConstraintSystem {
        let mut hasher = Sha256::new();
        hasher.update(b"identity-proof:constraints:v1");
        hasher.update(CONSTRAINT_VERSION.to_le_bytes());
        hasher.update(circuit.circuit_id().as_bytes());
        hasher.update(Self::relation(circuit).as_bytes());

        ConstraintSystem {
            circuit,
            version: CONSTRAINT_VERSION,
            digest: hasher.finalize().into(),
        }
    }

    fn setup(&self, system: &ConstraintSystem) -> Result<(ProvingKey, VerifyingKey)> {
        if system.version != CONSTRAINT_VERSION {
            return Err(CircuitError::Artifact(format!(
                "constraint system version {} is not supported",
                system.version
            )));
        }

        let signing_key = SigningKey::generate(&mut OsRng);
        let proving_key = ProvingKey {
            circuit: system.circuit,
            system_digest: system.digest,
            secret: signing_key.to_bytes(),
        };
        let verifying_key = VerifyingKey {
            circuit: system.circuit,
            system_digest: system.digest,
            key: signing_key.verifying_key().to_bytes(),
        };

        Ok((proving_key, verifying_key))
    }

    fn prove(
        &self,
        system: &ConstraintSystem,
        proving_key: &ProvingKey,
        assignment: &Assignment,
    ) -> Result<Proof> {
        for actual in [proving_key.circuit, assignment.algorithm()] {
            if actual != system.circuit {
                return Err(CircuitError::CircuitMismatch {
                    expected: system.circuit,
                    actual,
                });
            }
        }
        if proving_key.system_digest != system.digest {
            return Err(CircuitError::Artifact(
                "proving key was not set up for this constraint system".into(),
            ));
        }
        if !assignment.is_satisfied() {
            return Err(CircuitError::Unsatisfied(system.circuit));
        }

        let public = assignment.public_witness();
        let message = Self::seal_message(system.circuit, &system.digest, &public)?;
        let seal = SigningKey::from_bytes(&proving_key.secret).sign(&message);

        debug!(circuit = %system.circuit, "Proof sealed");

        Ok(Proof {
            circuit: system.circuit,
            system_digest: system.digest,
            seal: seal.to_bytes(),
        })
    }

    fn verify(
        &self,
        proof: &Proof,
        verifying_key: &VerifyingKey,
        public: &PublicWitness,
    ) -> Result<()> {
        if proof.circuit != verifying_key.circuit
            || public.algorithm() != verifying_key.circuit
            || proof.system_digest != verifying_key.system_digest
        {
            return Err(CircuitError::VerificationFailed);
        }

        let key = ed25519_dalek::VerifyingKey::from_bytes(&verifying_key.key)
            .map_err(|_| CircuitError::VerificationFailed)?;
        let message = Self::seal_message(proof.circuit, &proof.system_digest, public)?;

        key.verify(&message, &Signature::from_bytes(&proof.seal))
            .map_err(|_| CircuitError::VerificationFailed)
    }
}
