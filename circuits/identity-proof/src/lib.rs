//! # Identity Proof Circuits
//!
//! Circuits that let a partner prove knowledge of a customer identity without
//! carrying the identity itself.
//!
//! ## Circuits
//! - `elliptic`: knowledge of `x` such that `y = x^3 + x + 5` (y public)
//! - `hash`: knowledge of a preimage of a public digest
//! - `eddsa`: a valid Ed25519 signature over a message (all values public)
//!
//! ## Lifecycle
//! 1. `compile` a circuit into a [`ConstraintSystem`]
//! 2. `setup` it into a proving / verifying key pair
//! 3. persist all three through [`CircuitStore`]
//! 4. `prove` an [`Assignment`] and `verify` against its [`PublicWitness`]

pub mod artifacts;
pub mod backend;
pub mod eddsa;
pub mod elliptic;
pub mod hash;
pub mod witness;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use artifacts::CircuitStore;
pub use backend::{ConstraintSystem, DevBackend, Proof, ProvingBackend, ProvingKey, VerifyingKey};
pub use witness::{Assignment, PublicWitness};

#[derive(Error, Debug)]
pub enum CircuitError {
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),
    #[error("constraints not satisfied for {0} circuit")]
    Unsatisfied(AlgorithmId),
    #[error("circuit mismatch: expected {expected}, got {actual}")]
    CircuitMismatch {
        expected: AlgorithmId,
        actual: AlgorithmId,
    },
    #[error("proof verification failed")]
    VerificationFailed,
    #[error("artifact error: {0}")]
    Artifact(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CircuitError>;

/// Proof algorithm identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmId {
    Elliptic,
    Hash,
    Eddsa,
}

impl AlgorithmId {
    pub const ALL: [AlgorithmId; 3] = [AlgorithmId::Elliptic, AlgorithmId::Hash, AlgorithmId::Eddsa];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmId::Elliptic => "elliptic",
            AlgorithmId::Hash => "hash",
            AlgorithmId::Eddsa => "eddsa",
        }
    }

    /// File stem used for this circuit's artifacts.
    pub fn circuit_id(&self) -> &'static str {
        match self {
            AlgorithmId::Elliptic => "elliptic",
            AlgorithmId::Hash => "mimc",
            AlgorithmId::Eddsa => "eddsa",
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmId {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "elliptic" => Ok(AlgorithmId::Elliptic),
            "hash" => Ok(AlgorithmId::Hash),
            "eddsa" => Ok(AlgorithmId::Eddsa),
            other => Err(CircuitError::UnknownAlgorithm(other.to_string())),
        }
    }
}
