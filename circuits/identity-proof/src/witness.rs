//! Witness assignments and their public halves

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{eddsa, elliptic, hash, AlgorithmId, Result};

/// Helper for serializing fixed-size byte arrays larger than 32 bytes
pub(crate) mod bytes64 {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(data: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        hex::encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 64], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64 bytes"))
    }
}

/// A full witness for one circuit, private values included.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Assignment {
    Elliptic {
        x: u64,
        y: u64,
    },
    Hash {
        preimage: [u8; 32],
        digest: [u8; 32],
    },
    Eddsa {
        public_key: [u8; 32],
        #[serde(with = "bytes64")]
        signature: [u8; 64],
        message: [u8; 32],
    },
}

impl Assignment {
    pub fn algorithm(&self) -> AlgorithmId {
        match self {
            Assignment::Elliptic { .. } => AlgorithmId::Elliptic,
            Assignment::Hash { .. } => AlgorithmId::Hash,
            Assignment::Eddsa { .. } => AlgorithmId::Eddsa,
        }
    }

    /// Drop the private values, keeping what a verifier may see.
    pub fn public_witness(&self) -> PublicWitness {
        match self {
            Assignment::Elliptic { y, .. } => PublicWitness::Elliptic { y: *y },
            Assignment::Hash { digest, .. } => PublicWitness::Hash { digest: *digest },
            Assignment::Eddsa {
                public_key,
                signature,
                message,
            } => PublicWitness::Eddsa {
                public_key: *public_key,
                signature: *signature,
                message: *message,
            },
        }
    }

    /// Check the circuit relation against this assignment.
    pub fn is_satisfied(&self) -> bool {
        match self {
            Assignment::Elliptic { x, y } => elliptic::is_satisfied(*x, *y),
            Assignment::Hash { preimage, digest } => hash::is_satisfied(preimage, digest),
            Assignment::Eddsa {
                public_key,
                signature,
                message,
            } => eddsa::is_satisfied(public_key, signature, message),
        }
    }
}

// Private halves never reach logs.
impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("algorithm", &self.algorithm())
            .field("public", &self.public_witness())
            .finish_non_exhaustive()
    }
}

/// The public part of an [`Assignment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicWitness {
    Elliptic {
        y: u64,
    },
    Hash {
        digest: [u8; 32],
    },
    Eddsa {
        public_key: [u8; 32],
        #[serde(with = "bytes64")]
        signature: [u8; 64],
        message: [u8; 32],
    },
}

impl PublicWitness {
    pub fn algorithm(&self) -> AlgorithmId {
        match self {
            PublicWitness::Elliptic { .. } => AlgorithmId::Elliptic,
            PublicWitness::Hash { .. } => AlgorithmId::Hash,
            PublicWitness::Eddsa { .. } => AlgorithmId::Eddsa,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
