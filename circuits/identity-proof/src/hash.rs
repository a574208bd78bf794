//! Preimage circuit: knowledge of a 32-byte secret hashing to a public digest.

use sha2::{Digest, Sha256};

use crate::Assignment;

const DOMAIN: &[u8] = b"identity-proof:hash:v1";

/// Fit arbitrary bytes into a 32-byte preimage, truncating or zero padding.
pub fn pad_preimage(data: &[u8]) -> [u8; 32] {
    let mut preimage = [0u8; 32];
    let len = data.len().min(32);
    preimage[..len].copy_from_slice(&data[..len]);
    preimage
}

pub fn digest(preimage: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update(preimage);
    hasher.finalize().into()
}

pub fn assign(preimage: [u8; 32]) -> Assignment {
    Assignment::Hash {
        digest: digest(&preimage),
        preimage,
    }
}

pub(crate) fn is_satisfied(preimage: &[u8; 32], expected: &[u8; 32]) -> bool {
    digest(preimage) == *expected
}
