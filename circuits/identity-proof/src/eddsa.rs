//! Signature circuit: a valid Ed25519 signature over a 32-byte message.
//!
//! A fresh keypair is drawn for every assignment, so the only thing the proof
//! ties to the customer is the message.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::{Assignment, CircuitError, Result};

pub fn assign(message: [u8; 32]) -> Result<Assignment> {
    let signing_key = SigningKey::generate(&mut OsRng);
    assign_with_key(&signing_key, message)
}

pub fn assign_with_key(signing_key: &SigningKey, message: [u8; 32]) -> Result<Assignment> {
    let signature = signing_key.sign(&message);
    let public_key = signing_key.verifying_key().to_bytes();

    if !is_satisfied(&public_key, &signature.to_bytes(), &message) {
        return Err(CircuitError::InvalidAssignment(
            "fresh signature failed self-check".into(),
        ));
    }

    Ok(Assignment::Eddsa {
        public_key,
        signature: signature.to_bytes(),
        message,
    })
}

pub(crate) fn is_satisfied(public_key: &[u8; 32], signature: &[u8; 64], message: &[u8; 32]) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(signature);
    verifying_key.verify(message, &signature).is_ok()
}
