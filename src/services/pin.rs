// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PIN hashing and comparison.
//!
//! The stored value is the lowercase hex SHA-256 of `pin + uid`.

use crate::error::AppError;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const PIN_LENGTH: usize = 6;

pub const PIN_FORMAT_MESSAGE: &str = "PIN must be exactly 6 digits.";
pub const PIN_MISMATCH_MESSAGE: &str = "PINs do not match. Please start over.";
pub const PIN_INCORRECT_MESSAGE: &str = "Incorrect PIN. Please try again.";

/// Whether `pin` is exactly six ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Salted hash of a PIN for storage.
pub fn hash_pin(pin: &str, uid: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pin.as_bytes());
    hasher.update(uid.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a candidate PIN against the stored hash in constant time.
pub fn verify_pin(candidate: &str, uid: &str, stored_hash: &str) -> bool {
    let computed = hash_pin(candidate, uid);
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}

/// Check both setup entries and return the hash to store.
pub fn hash_new_pin(pin: &str, confirm: &str, uid: &str) -> Result<String, AppError> {
    if !is_valid_pin(pin) || !is_valid_pin(confirm) {
        return Err(AppError::BadRequest(PIN_FORMAT_MESSAGE.to_string()));
    }
    if pin != confirm {
        return Err(AppError::PinMismatch(PIN_MISMATCH_MESSAGE.to_string()));
    }
    Ok(hash_pin(pin, uid))
}
