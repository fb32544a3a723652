// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing with PBKDF2-HMAC-SHA256 (ring).

use std::num::NonZeroU32;

use ring::rand::SecureRandom;
use ring::{digest, pbkdf2, rand};

use crate::error::AppError;

static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = digest::SHA256_OUTPUT_LEN;

/// Salt and digest for storage, both hex-encoded.
#[derive(Debug, Clone)]
pub struct PasswordHash {
    pub salt: String,
    pub hash: String,
}

fn iterations() -> NonZeroU32 {
    // PBKDF2_ITERATIONS is a non-zero constant
    NonZeroU32::new(PBKDF2_ITERATIONS).unwrap()
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<PasswordHash, AppError> {
    let rng = rand::SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to generate password salt")))?;

    let mut derived = [0u8; CREDENTIAL_LEN];
    pbkdf2::derive(
        PBKDF2_ALG,
        iterations(),
        &salt,
        password.as_bytes(),
        &mut derived,
    );

    Ok(PasswordHash {
        salt: hex::encode(salt),
        hash: hex::encode(derived),
    })
}

/// Verify a password against a stored salt and digest.
///
/// Malformed stored values fail verification rather than erroring, so
/// login failures are uniform to the caller.
pub fn verify_password(password: &str, salt_hex: &str, hash_hex: &str) -> bool {
    let (Ok(salt), Ok(hash)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };

    pbkdf2::verify(PBKDF2_ALG, iterations(), &salt, password.as_bytes(), &hash).is_ok()
}
