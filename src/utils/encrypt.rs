use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

fn hasher(pepper: Option<&str>) -> Result<Argon2<'_>, ApiError> {
    match pepper {
        Some(secret) => Argon2::new_with_secret(
            secret.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| ApiError::Internal(format!("invalid hash secret: {e}"))),
        None => Ok(Argon2::default()),
    }
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(pepper)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<bool, ApiError> {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            return Ok(false);
        }
    };
    Ok(hasher(pepper)?
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Checks a hex HMAC-SHA256 `signature` of `body` in constant time.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Hex HMAC-SHA256 of `body`, the format payment providers send.
pub fn sign_webhook(secret: &str, body: &[u8]) -> Result<String, ApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid webhook secret: {e}")))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
