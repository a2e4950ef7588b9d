//! Small helpers for auth validation, reset codes, and password hashing.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng as HashOsRng, PasswordHasher, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, Rng};
use regex::Regex;

/// Normalize an email for lookup/uniqueness checks.
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(super) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Generate a uniformly random 6-digit reset code.
pub(super) fn generate_otp() -> String {
    OsRng.gen_range(100_000..=999_999u32).to_string()
}

/// Hash a password for storage; the raw value never touches the database.
///
/// # Errors
/// Returns an error if hashing fails.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut HashOsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("password hashing failed: {err}"))
        .context("failed to hash password")?;
    Ok(hash.to_string())
}
