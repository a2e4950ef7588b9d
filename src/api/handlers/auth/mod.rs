//! Credential broker: token codec, cookie layer, session gate, redirect
//! router, acquisition routes, and the password-reset code flow.
//!
//! ## Token lifecycle
//!
//! Bearer tokens exist only as AES-encrypted cookie payloads held by the
//! client. The redirect router ([`guard`]) checks cookie *presence* on
//! protected routes and bounces token-less callers through the acquisition
//! routes ([`tokens`]); the session gate ([`gate`]) re-checks *validity*
//! (decryption, expiry) at the point of use. Acquisition routes are exempt
//! from the router, so the redirect chain is at most two hops.
//!
//! ## Reset codes
//!
//! One active 6-digit code per email, ten-minute freshness window, consumed
//! atomically with the password update. Delivery rides the email outbox.

pub(crate) mod codec;
pub(crate) mod cookies;
pub(crate) mod gate;
pub(crate) mod guard;
pub(crate) mod password;
pub(crate) mod state;
mod storage;
pub(crate) mod tokens;
pub(crate) mod types;
mod utils;

pub use codec::{BearerToken, DecryptError, TokenCodec};
pub use state::{AuthConfig, AuthState};

#[cfg(test)]
pub(crate) mod test_support;
