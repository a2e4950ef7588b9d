//! # Stagelist (credential broker backend)
//!
//! `stagelist` is the backend for a concert-setlist discovery app that
//! exports setlists to streaming playlists. The service brokers Spotify
//! credentials for the web frontend: it acquires bearer tokens via the
//! client-credentials and authorization-code grants, stores them encrypted
//! inside client-held cookies, and transparently re-acquires them through a
//! redirect chain when they are missing or expired.
//!
//! ## Token lifecycle
//!
//! Tokens are never persisted server-side. Each token is serialized,
//! encrypted under a process-wide AES-256-GCM key, and handed to the client
//! as an `HttpOnly` cookie whose `Max-Age` matches the provider expiry. On
//! every use the cookie is treated as untrusted input: decryption failure,
//! absence, and expiry all fail closed to "no token" and route the caller
//! back through acquisition.
//!
//! ## Password reset
//!
//! Password resets ride on a separate one-time-code flow: a 6-digit code is
//! persisted per email (single active code), delivered through the email
//! outbox, and consumed atomically with the password update. Wrong and
//! expired codes are indistinguishable to the caller.

pub mod api;
pub mod cli;
pub mod spotify;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
