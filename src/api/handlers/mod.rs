//! API handlers for the stagelist backend.
//!
//! The `auth` module carries the credential broker (token lifecycle and
//! password reset); `search` and `me` are the protected consumers sitting
//! behind the redirect router.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
pub mod search;
