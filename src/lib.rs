//! # Chirpy (authentication and session service)
//!
//! `chirpy` authenticates end-users and authorizes their requests with a
//! two-token scheme.
//!
//! ## Tokens
//!
//! - **Access tokens** are short-lived, HMAC-SHA256 signed assertions of a user
//!   id. They are validated without touching storage, so any instance can check
//!   them. They cannot be revoked; their one hour default lifetime bounds the
//!   exposure.
//! - **Refresh tokens** are opaque 256-bit random strings. Only their SHA-256
//!   digest is stored. They live 60 days, can be redeemed repeatedly for new
//!   access tokens, and are revoked one-way on logout.
//!
//! ## Service Key
//!
//! Trusted backend callers (the payment webhook sender) authenticate with a
//! static `ApiKey` header that must match the configured key exactly.
//!
//! ## Passwords
//!
//! Passwords are hashed with bcrypt (cost 10 by default). Inputs longer than
//! 72 bytes are rejected instead of silently truncated. Hashing runs on the
//! blocking pool under a request timeout.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
