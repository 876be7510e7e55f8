//! Authentication core.
//!
//! Leaves first: [`password`] and [`access_token`] are pure, [`refresh_token`]
//! talks to a [`crate::store::RefreshTokenStore`], [`credentials`] parses
//! headers, and [`policy`] and [`session`] compose the rest for request
//! handlers.

pub mod access_token;
pub mod config;
pub mod credentials;
pub mod error;
pub mod password;
pub mod policy;
pub mod refresh_token;
pub mod session;

pub use access_token::{issue_access_token, validate_access_token, validate_access_token_at};
pub use config::AuthConfig;
pub use credentials::{extract_api_key, extract_bearer, HeaderSource};
pub use error::{AuthError, ExtractError, PasswordError, RefreshError, TokenError};
pub use password::{hash_password, verify_password};
pub use policy::{authenticate_request, authorize_ownership, authorize_service_call};
pub use refresh_token::RefreshTokenManager;
pub use session::{Session, SessionService};
