//! `evax-auth`: authentication/authorization boundary.
//!
//! Decoupled from HTTP and storage: session claims, HS256 tokens, the
//! credential verifier and role checks.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod jwt;
pub mod roles;

pub use authorize::{AuthzError, require_role};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{Argon2CredentialVerifier, CredentialError, CredentialVerifier};
pub use jwt::{Hs256Tokens, JwtValidator, TokenError, TokenIssuer};
pub use roles::Role;
