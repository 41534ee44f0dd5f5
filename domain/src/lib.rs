//! Identity layer consumed by the real-time event distribution system.
//!
//! The real-time layer never inspects how credentials are minted. It asks an
//! [`IdentityVerifier`] to turn a bearer credential into an [`Identity`] and
//! either admits the connection or rejects it.

pub mod error;
pub mod identity;
pub mod jwt;

pub use identity::{Identity, IdentityVerifier, Role};
pub use jwt::JwtIdentityVerifier;
