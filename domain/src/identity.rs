use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role classes a user can hold.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    #[default]
    User,
    Viewer,
}

impl Role {
    /// Elevated roles receive administrator-only broadcasts.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::SuperAdmin => write!(fmt, "super_admin"),
            Role::Admin => write!(fmt, "admin"),
            Role::User => write!(fmt, "user"),
            Role::Viewer => write!(fmt, "viewer"),
        }
    }
}

/// The verified claims of an authenticated user.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Identity {
    pub subject_id: String,
    pub display_name: String,
    pub role: Role,
}

/// Turns a bearer credential into an [`Identity`].
///
/// Verification is expected to be fast and local (no network round trip), so
/// the trait is synchronous.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, Error>;
}
