//! Claims carried by the access tokens presented on the real-time channel.
//!
//! Tokens are minted by the authentication endpoints outside this crate. Only
//! the claims needed to build an [`Identity`] are read here; any additional
//! claims in the token are ignored.

use crate::identity::{Identity, Role};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub exp: u64,
}

impl From<IdentityClaims> for Identity {
    fn from(claims: IdentityClaims) -> Self {
        Identity {
            subject_id: claims.sub,
            display_name: claims.name,
            role: claims.role,
        }
    }
}
