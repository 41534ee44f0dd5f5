//! JSON Web Token backed [`IdentityVerifier`].
//!
//! Access tokens are HS256 signed with the shared secret from the service
//! configuration and carry the claims described in [`claims::IdentityClaims`].
//! Signature, expiry and the presence of `sub` and `exp` are validated before
//! the claims are turned into an [`Identity`].
//!
//! # Example
//!
//! ```rust
//! use domain::{IdentityVerifier, JwtIdentityVerifier};
//!
//! let verifier = JwtIdentityVerifier::new("a-shared-secret").unwrap();
//! assert!(verifier.verify("not-a-token").is_err());
//! assert!(JwtIdentityVerifier::new("").is_err());
//! ```

use crate::error::{Error, UnauthenticatedErrorKind};
use crate::identity::{Identity, IdentityVerifier};
use claims::IdentityClaims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;

pub mod claims;

pub struct JwtIdentityVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityVerifier {
    /// Fails with an internal config error when `secret` is blank.
    pub fn new(secret: &str) -> Result<Self, Error> {
        if secret.trim().is_empty() {
            error!("Refusing to verify access tokens with a blank JWT secret");
            return Err(Error::config());
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, token: &str) -> Result<Identity, Error> {
        if token.trim().is_empty() {
            return Err(Error::unauthenticated(
                UnauthenticatedErrorKind::MissingCredential,
            ));
        }

        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("Rejecting access token: {e}");
                Error::from(e)
            })?;

        Ok(token_data.claims.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainErrorKind;
    use crate::identity::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn token_for(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier() -> JwtIdentityVerifier {
        JwtIdentityVerifier::new(SECRET).unwrap()
    }

    fn expires_in(seconds: i64) -> i64 {
        chrono::Utc::now().timestamp() + seconds
    }

    #[test]
    fn test_valid_token_yields_identity() {
        let token = token_for(
            json!({ "sub": "u1", "name": "Ada", "role": "admin", "exp": expires_in(3600) }),
            SECRET,
        );

        let identity = verifier().verify(&token).unwrap();

        assert_eq!(
            identity,
            Identity {
                subject_id: "u1".to_string(),
                display_name: "Ada".to_string(),
                role: Role::Admin,
            }
        );
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = token_for(
            json!({ "sub": "u1", "name": "Ada", "role": "user", "exp": expires_in(3600) }),
            "another-secret",
        );

        let err = verifier().verify(&token).unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::InvalidCredential)
        );
    }

    #[test]
    fn test_expired_token_is_expired() {
        let token = token_for(
            json!({ "sub": "u1", "name": "Ada", "role": "user", "exp": expires_in(-3600) }),
            SECRET,
        );

        let err = verifier().verify(&token).unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::ExpiredCredential)
        );
    }

    #[test]
    fn test_unknown_role_is_invalid() {
        let token = token_for(
            json!({ "sub": "u1", "name": "Ada", "role": "owner", "exp": expires_in(3600) }),
            SECRET,
        );

        let err = verifier().verify(&token).unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::InvalidCredential)
        );
    }

    #[test]
    fn test_blank_token_is_missing() {
        let err = verifier().verify("  ").unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::MissingCredential)
        );
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let err = verifier().verify("definitely.not.ajwt").unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Unauthenticated(UnauthenticatedErrorKind::InvalidCredential)
        );
    }

    #[test]
    fn test_blank_secret_is_a_config_error() {
        for secret in ["", "   "] {
            let err = JwtIdentityVerifier::new(secret).err().unwrap();
            assert_eq!(
                err.error_kind,
                DomainErrorKind::Internal(crate::error::InternalErrorKind::Config)
            );
        }
    }
}
