//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure with
/// `domain::error::Error` as the root type holding a tree of `error_kind` enums
/// that represent the kinds of errors that can occur in this layer. The `source`
/// field holds the original error that caused the domain error, so errors can be
/// translated between layers while keeping layer boundaries. Ex. `realtime`
/// depends on `domain` and translates these errors into admission failures
/// without depending on `jsonwebtoken` itself.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Unauthenticated(UnauthenticatedErrorKind),
    Internal(InternalErrorKind),
}

/// The ways a presented credential can fail to identify a user.
#[derive(Debug, PartialEq)]
pub enum UnauthenticatedErrorKind {
    MissingCredential,
    InvalidCredential,
    ExpiredCredential,
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    /// The service was started with an unusable setting.
    Config,
}

impl Error {
    pub fn unauthenticated(kind: UnauthenticatedErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Unauthenticated(kind),
        }
    }

    pub fn config() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// Token decoding failures are all credential problems from the caller's point of
// view; only expiry is distinguished so clients can be told to refresh.
impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        let kind = match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                UnauthenticatedErrorKind::ExpiredCredential
            }
            _ => UnauthenticatedErrorKind::InvalidCredential,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Unauthenticated(kind),
        }
    }
}
