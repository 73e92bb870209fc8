use thiserror::Error;

/// Request-scoped authentication failures.
///
/// Every variant is terminal for the request and maps to HTTP 401 at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("authorization header is not a bearer credential")]
    MalformedScheme,

    #[error("malformed token: {0}")]
    MalformedToken(&'static str),

    #[error("unknown signing key")]
    UnknownSigningKey,

    #[error("invalid token signature")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("untrusted token issuer")]
    IssuerMismatch,

    #[error("token audience mismatch")]
    AudienceMismatch,
}

impl AuthError {
    /// Stable machine-readable reason (response body `code`, log field).
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedScheme => "MALFORMED_SCHEME",
            Self::MalformedToken(_) => "MALFORMED_TOKEN",
            Self::UnknownSigningKey => "UNKNOWN_SIGNING_KEY",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::Expired => "EXPIRED",
            Self::NotYetValid => "NOT_YET_VALID",
            Self::IssuerMismatch => "ISSUER_MISMATCH",
            Self::AudienceMismatch => "AUDIENCE_MISMATCH",
        }
    }

    /// RFC 6750 error code for the `WWW-Authenticate` challenge.
    ///
    /// `None` when the client sent no credentials at all.
    pub fn challenge_error(&self) -> Option<&'static str> {
        match self {
            Self::MissingToken => None,
            Self::MalformedScheme => Some("invalid_request"),
            _ => Some("invalid_token"),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::MalformedToken("undecodable token"),
            // Key/algorithm problems and anything unexpected: the signature did not verify.
            _ => AuthError::SignatureInvalid,
        }
    }
}
