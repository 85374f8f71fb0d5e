use reqwest::StatusCode;
use thiserror::Error;

/// A crate-wide result type alias using the custom [`Error`] enum.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for token-verification failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors that occur while fetching or parsing the provider's public keys.
    #[error(transparent)]
    Keys(#[from] KeysError),

    /// Errors that occur during JWT verification or claim validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised while refreshing the key cache from the key server.
#[derive(Debug, Error)]
pub enum KeysError {
    /// The HTTP request to the key server could not be completed.
    #[error("failed to fetch public keys from the key server: {0}")]
    Fetch(#[source] reqwest::Error),

    /// The key server kept responding with a non-200 status until the retry
    /// budget was exhausted.
    #[error("key server responded with status {0}")]
    ServerStatus(StatusCode),

    /// The response did not carry the `Expires` header the key server
    /// contract requires.
    #[error("missing 'Expires' header in the key server response")]
    MissingExpiresHeader,

    /// The `Expires` header was present but not a valid HTTP-date.
    #[error("invalid 'Expires' header in the key server response")]
    InvalidExpiresHeader,

    /// The response body could not be read or was not a JSON object of
    /// PEM strings.
    #[error("failed to read the key server response body: {0}")]
    Body(#[source] reqwest::Error),

    /// One of the key entries in the response could not be parsed. The whole
    /// refresh is abandoned; the previous key set stays in place.
    #[error("failed to parse public key {kid:?}: {source}")]
    KeyParse {
        /// The key identifier of the offending entry.
        kid: String,
        /// The underlying parse failure.
        source: KeyParseError,
    },
}

/// Errors raised while turning a single PEM entry into a verification key.
#[derive(Debug, Error)]
pub enum KeyParseError {
    /// The PEM block is not a parseable X.509 certificate.
    #[error("invalid certificate")]
    InvalidCertificate,

    /// The certificate's subject public key is not an RSA key.
    #[error("unexpected public key algorithm")]
    UnexpectedKeyAlgorithm,

    /// The material is not a usable RSA public key.
    #[error("invalid public key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

/// Errors raised while decoding and validating a token.
///
/// Each claim check fails with its own variant so callers can branch on the
/// cause.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The token string is not a structurally valid JWT.
    #[error("token is malformed")]
    Malformed,

    /// The signature could not be verified: it is invalid, signed with an
    /// unexpected algorithm, or the `kid` header does not resolve to a
    /// known key.
    #[error("token signature could not be verified")]
    Signature,

    /// The `exp` claim is in the past.
    #[error("token has expired")]
    Expired,

    /// The `iat` claim is in the future.
    #[error("token issued in the future")]
    IssuedInFuture,

    /// The `aud` claim does not match the expected audience.
    #[error("invalid audience claim")]
    Audience,

    /// The `iss` claim does not match the expected issuer.
    #[error("invalid issuer claim")]
    Issuer,

    /// The `sub` claim does not match the expectation, or is missing or empty
    /// in project-bound mode.
    #[error("invalid subject claim")]
    Subject,

    /// The `auth_time` claim is not a numeric timestamp in the past.
    #[error("invalid auth_time claim")]
    AuthTime,
}
