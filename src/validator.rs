use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode_header, Validation};
use serde_json::{Map, Value};

use crate::cache::KeyCache;
use crate::error::ValidationError;
use crate::options::{ResolvedOptions, ValidationOptions};
use crate::token::Token;

/// Verifies ID tokens against the provider's current public keys.
///
/// The validator owns a [`KeyCache`] that is populated eagerly: construction
/// blocks on the first key fetch and fails if that fetch fails, so a
/// constructed validator is always able to resolve keys.
pub struct Validator {
    cache: KeyCache,
    defaults: ValidationOptions,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("cache", &self.cache)
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Validator {
    /// Creates a validator bound to a Firebase project: tokens must carry the
    /// project id as audience, the matching `securetoken.google.com` issuer,
    /// a non-empty subject and a past `auth_time`.
    pub async fn new(project_id: impl AsRef<str>) -> crate::Result<Validator> {
        Validator::with_options(ValidationOptions::for_project(project_id)).await
    }

    /// Creates a validator with a free-form policy. Audience, issuer and
    /// subject are only checked when the corresponding expectation is set.
    pub async fn with_options(options: ValidationOptions) -> crate::Result<Validator> {
        let cache = match options.key_url.clone() {
            Some(url) => KeyCache::with_url(url).await?,
            None => KeyCache::new().await?,
        };
        Ok(Validator {
            cache,
            defaults: options,
        })
    }

    /// The underlying key cache, e.g. for a background refresher that wants
    /// to act on [`KeyCache::expires_soon`].
    pub fn keys(&self) -> &KeyCache {
        &self.cache
    }

    /// Decodes and validates a token against the instance defaults.
    pub async fn decode(&self, token: &str) -> crate::Result<Token> {
        self.decode_with(token, &ValidationOptions::default()).await
    }

    /// Decodes and validates a token, with `overrides` merged over the
    /// instance defaults for this call only.
    ///
    /// Resolving the signing key may refresh the key cache, which performs
    /// network I/O.
    pub async fn decode_with(
        &self,
        token: &str,
        overrides: &ValidationOptions,
    ) -> crate::Result<Token> {
        let opts = self.defaults.merged(overrides).resolve();

        let raw_header = decode_raw_header(token)?;
        let header = decode_header(token).map_err(|_| ValidationError::Malformed)?;

        // An absent or unknown kid means the signature cannot be verified;
        // verification is never skipped.
        let kid = header.kid.as_deref().ok_or(ValidationError::Signature)?;
        let decoding_key = self
            .cache
            .get(kid)
            .await?
            .ok_or(ValidationError::Signature)?;

        let validation = build_validation(&opts);
        let decoded =
            jsonwebtoken::decode::<Map<String, Value>>(token, &decoding_key, &validation)
                .map_err(claim_failure)?;
        let claims = decoded.claims;

        apply_supplementary_checks(&claims, &opts)?;

        Ok(Token::new(claims, raw_header))
    }
}

fn build_validation(opts: &ResolvedOptions) -> Validation {
    let mut validation = Validation::new(opts.algorithm);
    validation.leeway = opts.leeway;
    validation.validate_exp = !opts.allow_expired;
    if opts.allow_expired {
        validation.required_spec_claims.clear();
    }

    // The primitive only compares aud/iss/sub when the claim is present;
    // an expected claim that is absent must fail too, so it is also marked
    // as required.
    match &opts.audience {
        Some(audience) => {
            validation.set_audience(&[audience]);
            validation.required_spec_claims.insert("aud".to_owned());
        }
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = &opts.issuer {
        validation.set_issuer(&[issuer]);
        validation.required_spec_claims.insert("iss".to_owned());
    }
    if let Some(subject) = &opts.subject {
        validation.sub = Some(subject.clone());
        validation.required_spec_claims.insert("sub".to_owned());
    }

    validation
}

/// Claim checks the delegated primitive does not cover: `iat` in the future,
/// and the Firebase policy of a non-empty subject and a past `auth_time`.
fn apply_supplementary_checks(
    claims: &Map<String, Value>,
    opts: &ResolvedOptions,
) -> Result<(), ValidationError> {
    let now = unix_now();
    let leeway = opts.leeway as f64;

    if opts.verify_issued_at {
        if let Some(iat) = claims.get("iat") {
            let iat = iat.as_f64().ok_or(ValidationError::IssuedInFuture)?;
            if iat > now + leeway {
                return Err(ValidationError::IssuedInFuture);
            }
        }
    }

    if opts.project_checks {
        match claims.get("sub").and_then(Value::as_str) {
            Some(sub) if !sub.is_empty() => {}
            _ => return Err(ValidationError::Subject),
        }
        if let Some(auth_time) = claims.get("auth_time") {
            let auth_time = auth_time.as_f64().ok_or(ValidationError::AuthTime)?;
            if auth_time > now + leeway {
                return Err(ValidationError::AuthTime);
            }
        }
    }

    Ok(())
}

/// Maps the delegated primitive's failures onto the crate's failure kinds.
fn claim_failure(err: jsonwebtoken::errors::Error) -> ValidationError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => ValidationError::Expired,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "aud" => ValidationError::Audience,
            "iss" => ValidationError::Issuer,
            "sub" => ValidationError::Subject,
            _ => ValidationError::Expired,
        },
        ErrorKind::InvalidAudience => ValidationError::Audience,
        ErrorKind::InvalidIssuer => ValidationError::Issuer,
        ErrorKind::InvalidSubject => ValidationError::Subject,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::Crypto(_) => ValidationError::Signature,
        _ => ValidationError::Malformed,
    }
}

/// Decodes the JWT header segment verbatim, without interpreting it.
fn decode_raw_header(token: &str) -> Result<Map<String, Value>, ValidationError> {
    let segment = token.split('.').next().unwrap_or_default();
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| ValidationError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| ValidationError::Malformed)
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
