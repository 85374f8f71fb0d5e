use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use url::Url;

/// Token validation policy.
///
/// Every field is optional so the same type serves both as the validator's
/// defaults and as per-call overrides; [`Validator::decode_with`] merges the
/// two field-wise before resolving them into a concrete policy.
///
/// Verification of `aud`, `iss` and `sub` is enabled exactly when the
/// corresponding expectation is set, unless explicitly switched off via the
/// matching `verify_*` flag.
///
/// [`Validator::decode_with`]: crate::Validator::decode_with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Firebase project identifier. When set, the audience defaults to the
    /// project id, the issuer to `https://securetoken.google.com/<id>`, and
    /// the Firebase-specific claim checks (non-empty `sub`, past `auth_time`)
    /// are enabled.
    pub project_id: Option<String>,

    /// Key distribution endpoint override. Only honoured at construction
    /// time; per-call overrides ignore it.
    pub key_url: Option<Url>,

    /// Accepted signing algorithm. Defaults to RS256.
    pub algorithm: Option<Algorithm>,

    /// Expected `aud` claim value.
    pub audience: Option<String>,

    /// Expected `iss` claim value.
    pub issuer: Option<String>,

    /// Expected `sub` claim value.
    pub subject: Option<String>,

    /// Explicitly enable or disable the audience check.
    pub verify_audience: Option<bool>,

    /// Explicitly enable or disable the issuer check.
    pub verify_issuer: Option<bool>,

    /// Explicitly enable or disable the subject check.
    pub verify_subject: Option<bool>,

    /// Reject tokens whose `iat` claim lies in the future. Defaults to false,
    /// or to true in project-bound mode.
    pub verify_issued_at: Option<bool>,

    /// Clock-skew tolerance in seconds for time-based claim checks.
    /// Defaults to zero.
    pub leeway: Option<u64>,

    /// Skip the expiration check for this call. All other checks remain
    /// active. Defaults to false.
    pub allow_expired: Option<bool>,
}

impl ValidationOptions {
    /// Options for the project-bound deployment mode: audience, issuer and
    /// the supplementary Firebase claim checks are derived from the project
    /// identifier.
    pub fn for_project(project_id: impl AsRef<str>) -> ValidationOptions {
        ValidationOptions {
            project_id: Some(project_id.as_ref().to_owned()),
            ..ValidationOptions::default()
        }
    }

    /// Merges `overrides` over `self`, field-wise.
    pub(crate) fn merged(&self, overrides: &ValidationOptions) -> ValidationOptions {
        ValidationOptions {
            project_id: overrides.project_id.clone().or_else(|| self.project_id.clone()),
            key_url: overrides.key_url.clone().or_else(|| self.key_url.clone()),
            algorithm: overrides.algorithm.or(self.algorithm),
            audience: overrides.audience.clone().or_else(|| self.audience.clone()),
            issuer: overrides.issuer.clone().or_else(|| self.issuer.clone()),
            subject: overrides.subject.clone().or_else(|| self.subject.clone()),
            verify_audience: overrides.verify_audience.or(self.verify_audience),
            verify_issuer: overrides.verify_issuer.or(self.verify_issuer),
            verify_subject: overrides.verify_subject.or(self.verify_subject),
            verify_issued_at: overrides.verify_issued_at.or(self.verify_issued_at),
            leeway: overrides.leeway.or(self.leeway),
            allow_expired: overrides.allow_expired.or(self.allow_expired),
        }
    }

    /// Resolves the option set into a fully-populated policy.
    pub(crate) fn resolve(&self) -> ResolvedOptions {
        let project_checks = self.project_id.is_some();

        let audience = match self.verify_audience {
            Some(false) => None,
            _ => self.audience.clone().or_else(|| self.project_id.clone()),
        };
        let issuer = match self.verify_issuer {
            Some(false) => None,
            _ => self
                .issuer
                .clone()
                .or_else(|| self.project_id.as_deref().map(issuer_for)),
        };
        let subject = match self.verify_subject {
            Some(false) => None,
            _ => self.subject.clone(),
        };

        ResolvedOptions {
            algorithm: self.algorithm.unwrap_or(Algorithm::RS256),
            audience,
            issuer,
            subject,
            verify_issued_at: self.verify_issued_at.unwrap_or(project_checks),
            leeway: self.leeway.unwrap_or(0),
            allow_expired: self.allow_expired.unwrap_or(false),
            project_checks,
        }
    }
}

fn issuer_for(project_id: &str) -> String {
    format!("https://securetoken.google.com/{project_id}")
}

/// A fully-populated validation policy, derived from [`ValidationOptions`].
#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub algorithm: Algorithm,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub verify_issued_at: bool,
    pub leeway: u64,
    pub allow_expired: bool,
    pub project_checks: bool,
}
