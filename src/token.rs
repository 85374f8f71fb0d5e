use std::ops::Deref;

use serde::Serialize;
use serde_json::{Map, Value};

/// A decoded, verified ID token.
///
/// Holds the token's payload and header exactly as decoded, with no fields
/// added, removed or renamed. Immutable once constructed; dereferences to the
/// claims map for convenient lookups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    claims: Map<String, Value>,
    #[serde(skip)]
    header: Map<String, Value>,
}

impl Token {
    pub(crate) fn new(claims: Map<String, Value>, header: Map<String, Value>) -> Token {
        Token { claims, header }
    }

    /// The token payload: claim name to claim value.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// The token header, e.g. `alg` and `kid`.
    pub fn header(&self) -> &Map<String, Value> {
        &self.header
    }

    /// Looks up a single claim by name.
    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.claims.get(claim)
    }

    /// The `sub` claim, when present as a string.
    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }
}

impl Deref for Token {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.claims
    }
}
