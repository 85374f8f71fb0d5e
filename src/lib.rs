//! # firetoken
//!
//! Verification of Firebase ID tokens (JWTs) against Google's public signing
//! keys, fetched from the X.509 certificate metadata endpoint and cached
//! until the server-supplied `Expires` instant.
//!
//! ## Example
//!
//! ```no_run
//! use firetoken::Validator;
//!
//! # async fn run() -> firetoken::Result<()> {
//! // Blocks on the initial key fetch; fails if the keys cannot be fetched.
//! let validator = Validator::new("your-project-id").await?;
//!
//! let token = validator.decode("eyJhbGciOi...").await?;
//! println!("authenticated: {:?}", token.subject());
//! # Ok(())
//! # }
//! ```
//!
//! Generic issuer/audience/subject policies (for non-Firebase endpoints
//! serving the same `{kid: PEM}` format) go through
//! [`Validator::with_options`].

mod cache;
mod error;
mod key;
mod options;
#[cfg(test)]
mod testutil;
mod token;
mod validator;

pub use cache::{KeyCache, DEFAULT_KEY_URL};
pub use error::{Error, KeyParseError, KeysError, Result, ValidationError};
pub use options::ValidationOptions;
pub use token::Token;
pub use validator::Validator;
