use jsonwebtoken::DecodingKey;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

use crate::error::KeyParseError;

/// Builds a verification key from one PEM entry of the key server response.
///
/// Google's metadata endpoint serves PEM-encoded X.509 certificates; other
/// endpoints serve bare PEM public keys. Both are accepted, as long as the
/// underlying key is RSA.
pub(crate) fn decoding_key_from_pem(pem: &str) -> Result<DecodingKey, KeyParseError> {
    if !pem.contains("-----BEGIN CERTIFICATE-----") {
        return Ok(DecodingKey::from_rsa_pem(pem.as_bytes())?);
    }

    let (_, doc) = parse_x509_pem(pem.as_bytes())
        .map_err(|_| KeyParseError::InvalidCertificate)?;
    let cert = doc
        .parse_x509()
        .map_err(|_| KeyParseError::InvalidCertificate)?;

    let spki = cert.public_key();
    match spki.parsed() {
        Ok(PublicKey::RSA(_)) => {}
        _ => return Err(KeyParseError::UnexpectedKeyAlgorithm),
    }

    // The SPKI bit string holds the DER-encoded RSAPublicKey.
    Ok(DecodingKey::from_rsa_der(&spki.subject_public_key.data))
}
