//! Shared fixtures for the in-module test suites.

use jsonwebtoken::EncodingKey;
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder};

/// A self-signed certificate and the matching JWT signing key, generated
/// in-process.
pub(crate) fn certified_keypair() -> (String, EncodingKey) {
    let rsa = Rsa::generate(2048).unwrap();
    let pkey = PKey::from_rsa(rsa.clone()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "securetoken.system.gserviceaccount.com")
        .unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&pkey).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(16).unwrap())
        .unwrap();
    builder.sign(&pkey, MessageDigest::sha256()).unwrap();
    let cert_pem = String::from_utf8(builder.build().to_pem().unwrap()).unwrap();

    let private_pem = rsa.private_key_to_pem().unwrap();
    let encoding_key = EncodingKey::from_rsa_pem(&private_pem).unwrap();

    (cert_pem, encoding_key)
}

/// The certificate alone, for suites that never sign anything.
pub(crate) fn cert_pem() -> String {
    certified_keypair().0
}

/// An HTTP-date the given number of seconds from now.
pub(crate) fn http_date_in(seconds: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::seconds(seconds)).to_rfc2822()
}
