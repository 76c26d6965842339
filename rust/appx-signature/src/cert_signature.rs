// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Certificate signature verification against an issuer public key.

use p256::elliptic_curve::sec1::ToEncodedPoint as _;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use rsa::RsaPublicKey;
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};
use signature::Verifier as _;

const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CertSignatureError {
    /// The issuer SubjectPublicKeyInfo could not be decoded for the signature algorithm.
    IssuerKey(String),
    /// The signature did not verify, or is in an unsupported algorithm.
    Signature(String),
}

fn rsa_public_key_from_spki(spki_der: &[u8]) -> Result<RsaPublicKey, CertSignatureError> {
    RsaPublicKey::from_public_key_der(spki_der)
        .map_err(|e| CertSignatureError::IssuerKey(format!("bad RSA public key: {e}")))
}

fn verify_rsa<D>(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature: &[u8],
) -> Result<(), CertSignatureError>
where
    D: sha2::Digest + const_oid::AssociatedOid,
{
    let key = rsa_public_key_from_spki(issuer_spki_der)?;
    let vk = pkcs1v15::VerifyingKey::<D>::new(key);
    let sig = pkcs1v15::Signature::try_from(signature)
        .map_err(|e| CertSignatureError::Signature(format!("bad RSA signature bytes: {e}")))?;
    vk.verify(tbs_der, &sig).map_err(|_| verification_failed())
}

/// ECDSA over one of the NIST curve crates. The curve crates expose distinct `VerifyingKey`
/// types (P-521 wraps its own), so the shared steps are expanded per crate.
macro_rules! verify_ecdsa {
    ($curve:ident, $name:literal, $spki:expr, $tbs:expr, $signature:expr) => {{
        let bad_key = |e: &dyn std::fmt::Display| {
            CertSignatureError::IssuerKey(format!("bad {} issuer public key: {e}", $name))
        };
        let pk = $curve::PublicKey::from_public_key_der($spki).map_err(|e| bad_key(&e))?;
        let vk = $curve::ecdsa::VerifyingKey::from_sec1_bytes(pk.to_encoded_point(false).as_bytes())
            .map_err(|e| bad_key(&e))?;
        let sig = $curve::ecdsa::Signature::from_der($signature)
            .map_err(|e| CertSignatureError::Signature(format!("bad ECDSA signature bytes: {e}")))?;
        vk.verify($tbs, &sig).map_err(|_| verification_failed())
    }};
}

fn verification_failed() -> CertSignatureError {
    CertSignatureError::Signature("certificate signature verification failed".to_string())
}

/// Verify `signature` over `tbs_der` with the issuer key, for the given signature algorithm OID.
pub(crate) fn verify_cert_signature(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature_oid: &str,
    signature: &[u8],
) -> Result<(), CertSignatureError> {
    match signature_oid {
        SHA1_WITH_RSA => verify_rsa::<Sha1>(issuer_spki_der, tbs_der, signature),
        SHA256_WITH_RSA => verify_rsa::<Sha256>(issuer_spki_der, tbs_der, signature),
        SHA384_WITH_RSA => verify_rsa::<Sha384>(issuer_spki_der, tbs_der, signature),
        SHA512_WITH_RSA => verify_rsa::<Sha512>(issuer_spki_der, tbs_der, signature),

        ECDSA_WITH_SHA256 => verify_ecdsa!(p256, "P-256", issuer_spki_der, tbs_der, signature),
        ECDSA_WITH_SHA384 => verify_ecdsa!(p384, "P-384", issuer_spki_der, tbs_der, signature),
        ECDSA_WITH_SHA512 => verify_ecdsa!(p521, "P-521", issuer_spki_der, tbs_der, signature),

        _ => Err(CertSignatureError::Signature(format!(
            "unsupported certificate signature algorithm OID: {signature_oid}"
        ))),
    }
}
