// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Signature validation for AppX/MSIX package signature containers.
//!
//! An `AppxSignature.p7x` file wraps a DER PKCS#7 `SignedData` structure in a
//! small binary envelope. Validation runs a staged pipeline:
//! 1) parse the envelope and extract the signer certificates
//! 2) build the trust anchor set from caller-provided PEM roots
//! 3) build and validate a certification path for every signer certificate
//! 4) classify the signature origin and apply the caller's origin policy
//!
//! Most callers should construct a [`SignatureValidator`] and call
//! [`SignatureValidator::validate`].

mod cert_signature;
mod certificate;
pub mod chain_verifier;
pub mod container;
mod error;
mod options;
pub mod origin;
pub mod pem;
pub mod signed_data;
pub mod trust_anchors;
mod validator;

pub use certificate::ParsedCertificate;
pub use chain_verifier::{
    ChainVerifier, PathDiagnostic, PathFailure, PathValidationError, SignerCertificateChain,
    VerificationContext, VerificationFlags,
};
pub use container::{ReadSeek, SignedContainer, MAX_CONTAINER_SIZE, P7X_FILE_ID};
pub use error::{CertificateDiagnostic, SignatureError};
pub use options::{DigestMap, DigestName, ValidationOptions};
pub use origin::{ExtensionDescription, SignatureOrigin, WINDOWS_STORE_OID};
pub use pem::{decode_base64_certificate, encode_pem_certificate};
pub use trust_anchors::{TrustAnchorConfig, TrustAnchorSet};
pub use validator::{SignatureValidator, ValidationOutcome};
