// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::chain_verifier::PathValidationError;
use std::fmt;

/// Identifies the signer certificate that failed path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDiagnostic {
    /// Position of the certificate in the signer chain, as decoded.
    pub index: usize,
    /// Subject distinguished name of the certificate under test.
    pub subject: String,
    /// Path validation failure.
    pub error: PathValidationError,
    /// Depth in the constructed path at which the failure was detected
    /// (0 = certificate under test).
    pub depth: usize,
}

impl fmt::Display for CertificateDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "certificate #{} '{}': {} (code {}, depth {})",
            self.index,
            self.subject,
            self.error,
            self.error.code(),
            self.depth
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// The signature container, its certificates, or the origin policy was rejected.
    #[error("signature invalid: {reason}{}", diagnostic_suffix(.diagnostic))]
    SignatureInvalid {
        reason: String,
        diagnostic: Option<CertificateDiagnostic>,
    },

    /// The underlying stream failed to seek or read.
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),
}

fn diagnostic_suffix(diagnostic: &Option<CertificateDiagnostic>) -> String {
    diagnostic.as_ref().map(|d| format!(" ({d})")).unwrap_or_default()
}

impl SignatureError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::SignatureInvalid {
            reason: reason.into(),
            diagnostic: None,
        }
    }

    /// Normalizes a foreign parse error into `SignatureInvalid`, keeping its text.
    pub(crate) fn invalid_with<E: fmt::Display>(reason: &str, e: E) -> Self {
        Self::invalid(format!("{reason}: {e}"))
    }

    pub(crate) fn certificate(
        reason: impl Into<String>,
        diagnostic: CertificateDiagnostic,
    ) -> Self {
        Self::SignatureInvalid {
            reason: reason.into(),
            diagnostic: Some(diagnostic),
        }
    }

    /// Returns true for the `SignatureInvalid` kind.
    pub fn is_signature_invalid(&self) -> bool {
        matches!(self, Self::SignatureInvalid { .. })
    }

    /// Failing certificate details, when the failure came from chain verification.
    pub fn diagnostic(&self) -> Option<&CertificateDiagnostic> {
        match self {
            Self::SignatureInvalid { diagnostic, .. } => diagnostic.as_ref(),
            Self::Stream(_) => None,
        }
    }
}
