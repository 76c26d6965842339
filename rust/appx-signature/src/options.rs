// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::fmt;

/// Caller policy for one validation.
///
/// `Default` runs full validation and requires a recognized origin.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Return without reading the stream. The outcome reports `validated = false`.
    pub skip_signature: bool,
    /// Accept a valid chain whose origin could not be classified.
    pub allow_unknown_origin: bool,
    /// Carried for callers that pass manifest policy through; validation ignores it.
    pub skip_manifest: bool,
}

impl ValidationOptions {
    pub const SKIP_SIGNATURE: u32 = 0x1;
    pub const ALLOW_SIGNATURE_ORIGIN_UNKNOWN: u32 = 0x2;
    pub const SKIP_APPX_MANIFEST: u32 = 0x4;

    /// Unknown bits are ignored.
    pub fn from_bits(bits: u32) -> Self {
        Self {
            skip_signature: bits & Self::SKIP_SIGNATURE != 0,
            allow_unknown_origin: bits & Self::ALLOW_SIGNATURE_ORIGIN_UNKNOWN != 0,
            skip_manifest: bits & Self::SKIP_APPX_MANIFEST != 0,
        }
    }

    pub fn bits(&self) -> u32 {
        let mut bits = 0;
        if self.skip_signature {
            bits |= Self::SKIP_SIGNATURE;
        }
        if self.allow_unknown_origin {
            bits |= Self::ALLOW_SIGNATURE_ORIGIN_UNKNOWN;
        }
        if self.skip_manifest {
            bits |= Self::SKIP_APPX_MANIFEST;
        }
        bits
    }
}

/// Names of the package digests recorded in a signature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DigestName {
    /// Package content (zip local file records).
    Axpc,
    /// Central directory.
    Axcd,
    /// `[Content_Types].xml`.
    Axct,
    /// Block map.
    Axbm,
    /// Code integrity catalog.
    Axci,
}

impl DigestName {
    pub const ALL: [DigestName; 5] = [Self::Axpc, Self::Axcd, Self::Axct, Self::Axbm, Self::Axci];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Axpc => "AXPC",
            Self::Axcd => "AXCD",
            Self::Axct => "AXCT",
            Self::Axbm => "AXBM",
            Self::Axci => "AXCI",
        }
    }
}

impl fmt::Display for DigestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected package digests keyed by name.
///
/// Validation accepts this map so callers can thread it through, but does not populate it yet.
pub type DigestMap = BTreeMap<DigestName, Vec<u8>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_full_validation() {
        let options = ValidationOptions::default();
        assert!(!options.skip_signature);
        assert!(!options.allow_unknown_origin);
        assert_eq!(options.bits(), 0);
    }

    #[test]
    fn bits_round_trip_and_ignore_unknown() {
        let options = ValidationOptions::from_bits(0x1 | 0x2 | 0x4 | 0x80);
        assert!(options.skip_signature);
        assert!(options.allow_unknown_origin);
        assert!(options.skip_manifest);
        assert_eq!(options.bits(), 0x7);

        assert_eq!(ValidationOptions::from_bits(0x2).bits(), 0x2);
    }

    #[test]
    fn digest_names_render_as_tags() {
        let names: Vec<String> = DigestName::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["AXPC", "AXCD", "AXCT", "AXBM", "AXCI"]);
    }
}
