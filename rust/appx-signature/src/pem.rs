// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Delimited base64 (PEM) certificate text to DER bytes.

use crate::SignatureError;
use base64::Engine;

const BEGIN_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const END_CERTIFICATE: &str = "-----END CERTIFICATE-----";

/// PEM body line width.
const PEM_LINE_WIDTH: usize = 64;

/// Decode a PEM certificate (delimiter lines optional) into its DER bytes.
///
/// Delimiter lines are dropped and the remaining lines are joined into a single base64
/// string. The decoded length must equal `len * 3 / 4 - padding`, where `padding` is the
/// number of trailing `=` characters (at most two).
pub fn decode_base64_certificate(
    base64_cert_with_delimiters: &str,
) -> Result<Vec<u8>, SignatureError> {
    let base64_cert: String = base64_cert_with_delimiters
        .lines()
        .filter(|line| !line.contains(BEGIN_CERTIFICATE) && !line.contains(END_CERTIFICATE))
        .map(str::trim)
        .collect();

    let expected_len = expected_decoded_len(base64_cert.as_bytes());

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(base64_cert.as_bytes())
        .map_err(|e| SignatureError::invalid_with("certificate is invalid", e))?;

    if decoded.len() != expected_len {
        return Err(SignatureError::invalid(format!(
            "certificate is invalid: decoded {} bytes, expected {expected_len}",
            decoded.len()
        )));
    }

    Ok(decoded)
}

fn expected_decoded_len(encoded: &[u8]) -> usize {
    let padding = encoded
        .iter()
        .rev()
        .take(2)
        .filter(|&&c| c == b'=')
        .count();
    (encoded.len() * 3 / 4).saturating_sub(padding)
}

/// Encode DER certificate bytes as a delimited PEM block with 64-column lines.
pub fn encode_pem_certificate(der: &[u8]) -> String {
    let body = base64::engine::general_purpose::STANDARD.encode(der);

    let mut out = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);
    out.push_str(BEGIN_CERTIFICATE);
    out.push('\n');
    // base64 output is ASCII, so byte chunks are valid UTF-8.
    for chunk in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str(END_CERTIFICATE);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_len_counts_trailing_padding_only() {
        assert_eq!(expected_decoded_len(b"TWFu"), 3);
        assert_eq!(expected_decoded_len(b"TWE="), 2);
        assert_eq!(expected_decoded_len(b"TQ=="), 1);
        assert_eq!(expected_decoded_len(b"=AAA"), 3);
    }

    #[test]
    fn expected_len_handles_short_input() {
        assert_eq!(expected_decoded_len(b""), 0);
        assert_eq!(expected_decoded_len(b"="), 0);
        assert_eq!(expected_decoded_len(b"A"), 0);
    }

    #[test]
    fn decodes_body_without_delimiters() {
        assert_eq!(decode_base64_certificate("TWFu").unwrap(), b"Man");
    }

    #[test]
    fn decodes_multi_line_body_with_crlf() {
        let pem = "-----BEGIN CERTIFICATE-----\r\nTWFu\r\nTWE=\r\n-----END CERTIFICATE-----\r\n";
        // "TWFuTWE=" decodes to "ManMa".
        assert_eq!(decode_base64_certificate(pem).unwrap(), b"ManMa");
    }

    #[test]
    fn empty_input_decodes_to_empty() {
        assert!(decode_base64_certificate("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_base64_characters() {
        let pem = "-----BEGIN CERTIFICATE-----\nTW*u\n-----END CERTIFICATE-----";
        let err = decode_base64_certificate(pem).unwrap_err();
        assert!(err.is_signature_invalid());
    }

    #[test]
    fn rejects_truncated_quantum() {
        let err = decode_base64_certificate("TWFuT").unwrap_err();
        assert!(err.is_signature_invalid());
    }

    #[test]
    fn pem_round_trip_wraps_lines() {
        let der: Vec<u8> = (0u8..=200).collect();
        let pem = encode_pem_certificate(&der);
        assert!(pem.starts_with(BEGIN_CERTIFICATE));
        assert!(pem.lines().all(|l| l.len() <= PEM_LINE_WIDTH || l.starts_with("-----")));
        assert_eq!(decode_base64_certificate(&pem).unwrap(), der);
    }
}
