// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! PKCS#7 / CMS `SignedData` decoding.

use crate::{ParsedCertificate, SignatureError, SignerCertificateChain};
use cms::content_info::ContentInfo;
use const_oid::ObjectIdentifier;
use der::asn1::AnyRef;
use der::{Decode, Encode, Reader, SliceReader, Tag, TagNumber, Tagged};

/// `id-signedData` content type.
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

/// `certificates [0] IMPLICIT CertificateSet`.
const CERTIFICATES_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

/// Decode a DER `ContentInfo` carrying `SignedData` and return its embedded certificates.
///
/// Certificates are returned in the order the signer embedded them, duplicates included.
/// Non-X.509 certificate choices (attribute and legacy certificates) are skipped.
pub fn parse_signer_certificates(blob: &[u8]) -> Result<SignerCertificateChain, SignatureError> {
    let content_info = ContentInfo::from_der(blob)
        .map_err(|e| SignatureError::invalid_with("could not decode PKCS#7 ContentInfo", e))?;

    if content_info.content_type != ID_SIGNED_DATA {
        return Err(SignatureError::invalid(format!(
            "unexpected PKCS#7 content type {}",
            content_info.content_type
        )));
    }

    let signed_data_der = content_info
        .content
        .to_der()
        .map_err(|e| SignatureError::invalid_with("could not decode PKCS#7 SignedData", e))?;
    let choices = certificate_choices(&signed_data_der)
        .map_err(|e| SignatureError::invalid_with("could not decode PKCS#7 SignedData", e))?;

    let mut certificates = Vec::with_capacity(choices.len());
    for (index, choice) in choices.into_iter().enumerate() {
        if choice.tag() != Tag::Sequence {
            tracing::trace!(index, tag = %choice.tag(), "skipping non-X.509 certificate choice");
            continue;
        }
        let der = choice
            .to_der()
            .map_err(|e| SignatureError::invalid_with("could not encode embedded certificate", e))?;
        certificates.push(ParsedCertificate::from_der(&der)?);
    }

    tracing::debug!(certificates = certificates.len(), "decoded PKCS#7 SignedData");

    Ok(SignerCertificateChain::new(certificates))
}

/// Walk the `SignedData` SEQUENCE and return the `certificates` elements as written.
///
/// The SET OF is read element by element rather than as a sorted set, so signer order and
/// repeated certificates survive decoding.
fn certificate_choices(signed_data: &[u8]) -> der::Result<Vec<AnyRef<'_>>> {
    let mut reader = SliceReader::new(signed_data)?;
    let choices = reader.sequence(|sd| {
        sd.decode::<AnyRef<'_>>()?.tag().assert_eq(Tag::Integer)?;
        sd.decode::<AnyRef<'_>>()?.tag().assert_eq(Tag::Set)?;
        sd.decode::<AnyRef<'_>>()?.tag().assert_eq(Tag::Sequence)?;

        let mut choices = Vec::new();
        while !sd.is_finished() {
            let field: AnyRef<'_> = sd.decode()?;
            if field.tag() != CERTIFICATES_TAG {
                continue;
            }
            let mut set = SliceReader::new(field.value())?;
            while !set.is_finished() {
                choices.push(set.decode::<AnyRef<'_>>()?);
            }
        }
        Ok(choices)
    })?;
    reader.finish(choices)
}
