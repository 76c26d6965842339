// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The P7X envelope: `[u32 LE magic][DER ContentInfo(SignedData)]`.

use crate::signed_data::parse_signer_certificates;
use crate::{SignatureError, SignerCertificateChain};
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Helper trait for `Read + Seek` as a single trait object.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// P7X file identifier: the bytes `PKCX` read as a little-endian `u32`.
pub const P7X_FILE_ID: u32 = 0x5843_4B50;

/// Upper bound on the whole container, magic included.
pub const MAX_CONTAINER_SIZE: u64 = 2 << 20;

const MAGIC_SIZE: u64 = std::mem::size_of::<u32>() as u64;

/// A P7X container read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedContainer {
    magic_id: u32,
    signed_data: Vec<u8>,
}

impl SignedContainer {
    /// Read and check the envelope. The signed-data blob is not decoded here.
    pub fn read_from(stream: &mut dyn ReadSeek) -> Result<Self, SignatureError> {
        let length = stream.seek(SeekFrom::End(0))?;
        if length <= MAGIC_SIZE || length > MAX_CONTAINER_SIZE {
            tracing::debug!(length, "p7x container size out of range");
            return Err(SignatureError::invalid("stream is too big"));
        }
        stream.seek(SeekFrom::Start(0))?;

        let mut magic = [0u8; MAGIC_SIZE as usize];
        read_exact_or_invalid(stream, &mut magic)?;
        let magic_id = u32::from_le_bytes(magic);
        if magic_id != P7X_FILE_ID {
            tracing::debug!(magic_id, "unexpected p7x header");
            return Err(SignatureError::invalid("unexpected p7x header"));
        }

        // Bounded by MAX_CONTAINER_SIZE above.
        let mut signed_data = vec![0u8; (length - MAGIC_SIZE) as usize];
        read_exact_or_invalid(stream, &mut signed_data)?;

        tracing::trace!(signed_data_len = signed_data.len(), "read p7x container");
        Ok(Self { magic_id, signed_data })
    }

    pub fn magic_id(&self) -> u32 {
        self.magic_id
    }

    /// Raw DER of the PKCS#7 ContentInfo.
    pub fn signed_data(&self) -> &[u8] {
        &self.signed_data
    }

    /// Decode the signed-data blob and extract its embedded certificates.
    pub fn signer_certificates(&self) -> Result<SignerCertificateChain, SignatureError> {
        parse_signer_certificates(&self.signed_data)
    }
}

fn read_exact_or_invalid(stream: &mut dyn ReadSeek, buf: &mut [u8]) -> Result<(), SignatureError> {
    stream.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => SignatureError::invalid("read error"),
        _ => SignatureError::Stream(e),
    })
}
