use crate::{
    sparse_shares_needed, Error, Namespace, ShareVersion, FIBRE_BLOB_VERSION_SIZE,
    FIBRE_COMMITMENT_SIZE,
};
use bytes::Bytes;

/// A namespaced payload published by a user.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Blob {
    namespace: Namespace,
    data: Bytes,
    share_version: ShareVersion,
    signer: Option<Bytes>,
}

impl Blob {
    /// Create a validated blob.
    ///
    /// The data must be non-empty, the namespace must be an unreserved version zero namespace,
    /// and the signer must be present (with exactly the required size) if and only if the share
    /// version carries one.
    /// [ShareVersion::Two] additionally requires exactly the fibre payload size.
    pub fn new(
        namespace: Namespace,
        data: impl Into<Bytes>,
        share_version: ShareVersion,
        signer: Option<Bytes>,
    ) -> Result<Self, Error> {
        let data = data.into();
        if data.is_empty() {
            return Err(Error::EmptyBlobData);
        }
        if u32::try_from(data.len()).is_err() {
            return Err(Error::SequenceTooLong(data.len()));
        }
        if namespace.is_reserved() {
            return Err(Error::ReservedNamespace(namespace));
        }
        if !namespace.is_usable_for_blob() {
            return Err(Error::UnsupportedNamespaceVersion(namespace.version()));
        }
        match (&signer, share_version.signer_size()) {
            (Some(_), 0) => return Err(Error::UnexpectedSigner(share_version.as_u8())),
            (None, expected) if expected > 0 => {
                return Err(Error::InvalidSignerSize {
                    version: share_version.as_u8(),
                    expected,
                    actual: 0,
                })
            }
            (Some(signer), expected) if signer.len() != expected => {
                return Err(Error::InvalidSignerSize {
                    version: share_version.as_u8(),
                    expected,
                    actual: signer.len(),
                })
            }
            _ => {}
        }
        if let Some(expected) = share_version.fixed_data_size() {
            if data.len() != expected {
                return Err(Error::InvalidBlobDataSize {
                    version: share_version.as_u8(),
                    expected,
                    actual: data.len(),
                });
            }
        }

        Ok(Self {
            namespace,
            data,
            share_version,
            signer,
        })
    }

    /// Create a blob without a signer.
    pub fn new_v0(namespace: Namespace, data: impl Into<Bytes>) -> Result<Self, Error> {
        Self::new(namespace, data, ShareVersion::Zero, None)
    }

    /// Create a blob carrying the address of its signer.
    pub fn new_v1(
        namespace: Namespace,
        data: impl Into<Bytes>,
        signer: impl Into<Bytes>,
    ) -> Result<Self, Error> {
        Self::new(namespace, data, ShareVersion::One, Some(signer.into()))
    }

    /// Create a fibre blob: a commitment to data published elsewhere, tagged with the version
    /// of the fibre blob format.
    pub fn new_v2(
        namespace: Namespace,
        fibre_blob_version: u32,
        commitment: [u8; FIBRE_COMMITMENT_SIZE],
        signer: impl Into<Bytes>,
    ) -> Result<Self, Error> {
        let mut data = Vec::with_capacity(FIBRE_BLOB_VERSION_SIZE + FIBRE_COMMITMENT_SIZE);
        data.extend_from_slice(&fibre_blob_version.to_be_bytes());
        data.extend_from_slice(&commitment);
        Self::new(namespace, data, ShareVersion::Two, Some(signer.into()))
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn share_version(&self) -> ShareVersion {
        self.share_version
    }

    pub fn signer(&self) -> Option<&Bytes> {
        self.signer.as_ref()
    }

    /// Returns the fibre blob version of a [ShareVersion::Two] blob.
    pub fn fibre_blob_version(&self) -> Option<u32> {
        if self.share_version != ShareVersion::Two {
            return None;
        }
        let mut version = [0u8; FIBRE_BLOB_VERSION_SIZE];
        version.copy_from_slice(&self.data[..FIBRE_BLOB_VERSION_SIZE]);
        Some(u32::from_be_bytes(version))
    }

    /// Returns the commitment of a [ShareVersion::Two] blob.
    pub fn commitment(&self) -> Option<&[u8]> {
        if self.share_version != ShareVersion::Two {
            return None;
        }
        Some(&self.data[FIBRE_BLOB_VERSION_SIZE..])
    }

    /// Returns the length written into the first share of the blob.
    pub fn sequence_len(&self) -> u32 {
        // Bounded at construction
        self.data.len() as u32
    }

    /// Returns the number of sparse shares the blob occupies.
    pub fn shares_needed(&self) -> usize {
        sparse_shares_needed(self.sequence_len(), self.share_version.requires_signer())
    }
}

/// Sort blobs by namespace, keeping the relative order of blobs in the same namespace.
pub fn sort_blobs(blobs: &mut [Blob]) {
    blobs.sort_by(|a, b| a.namespace.cmp(&b.namespace));
}
