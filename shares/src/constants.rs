//! Sizes that define the byte layout of a share.

/// The number of bytes in a share.
pub const SHARE_SIZE: usize = 512;

/// The number of bytes used to encode the version of a namespace.
pub const NAMESPACE_VERSION_SIZE: usize = 1;

/// The number of bytes used to encode the id of a namespace.
pub const NAMESPACE_ID_SIZE: usize = 28;

/// The number of bytes used to encode a namespace (version and id).
pub const NAMESPACE_SIZE: usize = NAMESPACE_VERSION_SIZE + NAMESPACE_ID_SIZE;

/// The number of leading zero bytes in the id of a version zero namespace.
pub const NAMESPACE_VERSION_ZERO_PREFIX_SIZE: usize = 18;

/// The number of user-chosen bytes in the id of a version zero namespace.
pub const NAMESPACE_VERSION_ZERO_ID_SIZE: usize =
    NAMESPACE_ID_SIZE - NAMESPACE_VERSION_ZERO_PREFIX_SIZE;

/// The version of user namespaces (and of primary reserved namespaces).
pub const NAMESPACE_VERSION_ZERO: u8 = 0;

/// The version of secondary reserved namespaces.
pub const NAMESPACE_VERSION_MAX: u8 = u8::MAX;

/// The number of bytes used for the info byte.
pub const SHARE_INFO_BYTES: usize = 1;

/// The number of bytes used for the sequence length of a sequence start share.
pub const SEQUENCE_LEN_BYTES: usize = 4;

/// The number of bytes used for the reserved offset of a compact share.
pub const SHARE_RESERVED_BYTES: usize = 4;

/// The number of bytes used for the signer of a versioned blob.
pub const SIGNER_SIZE: usize = 20;

/// The largest share version that fits in the info byte.
pub const MAX_SHARE_VERSION: u8 = 127;

/// The number of bytes used for the fibre blob version in a version two blob.
pub const FIBRE_BLOB_VERSION_SIZE: usize = 4;

/// The number of bytes used for the commitment in a version two blob.
pub const FIBRE_COMMITMENT_SIZE: usize = 32;

/// The payload size of a version two blob.
pub const FIBRE_BLOB_DATA_SIZE: usize = FIBRE_BLOB_VERSION_SIZE + FIBRE_COMMITMENT_SIZE;

/// The number of payload bytes in the first share of a compact sequence.
pub const FIRST_COMPACT_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SEQUENCE_LEN_BYTES - SHARE_RESERVED_BYTES;

/// The number of payload bytes in every other share of a compact sequence.
pub const CONTINUATION_COMPACT_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SHARE_RESERVED_BYTES;

/// The number of payload bytes in the first share of a sparse sequence without a signer.
pub const FIRST_SPARSE_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES - SEQUENCE_LEN_BYTES;

/// The number of payload bytes in every other share of a sparse sequence.
pub const CONTINUATION_SPARSE_SHARE_CONTENT_SIZE: usize =
    SHARE_SIZE - NAMESPACE_SIZE - SHARE_INFO_BYTES;
