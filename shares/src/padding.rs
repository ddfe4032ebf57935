//! Shares that carry no data.
//!
//! Every padding share is a sequence start with a declared length of zero. The namespace tells
//! readers what the padding is for:
//!
//! - the namespace of the preceding blob, between two blobs
//! - [Namespace::PRIMARY_RESERVED_PADDING], between the reserved shares and the first blob
//! - [Namespace::TAIL_PADDING], after the last blob

use crate::{InfoByte, Namespace, Share, ShareVersion, SHARE_SIZE};
use bytes::BytesMut;

/// Returns a padding share in `namespace`.
///
/// The share version is kept so that the padding matches the blob it follows.
pub fn namespace_padding_share(namespace: Namespace, version: ShareVersion) -> Share {
    // The sequence length and any reserved offset are zero, so both layouts encode the same
    let mut data = BytesMut::zeroed(SHARE_SIZE);
    data[..namespace.len()].copy_from_slice(namespace.as_bytes());
    data[namespace.len()] = InfoByte::from_version(version, true).as_u8();
    Share::new_unchecked(data.freeze())
}

/// Returns `count` copies of the padding share in `namespace`.
pub fn namespace_padding_shares(
    namespace: Namespace,
    version: ShareVersion,
    count: usize,
) -> Vec<Share> {
    vec![namespace_padding_share(namespace, version); count]
}

/// Returns `count` shares padding the gap between the reserved shares and the first blob.
pub fn reserved_padding_shares(count: usize) -> Vec<Share> {
    namespace_padding_shares(Namespace::PRIMARY_RESERVED_PADDING, ShareVersion::Zero, count)
}

/// Returns `count` shares filling the square after the last blob.
pub fn tail_padding_shares(count: usize) -> Vec<Share> {
    namespace_padding_shares(Namespace::TAIL_PADDING, ShareVersion::Zero, count)
}
