//! An immutable, validated [SHARE_SIZE]-byte share.

use crate::{
    Error, InfoByte, Namespace, ShareVersion, CONTINUATION_COMPACT_SHARE_CONTENT_SIZE,
    CONTINUATION_SPARSE_SHARE_CONTENT_SIZE, FIRST_COMPACT_SHARE_CONTENT_SIZE,
    FIRST_SPARSE_SHARE_CONTENT_SIZE, NAMESPACE_SIZE, SEQUENCE_LEN_BYTES, SHARE_INFO_BYTES,
    SHARE_RESERVED_BYTES, SHARE_SIZE, SIGNER_SIZE,
};
use bytes::Bytes;
use std::fmt::Debug;

pub(crate) const INFO_BYTE_INDEX: usize = NAMESPACE_SIZE;
pub(crate) const SEQUENCE_LEN_INDEX: usize = INFO_BYTE_INDEX + SHARE_INFO_BYTES;

/// A fixed-size unit of square storage.
///
/// The namespace of a share is validated when the share is created, so every accessor is
/// infallible. Fields are derived by slicing the underlying bytes and never stored separately.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Share(Bytes);

impl Share {
    /// Create a share from its encoding.
    ///
    /// Fails if `data` is not exactly [SHARE_SIZE] bytes or does not start with a valid
    /// namespace.
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self, Error> {
        let data = data.into();
        if data.len() != SHARE_SIZE {
            return Err(Error::InvalidShareSize(data.len()));
        }
        Namespace::from_raw(&data[..NAMESPACE_SIZE])?;
        Ok(Self(data))
    }

    /// Wrap bytes the caller has already laid out as a valid share.
    pub(crate) fn new_unchecked(data: Bytes) -> Self {
        debug_assert_eq!(data.len(), SHARE_SIZE);
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn namespace(&self) -> Namespace {
        // Validated at construction.
        let mut bytes = [0u8; NAMESPACE_SIZE];
        bytes.copy_from_slice(&self.0[..NAMESPACE_SIZE]);
        Namespace::from_raw(&bytes).unwrap_or(Namespace::PARITY_SHARES)
    }

    pub fn info_byte(&self) -> InfoByte {
        InfoByte::from_raw(self.0[INFO_BYTE_INDEX])
    }

    /// Returns the share version recorded in the info byte.
    ///
    /// This may be a version this crate does not know how to interpret (see
    /// [ShareVersion::try_from]).
    pub fn version(&self) -> u8 {
        self.info_byte().version()
    }

    pub fn is_sequence_start(&self) -> bool {
        self.info_byte().is_sequence_start()
    }

    /// Returns true if the share uses the compact layout (with reserved bytes).
    pub fn is_compact(&self) -> bool {
        self.namespace().is_compact()
    }

    /// Returns the declared length of the sequence this share starts, or zero if the share is
    /// a continuation share.
    pub fn sequence_len(&self) -> u32 {
        if !self.is_sequence_start() {
            return 0;
        }
        let mut len = [0u8; SEQUENCE_LEN_BYTES];
        len.copy_from_slice(&self.0[SEQUENCE_LEN_INDEX..SEQUENCE_LEN_INDEX + SEQUENCE_LEN_BYTES]);
        u32::from_be_bytes(len)
    }

    fn has_signer(&self) -> bool {
        self.is_sequence_start()
            && ShareVersion::try_from(self.version())
                .map(ShareVersion::requires_signer)
                .unwrap_or(false)
    }

    /// Returns the signer of a versioned sequence start share.
    pub fn signer(&self) -> Option<&[u8]> {
        if !self.has_signer() {
            return None;
        }
        let start = SEQUENCE_LEN_INDEX + SEQUENCE_LEN_BYTES;
        Some(&self.0[start..start + SIGNER_SIZE])
    }

    /// Returns true if the share only pads the square.
    ///
    /// This is the case for namespace padding shares (a sequence start with a declared length
    /// of zero) and for any share in the tail or primary reserved padding namespaces.
    pub fn is_padding(&self) -> bool {
        let namespace = self.namespace();
        (self.is_sequence_start() && self.sequence_len() == 0)
            || namespace.is_tail_padding()
            || namespace.is_primary_reserved_padding()
    }

    /// Returns the index at which the payload of this share begins.
    fn raw_data_start(&self) -> usize {
        let mut index = SEQUENCE_LEN_INDEX;
        if self.is_sequence_start() {
            index += SEQUENCE_LEN_BYTES;
        }
        if self.is_compact() {
            index += SHARE_RESERVED_BYTES;
        }
        if self.has_signer() {
            index += SIGNER_SIZE;
        }
        index
    }

    /// Returns the payload of the share (everything after the header).
    pub fn raw_data(&self) -> &[u8] {
        &self.0[self.raw_data_start()..]
    }

    /// Returns the reserved offset of a compact share.
    pub fn reserved_offset(&self) -> Result<u32, Error> {
        if !self.is_compact() {
            return Err(Error::NotCompactShare);
        }
        let index = self.raw_data_start() - SHARE_RESERVED_BYTES;
        let mut offset = [0u8; SHARE_RESERVED_BYTES];
        offset.copy_from_slice(&self.0[index..index + SHARE_RESERVED_BYTES]);
        Ok(u32::from_be_bytes(offset))
    }

    /// Returns the payload of a compact share starting at the first unit that begins inside
    /// it, as recorded by the reserved offset.
    ///
    /// If no unit begins inside the share, the result is empty.
    pub fn raw_data_using_reserved(&self) -> Result<&[u8], Error> {
        let offset = self.reserved_offset()?;
        if offset == 0 {
            return Ok(&[]);
        }
        let start = offset as usize;
        if start < self.raw_data_start() || start >= SHARE_SIZE {
            return Err(Error::InvalidReservedOffset(offset));
        }
        Ok(&self.0[start..])
    }
}

impl AsRef<[u8]> for Share {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Share")
            .field("namespace", &self.namespace())
            .field("version", &self.version())
            .field("sequence_start", &self.is_sequence_start())
            .field("sequence_len", &self.sequence_len())
            .finish()
    }
}

/// Returns the number of compact shares needed to store a sequence of `sequence_len` bytes.
pub fn compact_shares_needed(sequence_len: u32) -> usize {
    shares_needed(
        sequence_len as usize,
        FIRST_COMPACT_SHARE_CONTENT_SIZE,
        CONTINUATION_COMPACT_SHARE_CONTENT_SIZE,
    )
}

/// Returns the number of sparse shares needed to store a sequence of `sequence_len` bytes.
pub fn sparse_shares_needed(sequence_len: u32, contains_signer: bool) -> usize {
    let mut first = FIRST_SPARSE_SHARE_CONTENT_SIZE;
    if contains_signer {
        first -= SIGNER_SIZE;
    }
    shares_needed(
        sequence_len as usize,
        first,
        CONTINUATION_SPARSE_SHARE_CONTENT_SIZE,
    )
}

fn shares_needed(len: usize, first: usize, continuation: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if len <= first {
        return 1;
    }
    1 + (len - first).div_ceil(continuation)
}

/// A run of consecutive shares in one namespace that encodes one sequence end-to-end.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    pub namespace: Namespace,
    pub shares: Vec<Share>,
}

impl Sequence {
    /// Returns the sequence length declared by the first share.
    pub fn sequence_len(&self) -> u32 {
        self.shares.first().map(Share::sequence_len).unwrap_or(0)
    }

    /// Returns true if the sequence is a single padding share.
    pub fn is_padding(&self) -> bool {
        matches!(self.shares.as_slice(), [share] if share.is_padding())
    }

    /// Returns the concatenated payload of every share (header bytes excluded).
    pub fn raw_data(&self) -> Vec<u8> {
        self.shares
            .iter()
            .flat_map(|share| share.raw_data().iter().copied())
            .collect()
    }

    /// Returns the number of shares a sequence of the declared length must occupy.
    pub(crate) fn expected_shares(&self) -> Result<usize, Error> {
        let Some(first) = self.shares.first() else {
            return Ok(0);
        };
        let len = first.sequence_len();
        if first.is_compact() {
            return Ok(compact_shares_needed(len));
        }
        let version = ShareVersion::try_from(first.version())?;
        Ok(sparse_shares_needed(len, version.requires_signer()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn share_with(namespace: Namespace, info: InfoByte, rest: &[u8]) -> Share {
        let mut data = Vec::with_capacity(SHARE_SIZE);
        data.extend_from_slice(namespace.as_bytes());
        data.push(info.as_u8());
        data.extend_from_slice(rest);
        data.resize(SHARE_SIZE, 0);
        Share::from_bytes(data).unwrap()
    }

    #[test]
    fn test_from_bytes_invalid() {
        assert_eq!(
            Share::from_bytes(vec![0u8; SHARE_SIZE - 1]),
            Err(Error::InvalidShareSize(SHARE_SIZE - 1))
        );
        let mut data = vec![0u8; SHARE_SIZE];
        data[0] = 7;
        assert_eq!(
            Share::from_bytes(data),
            Err(Error::UnsupportedNamespaceVersion(7))
        );
    }

    #[test]
    fn test_sparse_accessors() {
        let ns = Namespace::new_v0(b"sparse").unwrap();
        let mut rest = 1000u32.to_be_bytes().to_vec();
        rest.extend_from_slice(&[0xAA; SIGNER_SIZE]);
        rest.extend_from_slice(b"payload");
        let share = share_with(ns, InfoByte::new(1, true).unwrap(), &rest);

        assert_eq!(share.namespace(), ns);
        assert_eq!(share.version(), 1);
        assert!(share.is_sequence_start());
        assert!(!share.is_compact());
        assert!(!share.is_padding());
        assert_eq!(share.sequence_len(), 1000);
        assert_eq!(share.signer(), Some(&[0xAA; SIGNER_SIZE][..]));
        assert_eq!(&share.raw_data()[..7], b"payload");
        assert_eq!(
            share.raw_data().len(),
            FIRST_SPARSE_SHARE_CONTENT_SIZE - SIGNER_SIZE
        );
        assert_eq!(share.reserved_offset(), Err(Error::NotCompactShare));
    }

    #[test]
    fn test_continuation_accessors() {
        let ns = Namespace::new_v0(b"sparse").unwrap();
        let share = share_with(ns, InfoByte::new(1, false).unwrap(), b"more");
        assert_eq!(share.sequence_len(), 0);
        assert_eq!(share.signer(), None);
        assert!(!share.is_padding());
        assert_eq!(share.raw_data().len(), CONTINUATION_SPARSE_SHARE_CONTENT_SIZE);
    }

    #[test]
    fn test_compact_reserved() {
        let info = InfoByte::new(0, true).unwrap();
        let mut rest = 10u32.to_be_bytes().to_vec();
        rest.extend_from_slice(&38u32.to_be_bytes());
        rest.extend_from_slice(&[1, 2]);
        let share = share_with(Namespace::TX, info, &rest);

        assert!(share.is_compact());
        assert_eq!(share.reserved_offset().unwrap(), 38);
        assert_eq!(share.raw_data().len(), FIRST_COMPACT_SHARE_CONTENT_SIZE);
        assert_eq!(&share.raw_data_using_reserved().unwrap()[..2], &[1, 2]);

        // A zero offset means no unit begins in the share
        let mut rest = 10u32.to_be_bytes().to_vec();
        rest.extend_from_slice(&0u32.to_be_bytes());
        let share = share_with(Namespace::TX, info, &rest);
        assert!(share.raw_data_using_reserved().unwrap().is_empty());

        // Offsets pointing into the header (or past the share) are rejected
        for offset in [3u32, SHARE_SIZE as u32] {
            let mut rest = 10u32.to_be_bytes().to_vec();
            rest.extend_from_slice(&offset.to_be_bytes());
            let share = share_with(Namespace::TX, info, &rest);
            assert_eq!(
                share.raw_data_using_reserved(),
                Err(Error::InvalidReservedOffset(offset))
            );
        }
    }

    #[test]
    fn test_padding_predicates() {
        let ns = Namespace::new_v0(b"pad").unwrap();
        let padding = share_with(ns, InfoByte::new(0, true).unwrap(), &[]);
        assert!(padding.is_padding());

        let tail = share_with(Namespace::TAIL_PADDING, InfoByte::new(0, false).unwrap(), &[]);
        assert!(tail.is_padding());

        let reserved = share_with(
            Namespace::PRIMARY_RESERVED_PADDING,
            InfoByte::new(0, false).unwrap(),
            &[],
        );
        assert!(reserved.is_padding());
    }

    #[test_case(0, 0)]
    #[test_case(1, 1)]
    #[test_case(FIRST_COMPACT_SHARE_CONTENT_SIZE as u32, 1)]
    #[test_case(FIRST_COMPACT_SHARE_CONTENT_SIZE as u32 + 1, 2)]
    #[test_case((FIRST_COMPACT_SHARE_CONTENT_SIZE + CONTINUATION_COMPACT_SHARE_CONTENT_SIZE) as u32, 2)]
    #[test_case((FIRST_COMPACT_SHARE_CONTENT_SIZE + CONTINUATION_COMPACT_SHARE_CONTENT_SIZE) as u32 + 1, 3)]
    fn test_compact_shares_needed(len: u32, expected: usize) {
        assert_eq!(compact_shares_needed(len), expected);
    }

    #[test_case(0, false, 0)]
    #[test_case(1, false, 1)]
    #[test_case(FIRST_SPARSE_SHARE_CONTENT_SIZE as u32, false, 1)]
    #[test_case(FIRST_SPARSE_SHARE_CONTENT_SIZE as u32, true, 2)]
    #[test_case((FIRST_SPARSE_SHARE_CONTENT_SIZE - SIGNER_SIZE) as u32, true, 1)]
    #[test_case((FIRST_SPARSE_SHARE_CONTENT_SIZE + CONTINUATION_SPARSE_SHARE_CONTENT_SIZE) as u32, false, 2)]
    #[test_case((FIRST_SPARSE_SHARE_CONTENT_SIZE + 10 * CONTINUATION_SPARSE_SHARE_CONTENT_SIZE) as u32 + 1, false, 12)]
    fn test_sparse_shares_needed(len: u32, signer: bool, expected: usize) {
        assert_eq!(sparse_shares_needed(len, signer), expected);
    }
}
