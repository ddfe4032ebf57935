use crate::{
    share::{INFO_BYTE_INDEX, SEQUENCE_LEN_INDEX},
    Error, InfoByte, Namespace, Share, ShareVersion, NAMESPACE_SIZE, SEQUENCE_LEN_BYTES,
    SHARE_INFO_BYTES, SHARE_RESERVED_BYTES, SHARE_SIZE,
};

/// The header layout of a share, fixed when the builder is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// Transactions and pay-for-blob transactions: a reserved offset follows the sequence length.
    Compact,
    /// Blobs: no reserved offset.
    Sparse,
}

impl Layout {
    fn of(namespace: &Namespace) -> Self {
        if namespace.is_compact() {
            Self::Compact
        } else {
            Self::Sparse
        }
    }
}

/// Incrementally writes the bytes of a single share.
#[derive(Clone, Debug)]
pub struct ShareBuilder {
    namespace: Namespace,
    version: ShareVersion,
    is_first_share: bool,
    layout: Layout,
    data: Vec<u8>,
}

impl ShareBuilder {
    /// Create a builder with the header of a share already written.
    ///
    /// The sequence length (for first shares) and the reserved offset (for compact shares) are
    /// written as zero placeholders. Compact shares only support [ShareVersion::Zero].
    pub fn new(
        namespace: Namespace,
        version: ShareVersion,
        is_first_share: bool,
    ) -> Result<Self, Error> {
        let layout = Layout::of(&namespace);
        if layout == Layout::Compact && version != ShareVersion::Zero {
            return Err(Error::UnsupportedShareVersion(version.as_u8()));
        }

        let mut data = Vec::with_capacity(SHARE_SIZE);
        data.extend_from_slice(namespace.as_bytes());
        data.push(InfoByte::from_version(version, is_first_share).as_u8());
        if is_first_share {
            data.extend_from_slice(&[0u8; SEQUENCE_LEN_BYTES]);
        }
        if layout == Layout::Compact {
            data.extend_from_slice(&[0u8; SHARE_RESERVED_BYTES]);
        }
        Ok(Self {
            namespace,
            version,
            is_first_share,
            layout,
            data,
        })
    }

    /// Create a builder over the bytes of an existing share (to rewrite its header).
    pub fn from_share(share: &Share) -> Result<Self, Error> {
        let namespace = share.namespace();
        let version = ShareVersion::try_from(share.version())?;
        Ok(Self {
            namespace,
            version,
            is_first_share: share.is_sequence_start(),
            layout: Layout::of(&namespace),
            data: share.as_bytes().to_vec(),
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn version(&self) -> ShareVersion {
        self.version
    }

    pub fn is_first_share(&self) -> bool {
        self.is_first_share
    }

    /// Returns the number of bytes that can still be written.
    pub fn available_bytes(&self) -> usize {
        SHARE_SIZE - self.data.len()
    }

    /// Append as much of `data` as fits, returning whatever did not.
    pub fn add_data<'a>(&mut self, data: &'a [u8]) -> Option<&'a [u8]> {
        let available = self.available_bytes();
        if data.len() <= available {
            self.data.extend_from_slice(data);
            return None;
        }
        let (chunk, leftover) = data.split_at(available);
        self.data.extend_from_slice(chunk);
        Some(leftover)
    }

    fn header_len(&self) -> usize {
        let mut len = NAMESPACE_SIZE + SHARE_INFO_BYTES;
        if self.is_first_share {
            len += SEQUENCE_LEN_BYTES;
        }
        if self.layout == Layout::Compact {
            len += SHARE_RESERVED_BYTES;
        }
        len
    }

    /// Returns true if nothing but the header has been written.
    pub fn is_empty_share(&self) -> bool {
        self.data.len() == self.header_len()
    }

    /// Fill the remainder of the share with zeros, returning the number of bytes added.
    pub fn zero_pad_if_necessary(&mut self) -> usize {
        let padding = self.available_bytes();
        self.data.resize(SHARE_SIZE, 0);
        padding
    }

    fn reserved_index(&self) -> usize {
        if self.is_first_share {
            SEQUENCE_LEN_INDEX + SEQUENCE_LEN_BYTES
        } else {
            SEQUENCE_LEN_INDEX
        }
    }

    /// Record the current write position as the offset of the first unit that begins in this
    /// share, unless an offset was already recorded.
    pub fn maybe_write_reserved_bytes(&mut self) -> Result<(), Error> {
        if self.layout != Layout::Compact {
            return Err(Error::NotCompactShare);
        }
        let index = self.reserved_index();
        let end = index + SHARE_RESERVED_BYTES;
        if self.data.len() < end {
            return Err(Error::BuilderTooShort(self.data.len()));
        }
        if self.data[index..end].iter().any(|byte| *byte != 0) {
            return Ok(());
        }

        // A share never exceeds SHARE_SIZE bytes, so the offset always fits
        let offset = self.data.len() as u32;
        self.data[index..end].copy_from_slice(&offset.to_be_bytes());
        Ok(())
    }

    /// Overwrite the sequence length placeholder of a first share.
    pub fn write_sequence_len(&mut self, len: u32) -> Result<(), Error> {
        if !self.is_first_share {
            return Err(Error::NotFirstShare);
        }
        let end = SEQUENCE_LEN_INDEX + SEQUENCE_LEN_BYTES;
        if self.data.len() < end {
            return Err(Error::BuilderTooShort(self.data.len()));
        }
        self.data[SEQUENCE_LEN_INDEX..end].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    /// Append the signer, if this is a first share of a version that carries one.
    ///
    /// The sequence length must already be in place.
    pub fn write_signer(&mut self, signer: &[u8]) {
        if !self.is_first_share || !self.version.requires_signer() {
            return;
        }
        self.data.extend_from_slice(signer);
    }

    /// Toggle the sequence start bit of the info byte.
    pub fn flip_sequence_start(&mut self) {
        self.data[INFO_BYTE_INDEX] ^= 0x01;
    }

    /// Finish the share. Fails unless exactly [SHARE_SIZE] bytes were written.
    pub fn build(self) -> Result<Share, Error> {
        Share::from_bytes(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CONTINUATION_COMPACT_SHARE_CONTENT_SIZE, CONTINUATION_SPARSE_SHARE_CONTENT_SIZE,
        FIRST_COMPACT_SHARE_CONTENT_SIZE, FIRST_SPARSE_SHARE_CONTENT_SIZE, SIGNER_SIZE,
    };

    fn user_namespace() -> Namespace {
        Namespace::new_v0(b"builder").unwrap()
    }

    #[test]
    fn test_header_sizes() {
        let cases = [
            (Namespace::TX, true, FIRST_COMPACT_SHARE_CONTENT_SIZE),
            (Namespace::TX, false, CONTINUATION_COMPACT_SHARE_CONTENT_SIZE),
            (user_namespace(), true, FIRST_SPARSE_SHARE_CONTENT_SIZE),
            (user_namespace(), false, CONTINUATION_SPARSE_SHARE_CONTENT_SIZE),
        ];
        for (namespace, first, available) in cases {
            let builder = ShareBuilder::new(namespace, ShareVersion::Zero, first).unwrap();
            assert_eq!(builder.available_bytes(), available);
            assert!(builder.is_empty_share());
        }
    }

    #[test]
    fn test_compact_rejects_versions() {
        assert_eq!(
            ShareBuilder::new(Namespace::PAY_FOR_BLOB, ShareVersion::One, true).unwrap_err(),
            Error::UnsupportedShareVersion(1)
        );
    }

    #[test]
    fn test_add_data() {
        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::Zero, false).unwrap();
        assert_eq!(builder.add_data(&[1; 100]), None);
        assert!(!builder.is_empty_share());

        let data = vec![2u8; CONTINUATION_SPARSE_SHARE_CONTENT_SIZE];
        let leftover = builder.add_data(&data).unwrap();
        assert_eq!(leftover.len(), 100);
        assert_eq!(builder.available_bytes(), 0);
        assert_eq!(builder.add_data(&[3]), Some(&[3u8][..]));

        let share = builder.build().unwrap();
        assert_eq!(&share.raw_data()[..100], &[1; 100]);
    }

    #[test]
    fn test_build_requires_full_share() {
        let builder = ShareBuilder::new(user_namespace(), ShareVersion::Zero, true).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            Error::InvalidShareSize(SHARE_SIZE - FIRST_SPARSE_SHARE_CONTENT_SIZE)
        );
    }

    #[test]
    fn test_write_sequence_len() {
        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::Zero, true).unwrap();
        builder.write_sequence_len(1234).unwrap();
        builder.zero_pad_if_necessary();
        let share = builder.build().unwrap();
        assert_eq!(share.sequence_len(), 1234);

        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::Zero, false).unwrap();
        assert_eq!(builder.write_sequence_len(1), Err(Error::NotFirstShare));
    }

    #[test]
    fn test_write_signer() {
        let signer = [9u8; SIGNER_SIZE];

        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::One, true).unwrap();
        builder.write_sequence_len(3).unwrap();
        builder.write_signer(&signer);
        builder.add_data(&[1, 2, 3]);
        builder.zero_pad_if_necessary();
        let share = builder.build().unwrap();
        assert_eq!(share.signer(), Some(&signer[..]));
        assert_eq!(&share.raw_data()[..3], &[1, 2, 3]);

        // Ignored on continuation shares and on version zero
        for (version, first) in [(ShareVersion::One, false), (ShareVersion::Zero, true)] {
            let mut builder = ShareBuilder::new(user_namespace(), version, first).unwrap();
            let before = builder.available_bytes();
            builder.write_signer(&signer);
            assert_eq!(builder.available_bytes(), before);
        }
    }

    #[test]
    fn test_maybe_write_reserved_bytes() {
        let mut builder = ShareBuilder::new(Namespace::TX, ShareVersion::Zero, false).unwrap();
        builder.add_data(&[7; 10]);
        builder.maybe_write_reserved_bytes().unwrap();
        builder.add_data(&[8; 10]);

        // Only the first write is recorded
        builder.maybe_write_reserved_bytes().unwrap();
        builder.zero_pad_if_necessary();
        let share = builder.build().unwrap();
        let expected = (NAMESPACE_SIZE + SHARE_INFO_BYTES + SHARE_RESERVED_BYTES + 10) as u32;
        assert_eq!(share.reserved_offset().unwrap(), expected);
        assert_eq!(share.raw_data_using_reserved().unwrap()[0], 8);

        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::Zero, true).unwrap();
        assert_eq!(
            builder.maybe_write_reserved_bytes(),
            Err(Error::NotCompactShare)
        );
    }

    #[test]
    fn test_flip_sequence_start() {
        let mut builder = ShareBuilder::new(user_namespace(), ShareVersion::One, false).unwrap();
        builder.flip_sequence_start();
        builder.zero_pad_if_necessary();
        let share = builder.build().unwrap();
        assert!(share.is_sequence_start());
        assert_eq!(share.version(), 1);
    }

    #[test]
    fn test_from_share() {
        let mut builder = ShareBuilder::new(Namespace::TX, ShareVersion::Zero, true).unwrap();
        builder.maybe_write_reserved_bytes().unwrap();
        builder.add_data(&[1, 2, 3]);
        builder.zero_pad_if_necessary();
        let share = builder.build().unwrap();

        let mut builder = ShareBuilder::from_share(&share).unwrap();
        assert!(builder.is_first_share());
        assert_eq!(builder.namespace(), Namespace::TX);
        builder.write_sequence_len(3).unwrap();
        let rewritten = builder.build().unwrap();
        assert_eq!(rewritten.sequence_len(), 3);
        assert_eq!(rewritten.raw_data(), share.raw_data());
    }
}
