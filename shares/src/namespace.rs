//! Fixed-width, totally ordered identifiers for share content.
//!
//! A namespace is a version byte followed by a [NAMESPACE_ID_SIZE]-byte id. Namespaces are
//! ordered by comparing those [NAMESPACE_SIZE] bytes lexicographically, which is the order
//! shares must appear in within a square.
//!
//! Two versions are supported:
//! - Version `0`: user namespaces. The id must start with
//!   [NAMESPACE_VERSION_ZERO_PREFIX_SIZE] zero bytes. The lowest of these are the primary
//!   reserved namespaces (everything up to [Namespace::MAX_PRIMARY_RESERVED]).
//! - Version `255`: secondary reserved namespaces, used for padding and parity shares.

use crate::{
    Error, NAMESPACE_ID_SIZE, NAMESPACE_SIZE, NAMESPACE_VERSION_MAX, NAMESPACE_VERSION_ZERO,
    NAMESPACE_VERSION_ZERO_ID_SIZE, NAMESPACE_VERSION_ZERO_PREFIX_SIZE,
};
use std::{
    fmt::{Debug, Display},
    ops::Deref,
};

/// A namespace (version byte followed by id bytes).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Namespace([u8; NAMESPACE_SIZE]);

impl Namespace {
    /// Namespace of ordinary transactions.
    pub const TX: Self = Self::primary_reserved(0x01);

    /// Namespace of intermediate state roots.
    pub const INTERMEDIATE_STATE_ROOTS: Self = Self::primary_reserved(0x02);

    /// Namespace of pay-for-blob transactions (wrapped with the indexes of their blobs).
    pub const PAY_FOR_BLOB: Self = Self::primary_reserved(0x04);

    /// Namespace of the padding between the reserved shares and the first blob.
    pub const PRIMARY_RESERVED_PADDING: Self = Self::primary_reserved(0xFF);

    /// The largest primary reserved namespace.
    pub const MAX_PRIMARY_RESERVED: Self = Self::primary_reserved(0xFF);

    /// The smallest secondary reserved namespace.
    pub const MIN_SECONDARY_RESERVED: Self = Self::secondary_reserved(0x00);

    /// Namespace of the padding after the last blob of a square.
    pub const TAIL_PADDING: Self = Self::secondary_reserved(0xFE);

    /// Namespace of the parity shares of an extended square.
    pub const PARITY_SHARES: Self = Self::secondary_reserved(0xFF);

    const fn primary_reserved(last: u8) -> Self {
        let mut bytes = [0u8; NAMESPACE_SIZE];
        bytes[NAMESPACE_SIZE - 1] = last;
        Self(bytes)
    }

    const fn secondary_reserved(last: u8) -> Self {
        let mut bytes = [0xFFu8; NAMESPACE_SIZE];
        bytes[NAMESPACE_SIZE - 1] = last;
        Self(bytes)
    }

    /// Create a namespace from a version and a full-width id.
    pub fn new(version: u8, id: &[u8]) -> Result<Self, Error> {
        if version != NAMESPACE_VERSION_ZERO && version != NAMESPACE_VERSION_MAX {
            return Err(Error::UnsupportedNamespaceVersion(version));
        }
        if id.len() != NAMESPACE_ID_SIZE {
            return Err(Error::InvalidNamespaceSize(id.len() + 1));
        }
        if version == NAMESPACE_VERSION_ZERO
            && id[..NAMESPACE_VERSION_ZERO_PREFIX_SIZE]
                .iter()
                .any(|byte| *byte != 0)
        {
            return Err(Error::InvalidNamespacePrefix);
        }

        let mut bytes = [0u8; NAMESPACE_SIZE];
        bytes[0] = version;
        bytes[1..].copy_from_slice(id);
        Ok(Self(bytes))
    }

    /// Create a version zero namespace from up to [NAMESPACE_VERSION_ZERO_ID_SIZE] bytes.
    ///
    /// Shorter ids are left-padded with zeros.
    pub fn new_v0(sub_id: &[u8]) -> Result<Self, Error> {
        if sub_id.len() > NAMESPACE_VERSION_ZERO_ID_SIZE {
            return Err(Error::InvalidNamespaceSize(
                NAMESPACE_SIZE - NAMESPACE_VERSION_ZERO_ID_SIZE + sub_id.len(),
            ));
        }
        let mut bytes = [0u8; NAMESPACE_SIZE];
        bytes[NAMESPACE_SIZE - sub_id.len()..].copy_from_slice(sub_id);
        Ok(Self(bytes))
    }

    /// Create a namespace from its [NAMESPACE_SIZE]-byte encoding.
    pub fn from_raw(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != NAMESPACE_SIZE {
            return Err(Error::InvalidNamespaceSize(bytes.len()));
        }
        Self::new(bytes[0], &bytes[1..])
    }

    /// Returns the encoded namespace.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the version of the namespace.
    pub fn version(&self) -> u8 {
        self.0[0]
    }

    /// Returns the id of the namespace.
    pub fn id(&self) -> &[u8] {
        &self.0[1..]
    }

    /// Returns true if the namespace is primary or secondary reserved.
    pub fn is_reserved(&self) -> bool {
        self.is_primary_reserved() || self.is_secondary_reserved()
    }

    pub fn is_primary_reserved(&self) -> bool {
        *self <= Self::MAX_PRIMARY_RESERVED
    }

    pub fn is_secondary_reserved(&self) -> bool {
        *self >= Self::MIN_SECONDARY_RESERVED
    }

    pub fn is_parity_shares(&self) -> bool {
        *self == Self::PARITY_SHARES
    }

    pub fn is_tail_padding(&self) -> bool {
        *self == Self::TAIL_PADDING
    }

    pub fn is_primary_reserved_padding(&self) -> bool {
        *self == Self::PRIMARY_RESERVED_PADDING
    }

    pub fn is_tx(&self) -> bool {
        *self == Self::TX
    }

    pub fn is_pay_for_blob(&self) -> bool {
        *self == Self::PAY_FOR_BLOB
    }

    /// Returns true if shares in this namespace use the compact layout.
    pub fn is_compact(&self) -> bool {
        self.is_tx() || self.is_pay_for_blob()
    }

    /// Returns true if a user blob may be published under this namespace.
    ///
    /// Only unreserved version zero namespaces qualify.
    pub fn is_usable_for_blob(&self) -> bool {
        self.version() == NAMESPACE_VERSION_ZERO && !self.is_reserved()
    }
}

impl TryFrom<&[u8]> for Namespace {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl AsRef<[u8]> for Namespace {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Namespace {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Namespace({self})")
    }
}
