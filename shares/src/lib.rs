//! Split transactions and blobs into fixed-size shares, and parse them back.
//!
//! # Overview
//!
//! Every share is exactly [SHARE_SIZE] bytes. The first bytes of a share identify the
//! [Namespace] it belongs to, followed by an [InfoByte] carrying the share version and
//! whether the share starts a new sequence. The rest of the layout depends on the namespace:
//!
//! ```text
//! +-----------+------+--------------+----------+--------+-------------------+
//! | namespace | info | sequence len | reserved | signer |      payload      |
//! +-----------+------+--------------+----------+--------+-------------------+
//!      29        1     4 (start)     4 (compact) 20 (v1/v2 start)  remainder
//! ```
//!
//! _All integers are big-endian. Short payloads are zero-padded._
//!
//! # Compact Shares
//!
//! Transactions and pay-for-blob transactions are packed back-to-back into "compact" shares by
//! the [CompactShareSplitter]. Each unit is prefixed with a varint length delimiter. Because
//! units cross share boundaries, every compact share carries a reserved offset pointing at the
//! first unit that begins inside it (or zero when none does). This lets a reader parse a range
//! of shares cut out of the middle of a sequence without replaying everything before it.
//!
//! # Sparse Shares
//!
//! Blobs are written into "sparse" shares by the [SparseShareSplitter]: exactly one sequence
//! per blob, with only the final share padded. Versioned blobs carry their signer in the first
//! share.
//!
//! # Parsing
//!
//! [parse_compact_shares], [parse_sparse_shares], and [parse_shares] reverse the splitters.
//! Shares are untrusted input: every malformed or inconsistent layout is reported as an
//! [Error] rather than a panic.

mod blob;
mod builder;
mod compact;
pub mod constants;
mod info;
mod namespace;
mod padding;
mod parse;
mod range;
mod share;
mod sparse;

pub use blob::{sort_blobs, Blob};
pub use builder::ShareBuilder;
pub use compact::{split_txs, tx_hash, CompactShareCounter, CompactShareSplitter, TxHash};
pub use constants::*;
pub use info::{InfoByte, ShareVersion, SUPPORTED_SHARE_VERSIONS};
pub use namespace::Namespace;
pub use padding::{
    namespace_padding_share, namespace_padding_shares, reserved_padding_shares,
    tail_padding_shares,
};
pub use parse::{parse_blobs, parse_compact_shares, parse_shares, parse_sparse_shares, parse_txs};
pub use range::{share_range_for_namespace, Range};
pub use share::{compact_shares_needed, sparse_shares_needed, Sequence, Share};
pub use sparse::{split_blobs, SparseShareSplitter};

use thiserror::Error;

/// Errors that can occur when building or parsing shares.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid namespace size: {0}")]
    InvalidNamespaceSize(usize),
    #[error("unsupported namespace version: {0}")]
    UnsupportedNamespaceVersion(u8),
    #[error("version zero namespace id must start with 18 zero bytes")]
    InvalidNamespacePrefix,
    #[error("namespace {0} is reserved")]
    ReservedNamespace(Namespace),
    #[error("invalid share size: {0}")]
    InvalidShareSize(usize),
    #[error("unsupported share version: {0}")]
    UnsupportedShareVersion(u8),
    #[error("share version {version} requires a signer of {expected} bytes, got {actual}")]
    InvalidSignerSize {
        version: u8,
        expected: usize,
        actual: usize,
    },
    #[error("share version {0} does not support a signer")]
    UnexpectedSigner(u8),
    #[error("blob data can not be empty")]
    EmptyBlobData,
    #[error("transaction can not be empty")]
    EmptyTx,
    #[error("share version {version} requires {expected} bytes of data, got {actual}")]
    InvalidBlobDataSize {
        version: u8,
        expected: usize,
        actual: usize,
    },
    #[error("not the first share of a sequence")]
    NotFirstShare,
    #[error("not a compact share")]
    NotCompactShare,
    #[error("share builder is too short: {0} bytes")]
    BuilderTooShort(usize),
    #[error("sequence too long: {0} bytes")]
    SequenceTooLong(usize),
    #[error("cannot write namespace padding shares before any share")]
    MissingShares,
    #[error("invalid reserved offset: {0}")]
    InvalidReservedOffset(u32),
    #[error("invalid length delimiter")]
    InvalidDelimiter,
    #[error("continuation share {index} has namespace {found}, expected {expected}")]
    ContinuationNamespaceMismatch {
        index: usize,
        expected: Namespace,
        found: Namespace,
    },
    #[error("continuation share {0} without a sequence start")]
    OrphanContinuation(usize),
    #[error("declared sequence length {declared} exceeds {available} available bytes")]
    SequenceLengthExceedsData { declared: u32, available: usize },
    #[error("sequence starting at share {index} has {actual} shares but needs {expected}")]
    InvalidSequenceLength {
        index: usize,
        actual: usize,
        expected: usize,
    },
    #[error("share {index} is not in namespace {expected}")]
    UnexpectedNamespace { index: usize, expected: Namespace },
}
