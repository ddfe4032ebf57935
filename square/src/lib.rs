//! Pack transactions and blobs into a square of shares, and unpack them.
//!
//! # Overview
//!
//! A square is `size * size` shares (with `size` a power of two) laid out in namespace order:
//!
//! ```text
//! +-----+-----+-------------------+--------------------------------+--------------+
//! | txs | pfb | reserved padding  | blobs (by namespace, aligned)  | tail padding |
//! +-----+-----+-------------------+--------------------------------+--------------+
//! ```
//!
//! Ordinary transactions are written into compact shares in [Namespace::TX]. Transactions that
//! pay for blobs are wrapped in an [IndexWrapper] recording the index of the first share of each
//! of their blobs, and written into compact shares in [Namespace::PAY_FOR_BLOB]. Blobs follow,
//! sorted by namespace, each starting at an index aligned to its subtree width (see
//! [inclusion]), with namespace padding filling the gaps.
//!
//! # Building
//!
//! The [Builder] admits transactions in priority order. Admission is decided with share
//! counters (no shares are written) against the worst case padding each blob could require,
//! so a transaction is only accepted if the square is guaranteed to fit within
//! [Config::max_square_size]. [Builder::export] then fixes the square size and writes the
//! shares.
//!
//! [Square::deconstruct] reverses [Square::construct], recovering the original transactions
//! (with every blob transaction re-assembled from the shares its blobs occupy).
//!
//! [Namespace::TX]: dasquare_shares::Namespace::TX
//! [Namespace::PAY_FOR_BLOB]: dasquare_shares::Namespace::PAY_FOR_BLOB

mod builder;
pub mod inclusion;
mod square;
mod tx;

pub use builder::Builder;
pub use square::Square;
pub use tx::{BlobTx, IndexWrapper, BLOB_TX_TYPE_ID, INDEX_WRAPPER_TYPE_ID};

use thiserror::Error;

/// The smallest width of a square.
pub const MIN_SQUARE_SIZE: usize = 1;

/// The default largest width of a square.
pub const DEFAULT_MAX_SQUARE_SIZE: usize = 128;

/// The default number of shares a blob may span before its subtree width grows.
pub const DEFAULT_SUBTREE_ROOT_THRESHOLD: usize = 64;

/// Errors that can occur when building or deconstructing a square.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("shares error: {0}")]
    Shares(#[from] dasquare_shares::Error),
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid max square size: {0}")]
    InvalidMaxSquareSize(usize),
    #[error("invalid subtree root threshold: {0}")]
    InvalidSubtreeRootThreshold(usize),
    #[error("tx at index {0} can not be appended after a blob tx")]
    TxAfterBlobTx(usize),
    #[error("not enough space to append tx at index {0}")]
    NoSpace(usize),
    #[error("tx at index {0} is empty")]
    EmptyTx(usize),
    #[error("malformed blob tx at index {index}: {source}")]
    MalformedBlobTx {
        index: usize,
        #[source]
        source: Box<Error>,
    },
    #[error("blob tx must contain at least one blob")]
    EmptyBlobTx,
    #[error("index wrapper must record at least one share index")]
    EmptyIndexWrapper,
    #[error("unexpected envelope type id: {0}")]
    UnexpectedTypeId(String),
    #[error("version out of range: {0}")]
    VersionOutOfRange(u32),
    #[error("tx index {0} is not a blob tx")]
    NotBlobTx(usize),
    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(usize),
    #[error("invalid square length: {0}")]
    InvalidSquareLength(usize),
    #[error("{namespace} shares start at index {found}, expected {expected}")]
    UnexpectedShareRange {
        namespace: dasquare_shares::Namespace,
        expected: usize,
        found: usize,
    },
    #[error("pay-for-blob unit {0} is not an index wrapper")]
    ExpectedIndexWrapper(usize),
    #[error("expected one blob at share {index}, found {found}")]
    UnexpectedBlobCount { index: usize, found: usize },
}

/// Configuration for building a [Square].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The largest width of the square (a power of two).
    ///
    /// Transactions are rejected once admitting them could require more than
    /// `max_square_size * max_square_size` shares.
    pub max_square_size: usize,

    /// The number of shares a blob may span before its subtree width grows.
    ///
    /// Larger values pack blobs more tightly at the cost of larger inclusion proofs.
    pub subtree_root_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_square_size: DEFAULT_MAX_SQUARE_SIZE,
            subtree_root_threshold: DEFAULT_SUBTREE_ROOT_THRESHOLD,
        }
    }
}

impl Config {
    /// Returns an error if the configuration can not produce a valid square.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_square_size < MIN_SQUARE_SIZE || !self.max_square_size.is_power_of_two() {
            return Err(Error::InvalidMaxSquareSize(self.max_square_size));
        }
        if self.subtree_root_threshold == 0 {
            return Err(Error::InvalidSubtreeRootThreshold(
                self.subtree_root_threshold,
            ));
        }
        Ok(())
    }

    /// Returns the largest number of shares a square may contain.
    pub fn max_shares(&self) -> usize {
        self.max_square_size * self.max_square_size
    }
}
