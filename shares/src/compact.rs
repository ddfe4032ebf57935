use crate::{
    Error, Namespace, Range, Share, ShareBuilder, ShareVersion,
    CONTINUATION_COMPACT_SHARE_CONTENT_SIZE, FIRST_COMPACT_SHARE_CONTENT_SIZE,
};
use prost::{encode_length_delimiter, length_delimiter_len};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::trace;

/// The SHA-256 digest of a transaction.
pub type TxHash = [u8; 32];

/// Returns the hash used to key the share range of `tx`.
pub fn tx_hash(tx: &[u8]) -> TxHash {
    Sha256::digest(tx).into()
}

/// Packs length-delimited transactions back-to-back into compact shares.
#[derive(Clone, Debug)]
pub struct CompactShareSplitter {
    namespace: Namespace,
    shares: Vec<Share>,
    pending: ShareBuilder,
    ranges: Vec<(TxHash, Range)>,
}

impl CompactShareSplitter {
    /// Create a splitter for `namespace`, which must use the compact layout.
    pub fn new(namespace: Namespace) -> Result<Self, Error> {
        if !namespace.is_compact() {
            return Err(Error::NotCompactShare);
        }
        Ok(Self {
            namespace,
            shares: Vec::new(),
            pending: ShareBuilder::new(namespace, ShareVersion::Zero, true)?,
            ranges: Vec::new(),
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Append a transaction, prefixed by its varint length.
    ///
    /// Empty transactions are rejected: a zero delimiter marks the end of the data.
    pub fn write_tx(&mut self, tx: &[u8]) -> Result<(), Error> {
        if tx.is_empty() {
            return Err(Error::EmptyTx);
        }
        let mut unit = Vec::with_capacity(length_delimiter_len(tx.len()) + tx.len());
        encode_length_delimiter(tx.len(), &mut unit)
            .map_err(|_| Error::SequenceTooLong(tx.len()))?;
        unit.extend_from_slice(tx);

        let start = self.shares.len();
        self.pending.maybe_write_reserved_bytes()?;
        let mut remaining = unit.as_slice();
        while let Some(leftover) = self.pending.add_data(remaining) {
            self.stack_pending()?;
            remaining = leftover;
        }
        if self.pending.available_bytes() == 0 {
            self.stack_pending()?;
        }

        let range = Range::new(start, self.count());
        trace!(namespace = %self.namespace, len = tx.len(), ?range, "wrote tx");
        self.ranges.push((tx_hash(tx), range));
        Ok(())
    }

    fn stack_pending(&mut self) -> Result<(), Error> {
        let next = ShareBuilder::new(self.namespace, ShareVersion::Zero, false)?;
        let full = std::mem::replace(&mut self.pending, next);
        self.shares.push(full.build()?);
        Ok(())
    }

    /// Returns true if no transaction has been written.
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty() && self.pending.is_empty_share()
    }

    /// Returns the number of shares [CompactShareSplitter::export] would return.
    pub fn count(&self) -> usize {
        if self.pending.is_empty_share() {
            self.shares.len()
        } else {
            self.shares.len() + 1
        }
    }

    /// Returns the shares written so far, with the last share padded and the sequence length
    /// of the first share filled in.
    ///
    /// The splitter is left untouched, so more transactions may be written afterwards.
    pub fn export(&self) -> Result<Vec<Share>, Error> {
        let mut shares = self.shares.clone();
        let mut padding = 0;
        if !self.pending.is_empty_share() {
            let mut pending = self.pending.clone();
            padding = pending.zero_pad_if_necessary();
            shares.push(pending.build()?);
        }
        let Some(first) = shares.first() else {
            return Ok(shares);
        };

        let len = sequence_len(shares.len(), padding)?;
        let mut builder = ShareBuilder::from_share(first)?;
        builder.write_sequence_len(len)?;
        shares[0] = builder.build()?;
        Ok(shares)
    }

    /// Returns the share range of every transaction written, keyed by hash and shifted by
    /// `offset`.
    ///
    /// If the same transaction was written more than once, the last range wins.
    pub fn share_ranges(&self, offset: usize) -> HashMap<TxHash, Range> {
        self.ranges
            .iter()
            .map(|(hash, range)| (*hash, range.shift(offset)))
            .collect()
    }

    /// Returns the share range of every transaction written, in write order, shifted by
    /// `offset`.
    pub fn ordered_share_ranges(&self, offset: usize) -> Vec<Range> {
        self.ranges
            .iter()
            .map(|(_, range)| range.shift(offset))
            .collect()
    }
}

fn sequence_len(shares: usize, padding: usize) -> Result<u32, Error> {
    let len = FIRST_COMPACT_SHARE_CONTENT_SIZE
        + (shares - 1) * CONTINUATION_COMPACT_SHARE_CONTENT_SIZE
        - padding;
    u32::try_from(len).map_err(|_| Error::SequenceTooLong(len))
}

/// Split transactions into compact shares in `namespace`.
pub fn split_txs<T: AsRef<[u8]>>(namespace: Namespace, txs: &[T]) -> Result<Vec<Share>, Error> {
    let mut splitter = CompactShareSplitter::new(namespace)?;
    for tx in txs {
        splitter.write_tx(tx.as_ref())?;
    }
    splitter.export()
}

/// Tracks the number of compact shares a series of transactions would occupy, without writing
/// any of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompactShareCounter {
    shares: usize,
    remainder: usize,
    last_shares: usize,
    last_remainder: usize,
}

impl CompactShareCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a transaction of `len` bytes, returning the number of shares it added.
    pub fn add(&mut self, len: usize) -> usize {
        let mut len = len + length_delimiter_len(len);

        self.last_shares = self.shares;
        self.last_remainder = self.remainder;

        // Fits in the space left in the last share
        if len <= self.remainder {
            self.remainder -= len;
            return 0;
        }
        len -= self.remainder;

        if self.shares == 0 {
            self.shares += 1;
            if len <= FIRST_COMPACT_SHARE_CONTENT_SIZE {
                self.remainder = FIRST_COMPACT_SHARE_CONTENT_SIZE - len;
                return self.shares - self.last_shares;
            }
            len -= FIRST_COMPACT_SHARE_CONTENT_SIZE;
        }

        self.shares += len.div_ceil(CONTINUATION_COMPACT_SHARE_CONTENT_SIZE);
        self.remainder = (CONTINUATION_COMPACT_SHARE_CONTENT_SIZE
            - len % CONTINUATION_COMPACT_SHARE_CONTENT_SIZE)
            % CONTINUATION_COMPACT_SHARE_CONTENT_SIZE;
        self.shares - self.last_shares
    }

    /// Undo the last [CompactShareCounter::add].
    ///
    /// Only one step of history is kept.
    pub fn revert(&mut self) {
        self.shares = self.last_shares;
        self.remainder = self.last_remainder;
    }

    /// Returns the number of shares used.
    pub fn size(&self) -> usize {
        self.shares
    }

    /// Returns the number of bytes left in the last share.
    pub fn remainder(&self) -> usize {
        self.remainder
    }
}
