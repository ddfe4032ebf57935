use crate::{inclusion::blob_min_square_size, BlobTx, Builder, Config, Error, IndexWrapper};
use bytes::Bytes;
use dasquare_shares::{
    parse_compact_shares, parse_sparse_shares, parse_txs, share_range_for_namespace,
    sparse_shares_needed, tail_padding_shares, Namespace, Share,
};
use tracing::debug;

/// A square of shares in row-major order.
///
/// The number of shares is always the square of a power of two.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Square(Vec<Share>);

impl Square {
    /// The smallest square: a single tail padding share.
    pub fn empty() -> Self {
        Self(tail_padding_shares(1))
    }

    /// Wrap `shares`, which must form a square with a power of two width.
    pub fn from_shares(shares: Vec<Share>) -> Result<Self, Error> {
        let len = shares.len();
        let size = blob_min_square_size(len);
        if len == 0 || size * size != len {
            return Err(Error::InvalidSquareLength(len));
        }
        Ok(Self(shares))
    }

    /// Build the square containing every transaction in `txs`, in order.
    ///
    /// All ordinary transactions must precede all blob transactions, and everything must fit
    /// within `cfg`.
    pub fn construct<T: AsRef<[u8]>>(txs: &[T], cfg: Config) -> Result<Self, Error> {
        let mut builder = Builder::with_txs(cfg, txs)?;
        let (square, _) = builder.export()?;
        Ok(square)
    }

    /// Returns the width of the square.
    pub fn size(&self) -> usize {
        blob_min_square_size(self.0.len())
    }

    pub fn shares(&self) -> &[Share] {
        &self.0
    }

    pub fn into_shares(self) -> Vec<Share> {
        self.0
    }

    /// Returns true if the square contains no transactions.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|share| share.namespace().is_tail_padding())
    }

    fn reserved_shares(
        &self,
        namespace: Namespace,
        expected_start: usize,
    ) -> Result<&[Share], Error> {
        let range = share_range_for_namespace(&self.0, namespace);
        if range.is_empty() {
            return Ok(&[]);
        }
        if range.start != expected_start {
            return Err(Error::UnexpectedShareRange {
                namespace,
                expected: expected_start,
                found: range.start,
            });
        }
        Ok(&self.0[range.as_std()])
    }

    fn tx_shares(&self) -> Result<&[Share], Error> {
        self.reserved_shares(Namespace::TX, 0)
    }

    fn pfb_shares(&self) -> Result<&[Share], Error> {
        let after_txs = self.tx_shares()?.len();
        self.reserved_shares(Namespace::PAY_FOR_BLOB, after_txs)
    }

    /// Returns the index wrappers of every blob transaction in the square.
    pub fn wrapped_pfbs(&self) -> Result<Vec<IndexWrapper>, Error> {
        parse_compact_shares(self.pfb_shares()?)?
            .iter()
            .enumerate()
            .map(|(i, raw)| IndexWrapper::unmarshal(raw)?.ok_or(Error::ExpectedIndexWrapper(i)))
            .collect()
    }

    /// Recover the transactions the square was constructed from.
    ///
    /// Ordinary transactions are returned as written. Every blob transaction is re-assembled
    /// from its index wrapper and the blobs found at the recorded indexes.
    pub fn deconstruct(&self) -> Result<Vec<Bytes>, Error> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let mut txs = parse_txs(self.tx_shares()?)?;

        let wrappers = self.wrapped_pfbs()?;
        txs.reserve(wrappers.len());
        for wrapper in wrappers {
            let mut blobs = Vec::with_capacity(wrapper.share_indexes.len());
            for index in &wrapper.share_indexes {
                let index = *index as usize;
                let first = self.0.get(index).ok_or(Error::IndexOutOfBounds(index))?;
                let len = sparse_shares_needed(first.sequence_len(), first.signer().is_some());
                let end = index
                    .checked_add(len)
                    .filter(|end| *end <= self.0.len())
                    .ok_or(Error::IndexOutOfBounds(index))?;
                let mut parsed = parse_sparse_shares(&self.0[index..end])?;
                if parsed.len() != 1 {
                    return Err(Error::UnexpectedBlobCount {
                        index,
                        found: parsed.len(),
                    });
                }
                blobs.extend(parsed.pop());
            }
            txs.push(BlobTx::new(wrapper.tx, blobs)?.marshal());
        }
        debug!(size = self.size(), txs = txs.len(), "deconstructed square");
        Ok(txs)
    }
}
