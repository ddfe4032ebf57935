use crate::{
    inclusion::{blob_min_square_size, next_share_index, subtree_width},
    BlobTx, Config, Error, IndexWrapper, Square,
};
use bytes::Bytes;
use dasquare_shares::{
    reserved_padding_shares, tail_padding_shares, Blob, CompactShareCounter, CompactShareSplitter,
    Namespace, Range, Share, SparseShareSplitter,
};
use tracing::{debug, trace};

/// A blob admitted into the square, along with the worst case number of shares it may cost.
#[derive(Clone, Debug)]
struct Element {
    blob: Blob,
    pfb_index: usize,
    blob_index: usize,
    num_shares: usize,
    max_padding: usize,
}

impl Element {
    fn new(blob: Blob, pfb_index: usize, blob_index: usize, subtree_root_threshold: usize) -> Self {
        let num_shares = blob.shares_needed();
        Self {
            blob,
            pfb_index,
            blob_index,
            num_shares,
            // At most one share less than the subtree width can precede an aligned blob
            max_padding: subtree_width(num_shares, subtree_root_threshold) - 1,
        }
    }

    fn max_share_offset(&self) -> usize {
        self.num_shares + self.max_padding
    }
}

/// The result of [Builder::export].
#[derive(Clone, Debug)]
struct Exported {
    square: Square,
    ranges: Vec<Range>,
}

/// The lifecycle of a [Builder].
#[derive(Clone, Debug)]
enum Phase {
    /// Nothing appended yet.
    Empty,
    /// Transactions are being admitted.
    Accumulating,
    /// The width of the square is fixed, but shares have not been written yet.
    Sized(usize),
    /// The square has been written.
    Exported(Box<Exported>),
}

/// Incrementally admits transactions into a square without exceeding a maximum size.
///
/// Transactions must be offered in priority order: all ordinary transactions first, then all
/// blob transactions. Once [Builder::export] has been called, the builder can no longer be
/// appended to.
#[derive(Clone, Debug)]
pub struct Builder {
    cfg: Config,
    phase: Phase,
    current_size: usize,

    txs: Vec<Bytes>,
    pfbs: Vec<IndexWrapper>,
    blobs: Vec<Element>,

    tx_counter: CompactShareCounter,
    pfb_counter: CompactShareCounter,
}

impl Builder {
    /// Create an empty builder.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            phase: Phase::Empty,
            current_size: 0,
            txs: Vec::new(),
            pfbs: Vec::new(),
            blobs: Vec::new(),
            tx_counter: CompactShareCounter::new(),
            pfb_counter: CompactShareCounter::new(),
        })
    }

    /// Create a builder containing every transaction in `txs`.
    ///
    /// Each transaction is classified as a blob transaction or an ordinary one. Fails if an
    /// ordinary transaction follows a blob transaction, if a blob transaction is malformed, or
    /// if any transaction does not fit.
    pub fn with_txs<T: AsRef<[u8]>>(cfg: Config, txs: &[T]) -> Result<Self, Error> {
        let mut builder = Self::new(cfg)?;
        let mut seen_blob_tx = false;
        for (index, raw) in txs.iter().enumerate() {
            let raw = raw.as_ref();
            let blob_tx = BlobTx::unmarshal(raw).map_err(|err| Error::MalformedBlobTx {
                index,
                source: Box::new(err),
            })?;
            let appended = match blob_tx {
                Some(blob_tx) => {
                    seen_blob_tx = true;
                    builder.append_blob_tx(blob_tx)
                }
                None => {
                    if seen_blob_tx {
                        return Err(Error::TxAfterBlobTx(index));
                    }
                    if raw.is_empty() {
                        return Err(Error::EmptyTx(index));
                    }
                    builder.append_tx(Bytes::copy_from_slice(raw))
                }
            };
            if !appended {
                return Err(Error::NoSpace(index));
            }
        }
        Ok(builder)
    }

    fn begin_append(&mut self) {
        match self.phase {
            Phase::Empty => self.phase = Phase::Accumulating,
            Phase::Accumulating => {}
            _ => panic!("can not append to a square that has already been sized"),
        }
    }

    fn can_fit(&self, shares: usize) -> bool {
        self.current_size + shares <= self.cfg.max_shares()
    }

    /// Admit an ordinary transaction if it fits, returning whether it was admitted.
    ///
    /// Empty transactions are never admitted.
    ///
    /// # Panics
    ///
    /// Panics if called after [Builder::export].
    pub fn append_tx(&mut self, tx: impl Into<Bytes>) -> bool {
        self.begin_append();
        let tx = tx.into();
        if tx.is_empty() {
            debug!("empty tx rejected");
            return false;
        }
        let added = self.tx_counter.add(tx.len());
        if !self.can_fit(added) {
            self.tx_counter.revert();
            debug!(
                len = tx.len(),
                added,
                current_size = self.current_size,
                "tx does not fit"
            );
            return false;
        }
        self.txs.push(tx);
        self.current_size += added;
        true
    }

    /// Admit a blob transaction (and all of its blobs) if it fits, returning whether it was
    /// admitted.
    ///
    /// The cost of every blob includes the largest padding that could precede it, so admission
    /// holds no matter where the blob is finally placed.
    ///
    /// # Panics
    ///
    /// Panics if called after [Builder::export].
    pub fn append_blob_tx(&mut self, blob_tx: BlobTx) -> bool {
        self.begin_append();

        // Until the square is laid out, assume every index takes the longest encoding
        let worst_case = u32::try_from(self.cfg.max_shares()).unwrap_or(u32::MAX);
        let wrapper = IndexWrapper::new(blob_tx.tx, vec![worst_case; blob_tx.blobs.len()]);
        let pfb_added = self.pfb_counter.add(wrapper.encoded_len());

        let pfb_index = self.pfbs.len();
        let elements: Vec<Element> = blob_tx
            .blobs
            .into_iter()
            .enumerate()
            .map(|(blob_index, blob)| {
                Element::new(blob, pfb_index, blob_index, self.cfg.subtree_root_threshold)
            })
            .collect();
        let blob_cost: usize = elements.iter().map(Element::max_share_offset).sum();

        let added = pfb_added + blob_cost;
        if !self.can_fit(added) {
            self.pfb_counter.revert();
            debug!(
                blobs = elements.len(),
                added,
                current_size = self.current_size,
                "blob tx does not fit"
            );
            return false;
        }
        self.pfbs.push(wrapper);
        self.blobs.extend(elements);
        self.current_size += added;
        true
    }

    /// Returns the worst case number of shares used by everything admitted so far.
    pub fn current_size(&self) -> usize {
        self.current_size
    }

    /// Returns true if nothing has been admitted.
    pub fn is_empty(&self) -> bool {
        self.tx_counter.size() == 0 && self.pfb_counter.size() == 0
    }

    /// Returns the width the square would have if exported now.
    pub fn square_size(&self) -> usize {
        match &self.phase {
            Phase::Sized(size) => *size,
            Phase::Exported(exported) => exported.square.size(),
            Phase::Empty | Phase::Accumulating => blob_min_square_size(self.current_size),
        }
    }

    /// Returns the number of transactions admitted (ordinary and blob).
    pub fn num_txs(&self) -> usize {
        self.txs.len() + self.pfbs.len()
    }

    /// Returns the number of blob transactions admitted.
    pub fn num_pfbs(&self) -> usize {
        self.pfbs.len()
    }

    /// Write the square.
    ///
    /// Returns the square and the share range of every transaction, indexed in admission order
    /// (ordinary transactions first, then blob transactions). Calling this again returns the
    /// same result.
    pub fn export(&mut self) -> Result<(Square, Vec<Range>), Error> {
        let size = match &self.phase {
            Phase::Exported(exported) => {
                return Ok((exported.square.clone(), exported.ranges.clone()))
            }
            Phase::Empty => {
                self.phase = Phase::Exported(Box::new(Exported {
                    square: Square::empty(),
                    ranges: Vec::new(),
                }));
                return Ok((Square::empty(), Vec::new()));
            }
            Phase::Accumulating => blob_min_square_size(self.current_size),
            Phase::Sized(size) => *size,
        };
        self.phase = Phase::Sized(size);

        let exported = self.write(size)?;
        let result = (exported.square.clone(), exported.ranges.clone());
        self.phase = Phase::Exported(Box::new(exported));
        Ok(result)
    }

    fn write(&mut self, size: usize) -> Result<Exported, Error> {
        // Blobs of one namespace keep their priority order
        self.blobs.sort_by(|a, b| a.blob.namespace().cmp(&b.blob.namespace()));

        let mut tx_writer = CompactShareSplitter::new(Namespace::TX)?;
        for tx in &self.txs {
            tx_writer.write_tx(tx)?;
        }

        // Place each blob at the next index aligned to its subtree width
        let mut non_reserved_start = self.tx_counter.size() + self.pfb_counter.size();
        let mut cursor = non_reserved_start;
        let mut end_of_last_blob = non_reserved_start;
        let mut blob_writer = SparseShareSplitter::new();
        for (i, element) in self.blobs.iter().enumerate() {
            cursor = next_share_index(cursor, element.num_shares, self.cfg.subtree_root_threshold);
            if i == 0 {
                non_reserved_start = cursor;
            }
            let padding = cursor - end_of_last_blob;
            assert!(
                padding <= element.max_padding,
                "blob {i} requires {padding} shares of padding, more than the {} reserved",
                element.max_padding
            );
            trace!(
                namespace = %element.blob.namespace(),
                index = cursor,
                shares = element.num_shares,
                padding,
                "placed blob"
            );

            // Bounded by the maximum number of shares in the square
            self.pfbs[element.pfb_index].share_indexes[element.blob_index] = cursor as u32;
            if i > 0 {
                blob_writer.write_namespace_padding_shares(padding)?;
            }
            blob_writer.write(&element.blob)?;
            cursor += element.num_shares;
            end_of_last_blob = cursor;
        }

        // Written last so that every wrapper records the final blob indexes
        let mut pfb_writer = CompactShareSplitter::new(Namespace::PAY_FOR_BLOB)?;
        for wrapper in &self.pfbs {
            pfb_writer.write_tx(&wrapper.marshal())?;
        }
        assert!(
            self.pfb_counter.size() >= pfb_writer.count(),
            "pay-for-blob counter ({}) is smaller than the shares written ({})",
            self.pfb_counter.size(),
            pfb_writer.count()
        );

        let shares = write_square(
            &tx_writer,
            &pfb_writer,
            &blob_writer,
            non_reserved_start,
            size,
        )?;
        assert!(
            shares
                .windows(2)
                .all(|pair| pair[0].namespace() <= pair[1].namespace()),
            "square shares are not ordered by namespace"
        );

        let mut ranges = tx_writer.ordered_share_ranges(0);
        ranges.extend(pfb_writer.ordered_share_ranges(tx_writer.count()));
        debug!(
            size,
            txs = self.txs.len(),
            pfbs = self.pfbs.len(),
            blobs = self.blobs.len(),
            current_size = self.current_size,
            "exported square"
        );
        Ok(Exported {
            square: Square::from_shares(shares)?,
            ranges,
        })
    }

    /// Returns the share range of the transaction at `tx_index` (exporting first if needed).
    pub fn find_tx_share_range(&mut self, tx_index: usize) -> Result<Range, Error> {
        let (_, ranges) = self.export()?;
        ranges
            .get(tx_index)
            .copied()
            .ok_or(Error::IndexOutOfBounds(tx_index))
    }

    fn pfb_index(&self, tx_index: usize) -> Result<usize, Error> {
        let pfb_index = tx_index
            .checked_sub(self.txs.len())
            .ok_or(Error::NotBlobTx(tx_index))?;
        if pfb_index >= self.pfbs.len() {
            return Err(Error::IndexOutOfBounds(tx_index));
        }
        Ok(pfb_index)
    }

    /// Returns the index of the first share of blob `blob_index` of the transaction at
    /// `tx_index` (exporting first if needed).
    pub fn find_blob_starting_index(
        &mut self,
        tx_index: usize,
        blob_index: usize,
    ) -> Result<usize, Error> {
        let pfb_index = self.pfb_index(tx_index)?;
        self.export()?;
        self.pfbs[pfb_index]
            .share_indexes
            .get(blob_index)
            .map(|index| *index as usize)
            .ok_or(Error::IndexOutOfBounds(blob_index))
    }

    /// Returns the number of shares occupied by blob `blob_index` of the transaction at
    /// `tx_index`.
    pub fn blob_share_length(&self, tx_index: usize, blob_index: usize) -> Result<usize, Error> {
        let pfb_index = self.pfb_index(tx_index)?;
        self.blobs
            .iter()
            .find(|element| element.pfb_index == pfb_index && element.blob_index == blob_index)
            .map(|element| element.num_shares)
            .ok_or(Error::IndexOutOfBounds(blob_index))
    }

    /// Returns the encoded index wrapper of the transaction at `tx_index`.
    ///
    /// Share indexes are only final once the square has been exported.
    pub fn wrapped_pfb(&self, tx_index: usize) -> Result<Bytes, Error> {
        let pfb_index = self.pfb_index(tx_index)?;
        Ok(self.pfbs[pfb_index].marshal())
    }
}

/// Concatenate the sections of a square and pad it to `size * size` shares.
fn write_square(
    tx_writer: &CompactShareSplitter,
    pfb_writer: &CompactShareSplitter,
    blob_writer: &SparseShareSplitter,
    non_reserved_start: usize,
    size: usize,
) -> Result<Vec<Share>, Error> {
    let total = size * size;
    let padding_start = tx_writer.count() + pfb_writer.count();
    assert!(
        non_reserved_start >= padding_start,
        "blobs start at {non_reserved_start}, before the reserved shares end at {padding_start}"
    );
    let end_of_last_blob = non_reserved_start + blob_writer.count();
    assert!(
        end_of_last_blob <= total,
        "blobs end at {end_of_last_blob}, past the end of the square at {total}"
    );

    let mut shares = Vec::with_capacity(total);
    shares.extend(tx_writer.export()?);
    shares.extend(pfb_writer.export()?);
    shares.extend(reserved_padding_shares(non_reserved_start - padding_start));
    shares.extend(blob_writer.export());
    shares.extend(tail_padding_shares(total - shares.len()));
    Ok(shares)
}
