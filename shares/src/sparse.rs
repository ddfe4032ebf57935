use crate::{namespace_padding_shares, Blob, Error, Share, ShareBuilder, ShareVersion};
use tracing::trace;

/// Writes blobs into sparse shares, one sequence per blob.
#[derive(Clone, Debug, Default)]
pub struct SparseShareSplitter {
    shares: Vec<Share>,
}

impl SparseShareSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the shares of `blob`.
    ///
    /// Only the last share of the blob is zero-padded.
    pub fn write(&mut self, blob: &Blob) -> Result<(), Error> {
        let namespace = blob.namespace();
        let version = blob.share_version();

        let mut builder = ShareBuilder::new(namespace, version, true)?;
        builder.write_sequence_len(blob.sequence_len())?;
        if let Some(signer) = blob.signer() {
            builder.write_signer(signer);
        }

        let start = self.shares.len();
        let mut remaining: &[u8] = blob.data();
        loop {
            let leftover = builder.add_data(remaining);
            if leftover.is_none() {
                builder.zero_pad_if_necessary();
            }
            let next = ShareBuilder::new(namespace, version, false)?;
            self.shares.push(std::mem::replace(&mut builder, next).build()?);
            match leftover {
                Some(leftover) => remaining = leftover,
                None => break,
            }
        }
        trace!(
            %namespace,
            version = version.as_u8(),
            len = blob.sequence_len(),
            shares = self.shares.len() - start,
            "wrote blob"
        );
        Ok(())
    }

    /// Append `count` padding shares with the namespace and version of the last share written.
    pub fn write_namespace_padding_shares(&mut self, count: usize) -> Result<(), Error> {
        if count == 0 {
            return Ok(());
        }
        let last = self.shares.last().ok_or(Error::MissingShares)?;
        let version = ShareVersion::try_from(last.version())?;
        let padding = namespace_padding_shares(last.namespace(), version, count);
        self.shares.extend(padding);
        Ok(())
    }

    /// Returns the number of shares written.
    pub fn count(&self) -> usize {
        self.shares.len()
    }

    pub fn export(&self) -> Vec<Share> {
        self.shares.clone()
    }

    pub fn into_shares(self) -> Vec<Share> {
        self.shares
    }
}

/// Split blobs into sparse shares, in the order given and without padding between them.
pub fn split_blobs<'a>(blobs: impl IntoIterator<Item = &'a Blob>) -> Result<Vec<Share>, Error> {
    let mut splitter = SparseShareSplitter::new();
    for blob in blobs {
        splitter.write(blob)?;
    }
    Ok(splitter.into_shares())
}
