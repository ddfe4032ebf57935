//! Transaction envelopes.
//!
//! Both envelopes are protobuf messages tagged with a type id, so that they can be told apart
//! from ordinary transactions (and from each other) without any outside context:
//!
//! - [BlobTx]: a transaction and the blobs it pays for, as submitted by a user.
//! - [IndexWrapper]: a transaction and the index of the first share of each of its blobs, as
//!   written into a square.

use crate::Error;
use bytes::Bytes;
use dasquare_shares::{Blob, Namespace, ShareVersion};
use prost::Message;

/// The type id of a [BlobTx].
pub const BLOB_TX_TYPE_ID: &str = "BLOB";

/// The type id of an [IndexWrapper].
pub const INDEX_WRAPPER_TYPE_ID: &str = "INDX";

#[derive(Clone, PartialEq, Message)]
struct BlobProto {
    #[prost(bytes = "bytes", tag = "1")]
    namespace_id: Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    data: Bytes,
    #[prost(uint32, tag = "3")]
    share_version: u32,
    #[prost(uint32, tag = "4")]
    namespace_version: u32,
    #[prost(bytes = "bytes", tag = "5")]
    signer: Bytes,
}

#[derive(Clone, PartialEq, Message)]
struct BlobTxProto {
    #[prost(bytes = "bytes", tag = "1")]
    tx: Bytes,
    #[prost(message, repeated, tag = "2")]
    blobs: Vec<BlobProto>,
    #[prost(string, tag = "3")]
    type_id: String,
}

#[derive(Clone, PartialEq, Message)]
struct IndexWrapperProto {
    #[prost(bytes = "bytes", tag = "1")]
    tx: Bytes,
    #[prost(uint32, repeated, tag = "2")]
    share_indexes: Vec<u32>,
    #[prost(string, tag = "3")]
    type_id: String,
}

impl From<&Blob> for BlobProto {
    fn from(blob: &Blob) -> Self {
        let namespace = blob.namespace();
        Self {
            namespace_id: Bytes::copy_from_slice(namespace.id()),
            data: blob.data().clone(),
            share_version: blob.share_version().as_u8() as u32,
            namespace_version: namespace.version() as u32,
            signer: blob.signer().cloned().unwrap_or_default(),
        }
    }
}

impl TryFrom<BlobProto> for Blob {
    type Error = Error;

    fn try_from(proto: BlobProto) -> Result<Self, Self::Error> {
        let namespace_version = u8::try_from(proto.namespace_version)
            .map_err(|_| Error::VersionOutOfRange(proto.namespace_version))?;
        let share_version = u8::try_from(proto.share_version)
            .map_err(|_| Error::VersionOutOfRange(proto.share_version))?;
        let namespace = Namespace::new(namespace_version, &proto.namespace_id)?;
        let share_version = ShareVersion::try_from(share_version)?;
        let signer = (!proto.signer.is_empty()).then_some(proto.signer);
        Ok(Blob::new(namespace, proto.data, share_version, signer)?)
    }
}

/// A transaction and the blobs it pays for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobTx {
    pub tx: Bytes,
    pub blobs: Vec<Blob>,
}

impl BlobTx {
    /// Create a blob transaction. At least one blob is required.
    pub fn new(tx: impl Into<Bytes>, blobs: Vec<Blob>) -> Result<Self, Error> {
        if blobs.is_empty() {
            return Err(Error::EmptyBlobTx);
        }
        Ok(Self {
            tx: tx.into(),
            blobs,
        })
    }

    fn to_proto(&self) -> BlobTxProto {
        BlobTxProto {
            tx: self.tx.clone(),
            blobs: self.blobs.iter().map(BlobProto::from).collect(),
            type_id: BLOB_TX_TYPE_ID.to_string(),
        }
    }

    /// Returns the encoded envelope.
    pub fn marshal(&self) -> Bytes {
        self.to_proto().encode_to_vec().into()
    }

    pub fn encoded_len(&self) -> usize {
        self.to_proto().encoded_len()
    }

    fn from_proto(proto: BlobTxProto) -> Result<Self, Error> {
        let blobs = proto
            .blobs
            .into_iter()
            .map(Blob::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(proto.tx, blobs)
    }

    /// Decode `raw`, which must be a blob transaction.
    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        let proto = BlobTxProto::decode(raw)?;
        if proto.type_id != BLOB_TX_TYPE_ID {
            return Err(Error::UnexpectedTypeId(proto.type_id));
        }
        Self::from_proto(proto)
    }

    /// Decode `raw` if it is a blob transaction.
    ///
    /// Returns `Ok(None)` if `raw` is not a blob transaction (it does not decode or carries
    /// another type id), and an error if it claims to be one but is malformed.
    pub fn unmarshal(raw: &[u8]) -> Result<Option<Self>, Error> {
        let Ok(proto) = BlobTxProto::decode(raw) else {
            return Ok(None);
        };
        if proto.type_id != BLOB_TX_TYPE_ID {
            return Ok(None);
        }
        Self::from_proto(proto).map(Some)
    }
}

/// A transaction and the index of the first share of each of the blobs it paid for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexWrapper {
    pub tx: Bytes,
    pub share_indexes: Vec<u32>,
}

impl IndexWrapper {
    pub fn new(tx: impl Into<Bytes>, share_indexes: Vec<u32>) -> Self {
        Self {
            tx: tx.into(),
            share_indexes,
        }
    }

    fn to_proto(&self) -> IndexWrapperProto {
        IndexWrapperProto {
            tx: self.tx.clone(),
            share_indexes: self.share_indexes.clone(),
            type_id: INDEX_WRAPPER_TYPE_ID.to_string(),
        }
    }

    /// Returns the encoded envelope.
    pub fn marshal(&self) -> Bytes {
        self.to_proto().encode_to_vec().into()
    }

    pub fn encoded_len(&self) -> usize {
        self.to_proto().encoded_len()
    }

    fn from_proto(proto: IndexWrapperProto) -> Result<Self, Error> {
        if proto.share_indexes.is_empty() {
            return Err(Error::EmptyIndexWrapper);
        }
        Ok(Self {
            tx: proto.tx,
            share_indexes: proto.share_indexes,
        })
    }

    /// Decode `raw`, which must be an index wrapper.
    pub fn decode(raw: &[u8]) -> Result<Self, Error> {
        let proto = IndexWrapperProto::decode(raw)?;
        if proto.type_id != INDEX_WRAPPER_TYPE_ID {
            return Err(Error::UnexpectedTypeId(proto.type_id));
        }
        Self::from_proto(proto)
    }

    /// Decode `raw` if it is an index wrapper.
    ///
    /// Returns `Ok(None)` if `raw` is not an index wrapper (it does not decode or carries another
    /// type id), and an error if it claims to be one but is malformed.
    pub fn unmarshal(raw: &[u8]) -> Result<Option<Self>, Error> {
        let Ok(proto) = IndexWrapperProto::decode(raw) else {
            return Ok(None);
        };
        if proto.type_id != INDEX_WRAPPER_TYPE_ID {
            return Ok(None);
        }
        Self::from_proto(proto).map(Some)
    }
}
