use crate::{Error, FIBRE_BLOB_DATA_SIZE, MAX_SHARE_VERSION, SIGNER_SIZE};

/// Share versions that can be written and parsed.
pub const SUPPORTED_SHARE_VERSIONS: [ShareVersion; 3] =
    [ShareVersion::Zero, ShareVersion::One, ShareVersion::Two];

/// The layout variant of a sparse share sequence.
///
/// Compact shares always use [ShareVersion::Zero].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ShareVersion {
    /// No signer. The payload is the blob data.
    Zero = 0,
    /// A [SIGNER_SIZE]-byte signer follows the sequence length of the first share.
    One = 1,
    /// Like [ShareVersion::One], but the payload is a fixed-size fibre blob version and
    /// commitment instead of arbitrary data.
    Two = 2,
}

impl ShareVersion {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the size of the signer carried by the first share of a sequence.
    pub const fn signer_size(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One | Self::Two => SIGNER_SIZE,
        }
    }

    pub const fn requires_signer(self) -> bool {
        self.signer_size() > 0
    }

    /// Returns the exact payload size required by this version, if it is fixed.
    pub const fn fixed_data_size(self) -> Option<usize> {
        match self {
            Self::Zero | Self::One => None,
            Self::Two => Some(FIBRE_BLOB_DATA_SIZE),
        }
    }
}

impl TryFrom<u8> for ShareVersion {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            v => Err(Error::UnsupportedShareVersion(v)),
        }
    }
}

impl From<ShareVersion> for u8 {
    fn from(value: ShareVersion) -> Self {
        value.as_u8()
    }
}

/// The byte following the namespace of every share.
///
/// The share version occupies the upper seven bits and the sequence start flag the lowest bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InfoByte(u8);

impl InfoByte {
    pub fn new(version: u8, is_sequence_start: bool) -> Result<Self, Error> {
        if version > MAX_SHARE_VERSION {
            return Err(Error::UnsupportedShareVersion(version));
        }
        Ok(Self((version << 1) | u8::from(is_sequence_start)))
    }

    pub(crate) const fn from_version(version: ShareVersion, is_sequence_start: bool) -> Self {
        Self(((version as u8) << 1) | is_sequence_start as u8)
    }

    /// Interpret a raw byte. Every byte is a valid info byte.
    pub const fn from_raw(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn version(self) -> u8 {
        self.0 >> 1
    }

    pub const fn is_sequence_start(self) -> bool {
        self.0 & 1 == 1
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}
