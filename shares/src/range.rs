use crate::{Namespace, Share};

/// An end-exclusive interval of share indexes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The range covering no shares.
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns the range shifted by `offset`.
    pub const fn shift(self, offset: usize) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }

    pub fn as_std(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<Range> for std::ops::Range<usize> {
    fn from(value: Range) -> Self {
        value.as_std()
    }
}

/// Returns the range of shares in `namespace`, assuming `shares` is sorted by namespace.
///
/// If no share is in `namespace`, the result is [Range::empty].
pub fn share_range_for_namespace(shares: &[Share], namespace: Namespace) -> Range {
    let (Some(first), Some(last)) = (shares.first(), shares.last()) else {
        return Range::empty();
    };
    if namespace < first.namespace() || namespace > last.namespace() {
        return Range::empty();
    }

    let Some(start) = shares
        .iter()
        .position(|share| share.namespace() == namespace)
    else {
        return Range::empty();
    };
    let end = shares[start..]
        .iter()
        .position(|share| share.namespace() > namespace)
        .map_or(shares.len(), |offset| start + offset);
    Range::new(start, end)
}
