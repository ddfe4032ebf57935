//! Reconstruct transactions and blobs from shares.

use crate::{Blob, Error, Namespace, Sequence, Share, ShareVersion};
use bytes::{Bytes, BytesMut};
use prost::decode_length_delimiter;
use tracing::{debug, trace};

/// The longest encoding of a varint length delimiter.
const MAX_DELIMITER_LEN: usize = 10;

/// Parse the units packed into a run of compact shares.
///
/// The first share is read from its reserved offset, so `shares` may start in the middle of a
/// sequence: the tail of a unit that began before the range is skipped. A unit that does not
/// fully fit in the range (or the zero padding of the last share) ends parsing.
pub fn parse_compact_shares(shares: &[Share]) -> Result<Vec<Bytes>, Error> {
    let Some((first, rest)) = shares.split_first() else {
        return Ok(Vec::new());
    };
    for share in shares {
        if share.version() != ShareVersion::Zero.as_u8() {
            return Err(Error::UnsupportedShareVersion(share.version()));
        }
        if !share.is_compact() {
            return Err(Error::NotCompactShare);
        }
    }

    let mut raw = BytesMut::new();
    raw.extend_from_slice(first.raw_data_using_reserved()?);
    for share in rest {
        raw.extend_from_slice(share.raw_data());
    }
    parse_delimited(raw.freeze())
}

fn parse_delimited(mut raw: Bytes) -> Result<Vec<Bytes>, Error> {
    let mut units = Vec::new();
    while !raw.is_empty() {
        let (len, consumed) = parse_delimiter(&raw)?;
        if len == 0 || consumed > raw.len() || len > raw.len() - consumed {
            break;
        }
        let _ = raw.split_to(consumed);
        units.push(raw.split_to(len));
    }
    trace!(units = units.len(), "parsed compact shares");
    Ok(units)
}

/// Returns the unit length and the number of bytes the delimiter occupies.
///
/// Input shorter than the longest delimiter is zero-extended first.
fn parse_delimiter(raw: &[u8]) -> Result<(usize, usize), Error> {
    let mut buf = [0u8; MAX_DELIMITER_LEN];
    let available = raw.len().min(MAX_DELIMITER_LEN);
    buf[..available].copy_from_slice(&raw[..available]);

    let mut cursor = &buf[..];
    let len = decode_length_delimiter(&mut cursor).map_err(|_| Error::InvalidDelimiter)?;
    Ok((len, MAX_DELIMITER_LEN - cursor.len()))
}

/// Parse transactions from compact shares, all of which must be in [Namespace::TX].
pub fn parse_txs(shares: &[Share]) -> Result<Vec<Bytes>, Error> {
    require_namespace(shares, Namespace::TX)?;
    parse_compact_shares(shares)
}

fn require_namespace(shares: &[Share], expected: Namespace) -> Result<(), Error> {
    match shares.iter().position(|share| share.namespace() != expected) {
        Some(index) => Err(Error::UnexpectedNamespace { index, expected }),
        None => Ok(()),
    }
}

struct OpenSequence {
    namespace: Namespace,
    version: ShareVersion,
    declared: u32,
    signer: Option<Bytes>,
    data: BytesMut,
}

/// Parse the blobs stored in a run of sparse shares.
///
/// Padding shares are skipped. Every sequence must start within `shares` and carry at least
/// as many bytes as it declares.
pub fn parse_sparse_shares(shares: &[Share]) -> Result<Vec<Blob>, Error> {
    let mut sequences: Vec<OpenSequence> = Vec::new();
    for (index, share) in shares.iter().enumerate() {
        let version = ShareVersion::try_from(share.version())?;
        if share.is_padding() {
            continue;
        }

        if share.is_sequence_start() {
            sequences.push(OpenSequence {
                namespace: share.namespace(),
                version,
                declared: share.sequence_len(),
                signer: share.signer().map(Bytes::copy_from_slice),
                data: BytesMut::from(share.raw_data()),
            });
            continue;
        }

        let Some(open) = sequences.last_mut() else {
            return Err(Error::OrphanContinuation(index));
        };
        let found = share.namespace();
        if found != open.namespace {
            return Err(Error::ContinuationNamespaceMismatch {
                index,
                expected: open.namespace,
                found,
            });
        }
        open.data.extend_from_slice(share.raw_data());
    }

    sequences
        .into_iter()
        .map(|sequence| {
            let declared = sequence.declared as usize;
            if declared > sequence.data.len() {
                return Err(Error::SequenceLengthExceedsData {
                    declared: sequence.declared,
                    available: sequence.data.len(),
                });
            }
            let mut data = sequence.data;
            data.truncate(declared);
            Blob::new(
                sequence.namespace,
                data.freeze(),
                sequence.version,
                sequence.signer,
            )
        })
        .collect()
}

/// Parse blobs from sparse shares.
pub fn parse_blobs(shares: &[Share]) -> Result<Vec<Blob>, Error> {
    parse_sparse_shares(shares)
}

/// Group shares into sequences, verifying that each one spans exactly as many shares as its
/// declared length requires.
///
/// If `ignore_padding` is set, sequences made of a single padding share are dropped.
pub fn parse_shares(shares: &[Share], ignore_padding: bool) -> Result<Vec<Sequence>, Error> {
    let mut sequences: Vec<(usize, Sequence)> = Vec::new();
    for (index, share) in shares.iter().enumerate() {
        let namespace = share.namespace();
        if share.is_sequence_start() {
            sequences.push((
                index,
                Sequence {
                    namespace,
                    shares: vec![share.clone()],
                },
            ));
            continue;
        }

        let Some((_, current)) = sequences.last_mut() else {
            return Err(Error::OrphanContinuation(index));
        };
        if current.namespace != namespace {
            return Err(Error::ContinuationNamespaceMismatch {
                index,
                expected: current.namespace,
                found: namespace,
            });
        }
        current.shares.push(share.clone());
    }

    for (index, sequence) in &sequences {
        if sequence.is_padding() {
            continue;
        }
        let expected = sequence.expected_shares()?;
        if sequence.shares.len() != expected {
            debug!(
                index,
                actual = sequence.shares.len(),
                expected,
                "invalid sequence length"
            );
            return Err(Error::InvalidSequenceLength {
                index: *index,
                actual: sequence.shares.len(),
                expected,
            });
        }
    }

    Ok(sequences
        .into_iter()
        .map(|(_, sequence)| sequence)
        .filter(|sequence| !(ignore_padding && sequence.is_padding()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compact::split_txs, sparse::split_blobs, tail_padding_shares, CompactShareSplitter,
        InfoByte, ShareBuilder, SparseShareSplitter, SHARE_SIZE, SIGNER_SIZE,
    };
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_bytes(rng: &mut StdRng, len: usize) -> Vec<u8> {
        (0..len).map(|_| rng.gen()).collect()
    }

    fn random_txs(rng: &mut StdRng, count: usize, max_len: usize) -> Vec<Vec<u8>> {
        (0..count)
            .map(|_| {
                let len = rng.gen_range(1..=max_len);
                random_bytes(rng, len)
            })
            .collect()
    }

    fn ns(id: u8) -> Namespace {
        Namespace::new_v0(&[id, 0]).unwrap()
    }

    #[test]
    fn test_compact_round_trip() {
        let mut rng = StdRng::seed_from_u64(0);
        for max_len in [1, 50, 500, 5_000] {
            let txs = random_txs(&mut rng, 40, max_len);
            let shares = split_txs(Namespace::TX, &txs).unwrap();
            assert_eq!(parse_compact_shares(&shares).unwrap(), txs);
            assert_eq!(parse_txs(&shares).unwrap(), txs);
        }
    }

    #[test]
    fn test_parse_compact_empty() {
        assert!(parse_compact_shares(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_compact_out_of_context() {
        let mut rng = StdRng::seed_from_u64(1);
        let txs = random_txs(&mut rng, 60, 700);
        let mut splitter = CompactShareSplitter::new(Namespace::TX).unwrap();
        for tx in &txs {
            splitter.write_tx(tx).unwrap();
        }
        let shares = splitter.export().unwrap();
        let ranges = splitter.ordered_share_ranges(0);

        for i in 0..shares.len() {
            // Slices must start at a share in which some transaction begins
            if shares[i].reserved_offset().unwrap() == 0 {
                continue;
            }
            for j in i + 1..=shares.len() {
                let expected: Vec<&Vec<u8>> = txs
                    .iter()
                    .zip(ranges.iter())
                    .filter(|(_, range)| range.start >= i && range.end <= j)
                    .map(|(tx, _)| tx)
                    .collect();
                let parsed = parse_compact_shares(&shares[i..j]).unwrap();
                assert_eq!(parsed.len(), expected.len(), "slice {i}..{j}");
                for (parsed, expected) in parsed.iter().zip(expected) {
                    assert_eq!(parsed, expected);
                }
            }
        }
    }

    #[test]
    fn test_parse_compact_rejects() {
        let blob = Blob::new_v0(ns(1), vec![1u8; 10]).unwrap();
        let shares = split_blobs([&blob]).unwrap();
        assert_eq!(
            parse_compact_shares(&shares),
            Err(Error::NotCompactShare)
        );

        let shares = split_txs(Namespace::PAY_FOR_BLOB, &[vec![1u8; 10]]).unwrap();
        assert_eq!(
            parse_txs(&shares),
            Err(Error::UnexpectedNamespace {
                index: 0,
                expected: Namespace::TX
            })
        );

        // Compact shares only support version zero
        let mut raw = shares[0].as_bytes().to_vec();
        raw[crate::NAMESPACE_SIZE] = InfoByte::new(1, true).unwrap().as_u8();
        let share = Share::from_bytes(raw).unwrap();
        assert_eq!(
            parse_compact_shares(&[share]),
            Err(Error::UnsupportedShareVersion(1))
        );
    }

    #[test]
    fn test_sparse_round_trip() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut blobs = Vec::new();
        for i in 0..20u8 {
            let len = rng.gen_range(1..3_000);
            let data = random_bytes(&mut rng, len);
            let blob = match i % 3 {
                0 => Blob::new_v0(ns(i + 1), data).unwrap(),
                1 => Blob::new_v1(ns(i + 1), data, random_bytes(&mut rng, SIGNER_SIZE)).unwrap(),
                _ => Blob::new_v2(
                    ns(i + 1),
                    rng.gen(),
                    rng.gen(),
                    random_bytes(&mut rng, SIGNER_SIZE),
                )
                .unwrap(),
            };
            blobs.push(blob);
        }

        let shares = split_blobs(&blobs).unwrap();
        assert_eq!(parse_sparse_shares(&shares).unwrap(), blobs);
        assert_eq!(parse_blobs(&shares).unwrap(), blobs);

        // Each blob parses on its own
        let mut offset = 0;
        for blob in &blobs {
            let end = offset + blob.shares_needed();
            assert_eq!(
                parse_sparse_shares(&shares[offset..end]).unwrap(),
                vec![blob.clone()]
            );
            offset = end;
        }
        assert_eq!(offset, shares.len());
    }

    #[test]
    fn test_sparse_skips_padding() {
        let a = Blob::new_v0(ns(1), vec![1u8; 600]).unwrap();
        let b = Blob::new_v0(ns(2), vec![2u8; 600]).unwrap();
        let mut splitter = SparseShareSplitter::new();
        splitter.write(&a).unwrap();
        splitter.write_namespace_padding_shares(2).unwrap();
        splitter.write(&b).unwrap();
        let mut shares = splitter.export();
        shares.extend(tail_padding_shares(3));

        assert_eq!(parse_sparse_shares(&shares).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_sparse_orphan_continuation() {
        let blob = Blob::new_v0(ns(1), vec![1u8; 1_000]).unwrap();
        let shares = split_blobs([&blob]).unwrap();
        assert_eq!(
            parse_sparse_shares(&shares[1..]),
            Err(Error::OrphanContinuation(0))
        );
    }

    #[test]
    fn test_sparse_namespace_mismatch() {
        let a = Blob::new_v0(ns(1), vec![1u8; 10]).unwrap();
        let b = Blob::new_v0(ns(2), vec![2u8; 1_000]).unwrap();
        let shares_a = split_blobs([&a]).unwrap();
        let shares_b = split_blobs([&b]).unwrap();
        let spliced = vec![shares_a[0].clone(), shares_b[1].clone()];
        assert_eq!(
            parse_sparse_shares(&spliced),
            Err(Error::ContinuationNamespaceMismatch {
                index: 1,
                expected: ns(1),
                found: ns(2),
            })
        );
    }

    #[test]
    fn test_sparse_truncated() {
        let blob = Blob::new_v0(ns(1), vec![1u8; 1_000]).unwrap();
        let shares = split_blobs([&blob]).unwrap();
        assert_eq!(shares.len(), 3);
        assert_eq!(
            parse_sparse_shares(&shares[..2]),
            Err(Error::SequenceLengthExceedsData {
                declared: 1_000,
                available: 478 + 482,
            })
        );
    }

    #[test]
    fn test_sparse_unsupported_version() {
        let mut builder = ShareBuilder::new(ns(1), ShareVersion::Zero, true).unwrap();
        builder.write_sequence_len(1).unwrap();
        builder.add_data(&[1]);
        builder.zero_pad_if_necessary();
        let mut raw = builder.build().unwrap().as_bytes().to_vec();
        raw[crate::NAMESPACE_SIZE] = InfoByte::new(9, true).unwrap().as_u8();
        let share = Share::from_bytes(raw).unwrap();
        assert_eq!(
            parse_sparse_shares(&[share]),
            Err(Error::UnsupportedShareVersion(9))
        );
    }

    #[test]
    fn test_parse_shares() {
        let txs = vec![vec![1u8; 800], vec![2u8; 10]];
        let a = Blob::new_v0(ns(1), vec![3u8; 1_000]).unwrap();
        let b = Blob::new_v1(ns(2), vec![4u8; 10], vec![0u8; SIGNER_SIZE]).unwrap();

        let mut shares = split_txs(Namespace::TX, &txs).unwrap();
        let mut splitter = SparseShareSplitter::new();
        splitter.write(&a).unwrap();
        splitter.write_namespace_padding_shares(1).unwrap();
        splitter.write(&b).unwrap();
        shares.extend(splitter.export());
        shares.extend(tail_padding_shares(2));
        assert_eq!(shares.len(), 2 + 3 + 1 + 1 + 2);

        let sequences = parse_shares(&shares, false).unwrap();
        assert_eq!(sequences.len(), 6);
        assert_eq!(sequences[0].namespace, Namespace::TX);
        assert_eq!(sequences[0].shares.len(), 2);
        assert_eq!(sequences[1].shares.len(), 3);
        assert!(sequences[2].is_padding());

        let sequences = parse_shares(&shares, true).unwrap();
        let namespaces: Vec<Namespace> = sequences.iter().map(|s| s.namespace).collect();
        assert_eq!(namespaces, vec![Namespace::TX, ns(1), ns(2)]);
        assert_eq!(sequences[2].sequence_len(), 10);
    }

    #[test]
    fn test_parse_shares_invalid_sequence_length() {
        let blob = Blob::new_v0(ns(1), vec![3u8; 1_000]).unwrap();
        let shares = split_blobs([&blob]).unwrap();
        assert_eq!(
            parse_shares(&shares[..2], false),
            Err(Error::InvalidSequenceLength {
                index: 0,
                actual: 2,
                expected: 3,
            })
        );
        assert_eq!(
            parse_shares(&shares[1..], false),
            Err(Error::OrphanContinuation(0))
        );

        // A continuation share cut from another namespace
        let txs = split_txs(Namespace::TX, &[vec![1u8; 600]]).unwrap();
        let mut spliced = vec![txs[0].clone()];
        spliced.extend(shares[1..2].iter().cloned());
        assert_eq!(
            parse_shares(&spliced, false),
            Err(Error::ContinuationNamespaceMismatch {
                index: 1,
                expected: Namespace::TX,
                found: ns(1),
            })
        );
    }

    #[test]
    fn test_raw_share_lengths() {
        let shares = split_txs(Namespace::TX, &[vec![1u8; 2_000]]).unwrap();
        assert!(shares.iter().all(|share| share.as_bytes().len() == SHARE_SIZE));
    }
}
