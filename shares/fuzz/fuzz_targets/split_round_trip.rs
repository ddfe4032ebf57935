#![no_main]

use arbitrary::Arbitrary;
use dasquare_shares::{
    parse_sparse_shares, parse_txs, split_blobs, split_txs, Blob, Namespace, SIGNER_SIZE,
};
use libfuzzer_sys::fuzz_target;

const MAX_TXS: usize = 32;
const MAX_BLOBS: usize = 8;

#[derive(Arbitrary, Debug)]
struct FuzzBlob {
    id: [u8; 8],
    data: Vec<u8>,
    signer: Option<[u8; SIGNER_SIZE]>,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    txs: Vec<Vec<u8>>,
    blobs: Vec<FuzzBlob>,
}

fn fuzz(input: FuzzInput) {
    let txs: Vec<Vec<u8>> = input
        .txs
        .into_iter()
        .filter(|tx| !tx.is_empty())
        .take(MAX_TXS)
        .collect();
    let shares = split_txs(Namespace::TX, &txs).unwrap();
    assert_eq!(parse_txs(&shares).unwrap(), txs);

    let blobs: Vec<Blob> = input
        .blobs
        .into_iter()
        .take(MAX_BLOBS)
        .filter_map(|blob| {
            // Prefix the id so the namespace is never reserved
            let mut id = vec![1u8];
            id.extend_from_slice(&blob.id);
            let namespace = Namespace::new_v0(&id).ok()?;
            match blob.signer {
                Some(signer) => Blob::new_v1(namespace, blob.data, signer.to_vec()).ok(),
                None => Blob::new_v0(namespace, blob.data).ok(),
            }
        })
        .collect();
    let shares = split_blobs(&blobs).unwrap();
    assert_eq!(parse_sparse_shares(&shares).unwrap(), blobs);
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
