#![no_main]

use arbitrary::Arbitrary;
use dasquare_shares::{parse_compact_shares, parse_shares, parse_sparse_shares, Share, SHARE_SIZE};
use libfuzzer_sys::fuzz_target;

const MAX_SHARES: usize = 64;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    raw: Vec<u8>,
    ignore_padding: bool,
}

fn fuzz(input: FuzzInput) {
    // Malformed shares must be rejected without panicking
    let shares: Vec<Share> = input
        .raw
        .chunks(SHARE_SIZE)
        .take(MAX_SHARES)
        .filter_map(|chunk| Share::from_bytes(chunk.to_vec()).ok())
        .collect();

    for share in &shares {
        let _ = share.raw_data();
        let _ = share.signer();
        let _ = share.raw_data_using_reserved();
        let _ = share.is_padding();
    }
    let _ = parse_compact_shares(&shares);
    let _ = parse_sparse_shares(&shares);
    let _ = parse_shares(&shares, input.ignore_padding);
}

fuzz_target!(|input: FuzzInput| {
    fuzz(input);
});
