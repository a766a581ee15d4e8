//! Evidence commitment - keccak256 over the ABI encoding of the cited URIs

use alloy::primitives::{keccak256, B256, U256};

const WORD: usize = 32;

/// ABI-encode a `string[]` as a single top-level value.
///
/// Layout: offset to the array (0x20), length, one offset per element
/// (relative to the start of the offset table), then each element as
/// length followed by its bytes right-padded to a word boundary.
pub fn encode_string_array<S: AsRef<str>>(items: &[S]) -> Vec<u8> {
    let tails: Vec<Vec<u8>> = items.iter().map(|item| encode_bytes(item.as_ref().as_bytes())).collect();

    let mut out = Vec::with_capacity(WORD * (2 + items.len()) + tails.iter().map(Vec::len).sum::<usize>());
    push_word(&mut out, WORD);
    push_word(&mut out, items.len());

    let mut offset = WORD * items.len();
    for tail in &tails {
        push_word(&mut out, offset);
        offset += tail.len();
    }
    for tail in tails {
        out.extend_from_slice(&tail);
    }
    out
}

/// Hash committing to the evidence URIs in citation order
pub fn evidence_hash<S: AsRef<str>>(uris: &[S]) -> B256 {
    keccak256(encode_string_array(uris))
}

fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    push_word(&mut out, bytes.len());
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn push_word(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&U256::from(value).to_be_bytes::<32>());
}
