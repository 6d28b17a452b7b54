use common::ChainId;

/// Derives the chain id from the ordered bid ids.
///
/// Every id is length-prefixed before hashing, so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn chain_id<S: AsRef<str>>(bid_ids: &[S]) -> ChainId {
    let mut hasher = blake3::Hasher::new();
    for id in bid_ids {
        let bytes = id.as_ref().as_bytes();
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    ChainId(hasher.finalize().to_hex().to_string())
}
