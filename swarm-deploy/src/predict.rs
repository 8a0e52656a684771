//! CREATE address prediction.

use alloy_primitives::{keccak256, Address};

/// Address a contract receives when `deployer` creates it with transaction
/// count `nonce`.
///
/// Keccak-256 of the RLP list `(deployer, nonce)`, low-order 20 bytes. Pure
/// and chain-independent, so the landing address can be announced before any
/// transaction is sent and re-derived for the post-deploy consistency check.
pub fn predict_contract_address(deployer: Address, nonce: u64) -> Address {
    let encoded = rlp_address_nonce(deployer, nonce);
    Address::from_slice(&keccak256(&encoded)[12..])
}

// RLP of the two-item list [20-byte address, minimal big-endian nonce].
// The payload is at most 30 bytes, so single-byte headers always suffice.
fn rlp_address_nonce(address: Address, nonce: u64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(30);
    payload.push(0x80 + 20);
    payload.extend_from_slice(address.as_slice());

    if nonce == 0 {
        // Zero is the empty byte string, not a zero byte.
        payload.push(0x80);
    } else if nonce < 0x80 {
        payload.push(nonce as u8);
    } else {
        let bytes = nonce.to_be_bytes();
        let skip = (nonce.leading_zeros() / 8) as usize;
        payload.push(0x80 + (8 - skip) as u8);
        payload.extend_from_slice(&bytes[skip..]);
    }

    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(0xc0 + payload.len() as u8);
    out.extend_from_slice(&payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    // Deployer of the published CREATE reference vectors.
    const DEPLOYER: Address = address!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");

    #[test]
    fn matches_published_vectors() {
        assert_eq!(
            predict_contract_address(DEPLOYER, 0),
            address!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d")
        );
        assert_eq!(
            predict_contract_address(DEPLOYER, 1),
            address!("343c43a37d37dff08ae8c4a11544c718abb4fcf8")
        );
    }

    #[test]
    fn nonce_zero_is_not_a_zero_byte() {
        // Encoding nonce 0 as a literal 0x00 item would hash differently.
        let mut wrong = vec![0xc0 + 22, 0x80 + 20];
        wrong.extend_from_slice(DEPLOYER.as_slice());
        wrong.push(0x00);
        let wrong_address = Address::from_slice(&keccak256(&wrong)[12..]);
        assert_ne!(predict_contract_address(DEPLOYER, 0), wrong_address);
    }

    #[test]
    fn deterministic_and_distinct_across_nonces() {
        let a = predict_contract_address(DEPLOYER, 78);
        let b = predict_contract_address(DEPLOYER, 78);
        assert_eq!(a, b);
        assert_ne!(a, predict_contract_address(DEPLOYER, 79));
    }

    #[test]
    fn agrees_with_alloy_derivation_at_encoding_boundaries() {
        // 0x7f/0x80 is where the single-byte encoding ends; the larger
        // values exercise multi-byte minimal encodings.
        for nonce in [0, 1, 2, 78, 0x7f, 0x80, 0xff, 0x100, u32::MAX as u64 + 1] {
            assert_eq!(
                predict_contract_address(DEPLOYER, nonce),
                DEPLOYER.create(nonce),
                "nonce {nonce}"
            );
        }
    }

    #[test]
    fn formats_as_prefixed_twenty_byte_hex() {
        let rendered = predict_contract_address(DEPLOYER, 0).to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 42);
    }
}
