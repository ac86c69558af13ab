use tiny_keccak::{Hasher, Keccak};

/// The first 4 bytes of `keccak256(signature)`, the Solidity ABI convention
/// for a contract function's call-data selector. Deliberately Keccak, not
/// SHA-256: a selector computed with the wrong hash would silently accept
/// calls to the wrong function.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak::v256();
    hasher.update(signature.as_bytes());
    let mut digest = [0u8; 32];
    hasher.finalize(&mut digest);
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_well_known_transfer_selector() {
        // keccak256("transfer(address,uint256)")[0..4] == 0xa9059cbb
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
    }

    #[test]
    fn differs_for_differently_ordered_params() {
        let a = function_selector("approve(address,uint256)");
        let b = function_selector("approve(uint256,address)");
        assert_ne!(a, b);
    }
}
