//! Static network identity table and explorer links

/// Label used when no provider is present or the network query fails
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Human-readable label for a chain identifier
///
/// Covers the well-known networks; anything else renders as a generic
/// `Chain ID: N` label.
pub fn label(chain_id: u64) -> String {
    match chain_id {
        1 => "Ethereum Mainnet".to_string(),
        5 => "Goerli Testnet".to_string(),
        11155111 => "Sepolia Testnet".to_string(),
        137 => "Polygon Mainnet".to_string(),
        80001 => "Mumbai Testnet".to_string(),
        42161 => "Arbitrum One".to_string(),
        43114 => "Avalanche C-Chain".to_string(),
        56 => "BNB Smart Chain".to_string(),
        250 => "Fantom Opera".to_string(),
        10 => "Optimism".to_string(),
        other => format!("Chain ID: {}", other),
    }
}

/// Block-explorer URL for a transaction hash
pub fn explorer_tx_url(base: &str, hash: &str) -> String {
    format!("{}{}", base, hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_networks_have_names() {
        assert_eq!(label(1), "Ethereum Mainnet");
        assert_eq!(label(10), "Optimism");
        assert_eq!(label(137), "Polygon Mainnet");
    }

    #[test]
    fn unknown_networks_fall_back_to_chain_id() {
        assert_eq!(label(999999), "Chain ID: 999999");
    }

    #[test]
    fn explorer_url_appends_hash() {
        assert_eq!(
            explorer_tx_url("https://etherscan.io/tx/", "0xdead"),
            "https://etherscan.io/tx/0xdead"
        );
    }
}
