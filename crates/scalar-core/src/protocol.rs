//! Protocol descriptors served by the Scalar API
//!
//! Read-only reference data: the core never mutates these.

use serde::{Deserialize, Serialize};

/// A bridgeable asset and the chains it lives on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Protocol {
    pub name: String,
    pub tag: String,
    pub asset: ProtocolAsset,
    #[serde(default)]
    pub chains: Vec<ProtocolChain>,
    pub custodian_group: CustodianGroup,
    /// Protocol's own Bitcoin public key (hex)
    #[serde(default)]
    pub bitcoin_pubkey: String,
}

impl Protocol {
    /// Find the deployment of this protocol on a chain
    pub fn chain(&self, chain: &str) -> Option<&ProtocolChain> {
        self.chains.iter().find(|c| c.chain == chain)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolAsset {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

/// Deployment of a protocol on one chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolChain {
    /// Chain identifier (e.g. "evm|11155111", "bitcoin|4")
    pub chain: String,
    pub name: String,
    /// Token or contract address on that chain
    pub address: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodianGroup {
    pub uid: String,
    pub name: String,
    /// Minimum number of custodian signatures to spend from the vault
    pub quorum: u8,
    #[serde(default)]
    pub custodians: Vec<Custodian>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Custodian {
    pub name: String,
    #[serde(default)]
    pub btc_pubkey: String,
    pub status: CustodianStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodianStatus {
    Activated,
    Deactivated,
    #[serde(other)]
    Unspecified,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_deserialize() {
        let json = r#"{
            "name": "Scalar pool BTC",
            "tag": "pools",
            "asset": {"symbol": "sBTC", "name": "Scalar BTC", "decimals": 8},
            "chains": [
                {"chain": "evm|11155111", "name": "Sepolia", "address": "0xabc", "symbol": "sBTC"}
            ],
            "custodian_group": {
                "uid": "g1",
                "name": "group one",
                "quorum": 3,
                "custodians": [
                    {"name": "c1", "btc_pubkey": "02aa", "status": "ACTIVATED"},
                    {"name": "c2", "btc_pubkey": "02bb", "status": "DEACTIVATED"},
                    {"name": "c3", "status": "PENDING"}
                ]
            },
            "bitcoin_pubkey": "03cc"
        }"#;

        let protocol: Protocol = serde_json::from_str(json).unwrap();
        assert_eq!(protocol.asset.decimals, 8);
        assert_eq!(protocol.custodian_group.quorum, 3);
        assert_eq!(
            protocol.custodian_group.custodians[0].status,
            CustodianStatus::Activated
        );
        assert_eq!(
            protocol.custodian_group.custodians[2].status,
            CustodianStatus::Unspecified
        );
        assert!(protocol.custodian_group.custodians[2].btc_pubkey.is_empty());
        assert_eq!(protocol.chain("evm|11155111").unwrap().name, "Sepolia");
        assert!(protocol.chain("evm|1").is_none());
    }
}
