//! EIP-712 domain separator.

use alloy::primitives::{Address, B256, U256, keccak256};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Canonical type string of the four-field domain.
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Fields of the domain type, in canonical order.
pub(crate) const EIP712_DOMAIN_FIELDS: [(&str, &str); 4] = [
    ("name", "string"),
    ("version", "string"),
    ("chainId", "uint256"),
    ("verifyingContract", "address"),
];

/// EIP-712 domain.
///
/// All four fields are always present, so the domain type never changes shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    #[serde(deserialize_with = "chain_id_from_json")]
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Domain {
    /// Creates a new domain.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract,
        }
    }

    /// Computes the domain separator.
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(keccak256(EIP712_DOMAIN_TYPE).as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(B256::left_padding_from(self.verifying_contract.as_slice()).as_slice());
        keccak256(&buf)
    }
}

/// Accepts a chain id as a JSON number, a decimal string or a `0x` hex string.
fn chain_id_from_json<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("chainId {n} is not a u64"))),
        serde_json::Value::String(s) => parse_chain_id(&s).map_err(de::Error::custom),
        other => Err(de::Error::custom(format!("invalid chainId: {other}"))),
    }
}

/// Parses a chain id written in decimal or as `0x`-prefixed hex.
pub fn parse_chain_id(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|err| format!("invalid chain id {s:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use alloy::{primitives::address, sol_types::eip712_domain};
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_ether_mail_separator() {
        let domain = Domain::new(
            "Ether Mail",
            "1",
            1,
            address!("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"),
        );
        assert_eq!(
            domain.separator(),
            B256::from(hex!(
                "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
            ))
        );
    }

    #[test]
    fn test_separator_matches_alloy() {
        let domain = Domain::new("HyperliquidSignTransaction", "1", 0x66eee, Address::ZERO);
        let reference = eip712_domain! {
            name: "HyperliquidSignTransaction",
            version: "1",
            chain_id: 0x66eee,
            verifying_contract: Address::ZERO,
        };
        assert_eq!(domain.separator(), reference.separator());
    }

    #[test]
    fn test_chain_id_forms() {
        let from_number: Domain = serde_json::from_str(
            r#"{"name":"a","version":"1","chainId":42161,"verifyingContract":"0x0000000000000000000000000000000000000000"}"#,
        )
        .unwrap();
        let from_hex: Domain = serde_json::from_str(
            r#"{"name":"a","version":"1","chainId":"0xa4b1","verifyingContract":"0x0000000000000000000000000000000000000000"}"#,
        )
        .unwrap();
        assert_eq!(from_number.chain_id, 42161);
        assert_eq!(from_number, from_hex);
        assert_eq!(parse_chain_id("0x66eee"), Ok(421614));
        assert!(parse_chain_id("0xzz").is_err());
    }
}
