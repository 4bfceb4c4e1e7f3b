//! Signing and local verification.
//!
//! Every signature produced here can be checked with [`verify_matches`]
//! before it leaves the process. Signing is deterministic (RFC 6979), so the
//! same key and digest always produce the same signature.

use std::fmt;

use alloy::{
    primitives::{self, Address, B256, U256, keccak256},
    signers::{SignerSync, local::PrivateKeySigner},
};
use serde::{Deserialize, Serialize};

use crate::{
    eip712::TypedData,
    error::{Error, Result},
};

/// Prefix of EIP-191 personal messages.
const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n";

/// A private key and the address derived from it.
///
/// The key never leaves the process: it is not serializable and its
/// `Debug` output only shows the address.
#[derive(Clone)]
pub struct KeyPair {
    signer: PrivateKeySigner,
}

impl KeyPair {
    /// Loads a key from 32 bytes of hex, with or without `0x`.
    pub fn from_hex(key: &str) -> Result<Self> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let bytes = const_hex::decode(key)
            .map_err(|err| Error::InvalidKey(format!("not hex: {err}")))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|bytes: Vec<u8>| Error::InvalidKey(format!("expected 32 bytes, got {}", bytes.len())))?;
        Self::from_bytes(&B256::from(bytes))
    }

    /// Loads a key from its raw scalar. The scalar must lie in `[1, n-1]`.
    pub fn from_bytes(bytes: &B256) -> Result<Self> {
        let signer = PrivateKeySigner::from_bytes(bytes)
            .map_err(|_| Error::InvalidKey("not a valid secp256k1 scalar".into()))?;
        Ok(Self { signer })
    }

    /// Generates a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: PrivateKeySigner::random(),
        }
    }

    /// The address derived from this key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// ECDSA signature with `v` in 27/28 form.
///
/// Serializes as `{"r": "0x…", "s": "0x…", "v": 27}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
    pub v: u8,
}

impl Signature {
    /// 65 bytes `r ‖ s ‖ v`.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        out[64] = self.v;
        out
    }

    fn y_parity(&self) -> Result<bool> {
        match self.v {
            0 | 27 => Ok(false),
            1 | 28 => Ok(true),
            v => Err(Error::InvalidSignature(format!("unexpected v = {v}"))),
        }
    }
}

impl From<primitives::Signature> for Signature {
    fn from(sig: primitives::Signature) -> Self {
        Self {
            r: sig.r(),
            s: sig.s(),
            v: 27 + sig.v() as u8,
        }
    }
}

impl TryFrom<Signature> for primitives::Signature {
    type Error = Error;

    fn try_from(sig: Signature) -> Result<Self> {
        Ok(primitives::Signature::new(sig.r, sig.s, sig.y_parity()?))
    }
}

impl fmt::Display for Signature {
    /// `0x`-prefixed 65-byte hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&const_hex::encode_prefixed(self.to_bytes()))
    }
}

/// Signs a 32-byte digest.
pub fn sign_digest(key: &KeyPair, digest: &B256) -> Result<Signature> {
    let sig = key.signer.sign_hash_sync(digest)?;
    Ok(sig.into())
}

/// EIP-191 digest of a personal message.
pub fn personal_message_hash(message: &[u8]) -> B256 {
    let len = message.len().to_string();
    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + len.len() + message.len());
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(len.as_bytes());
    buf.extend_from_slice(message);
    keccak256(&buf)
}

/// Signs a personal message.
pub fn sign_personal_message(key: &KeyPair, message: &[u8]) -> Result<Signature> {
    sign_digest(key, &personal_message_hash(message))
}

/// Recovers the address that produced `signature` over `digest`.
pub fn recover_address(digest: &B256, signature: &Signature) -> Result<Address> {
    let sig = primitives::Signature::try_from(*signature)?;
    let key = sig
        .recover_from_prehash(digest)
        .map_err(|err| Error::InvalidSignature(err.to_string()))?;
    // keccak256 of the uncompressed point, last 20 bytes.
    Ok(Address::from_public_key(&key))
}

/// Fails unless `signature` over `digest` recovers to `expected`.
pub fn verify_matches(digest: &B256, signature: &Signature, expected: Address) -> Result<()> {
    let recovered = recover_address(digest, signature)?;
    if recovered != expected {
        return Err(Error::RecoveryMismatch {
            expected,
            recovered,
        });
    }
    Ok(())
}

/// Signs `digest` and checks the result recovers to the key's address.
pub fn sign_verified(key: &KeyPair, digest: &B256) -> Result<Signature> {
    let signature = sign_digest(key, digest)?;
    verify_matches(digest, &signature, key.address())?;
    log::debug!("signed {digest} as {}", key.address());
    Ok(signature)
}

/// What a generic authenticated request signs.
#[derive(Debug, Clone)]
pub enum AuthMessage {
    /// EIP-191 personal message.
    Personal(String),
    /// EIP-712 typed-data document.
    TypedData(Box<TypedData>),
}

impl AuthMessage {
    /// The digest this message is signed over.
    pub fn digest(&self) -> Result<B256> {
        match self {
            AuthMessage::Personal(message) => Ok(personal_message_hash(message.as_bytes())),
            AuthMessage::TypedData(doc) => doc.signing_hash(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256, eip191_hash_message};
    use hex_literal::hex;

    use super::*;
    use crate::eip712::TypedData;

    // keccak256("cow"), the key used by the EIP-712 reference example.
    const COW_KEY: &str = "c85ef7d79691fe79573b1a7064c19c1a9819ebdbd1faaab1a8ec92344438aaf4";

    fn cow() -> KeyPair {
        KeyPair::from_hex(COW_KEY).unwrap()
    }

    #[test]
    fn test_key_address() {
        assert_eq!(
            cow().address(),
            address!("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826")
        );
        assert_eq!(
            KeyPair::from_hex(&format!("0x{COW_KEY}")).unwrap().address(),
            cow().address()
        );
    }

    #[test]
    fn test_invalid_keys() {
        for key in [
            "",
            "zz",
            "0x1234",
            "0000000000000000000000000000000000000000000000000000000000000000",
            // the curve order n
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141",
        ] {
            assert!(
                matches!(KeyPair::from_hex(key), Err(Error::InvalidKey(_))),
                "{key:?} should be rejected"
            );
        }
        // n - 1 is the largest valid scalar
        KeyPair::from_hex("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140").unwrap();
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", cow());
        assert!(!debug.to_lowercase().contains(COW_KEY));
        assert!(debug.contains("address"));
    }

    #[test]
    fn test_ether_mail_signature() {
        let doc = TypedData::from_json_str(
            r#"{
                "types": {
                    "Person": [
                        {"name": "name", "type": "string"},
                        {"name": "wallet", "type": "address"}
                    ],
                    "Mail": [
                        {"name": "from", "type": "Person"},
                        {"name": "to", "type": "Person"},
                        {"name": "contents", "type": "string"}
                    ]
                },
                "primaryType": "Mail",
                "domain": {
                    "name": "Ether Mail",
                    "version": "1",
                    "chainId": 1,
                    "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
                },
                "message": {
                    "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
                    "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
                    "contents": "Hello, Bob!"
                }
            }"#,
        )
        .unwrap();
        let digest = doc.signing_hash().unwrap();
        let sig = sign_digest(&cow(), &digest).unwrap();

        assert_eq!(sig.v, 28);
        assert_eq!(
            sig.r,
            U256::from_be_bytes(hex!(
                "4355c47d63924e8a72e509b65029052eb6c299d53a04e167c5775fd466751c9d"
            ))
        );
        assert_eq!(
            sig.s,
            U256::from_be_bytes(hex!(
                "07299936d304c153f6443dfa05f40ff007d72911b6f72307f996231605b91562"
            ))
        );
    }

    #[test]
    fn test_deterministic_signatures() {
        let key = KeyPair::random();
        let digest = keccak256(b"same digest");
        assert_eq!(
            sign_digest(&key, &digest).unwrap(),
            sign_digest(&key, &digest).unwrap()
        );
    }

    #[test]
    fn test_round_trip_recovery() {
        for i in 0u8..8 {
            let key = KeyPair::random();
            let digest = keccak256([i]);
            let sig = sign_digest(&key, &digest).unwrap();
            assert!(sig.v == 27 || sig.v == 28);
            assert_eq!(recover_address(&digest, &sig).unwrap(), key.address());
            verify_matches(&digest, &sig, key.address()).unwrap();
        }
    }

    #[test]
    fn test_recovery_matches_alloy() {
        let digest = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
        let sig = sign_digest(&cow(), &digest).unwrap();
        let alloy_sig = primitives::Signature::try_from(sig).unwrap();
        assert_eq!(
            recover_address(&digest, &sig).unwrap(),
            alloy_sig.recover_address_from_prehash(&digest).unwrap()
        );
    }

    #[test]
    fn test_mismatch_detected() {
        let key = cow();
        let digest = keccak256(b"payload");
        let sig = sign_digest(&key, &digest).unwrap();
        let other = KeyPair::random().address();
        let err = verify_matches(&digest, &sig, other).unwrap_err();
        assert!(matches!(
            err,
            Error::RecoveryMismatch { expected, recovered }
                if expected == other && recovered == key.address()
        ));

        // A signature over a different digest recovers to someone else.
        let err = verify_matches(&keccak256(b"tampered"), &sig, key.address()).unwrap_err();
        assert!(matches!(err, Error::RecoveryMismatch { .. }));
    }

    #[test]
    fn test_bad_v_rejected() {
        let digest = keccak256(b"v");
        let mut sig = sign_digest(&cow(), &digest).unwrap();
        sig.v = 35;
        assert!(matches!(
            recover_address(&digest, &sig),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_personal_message_hash() {
        for message in [&b""[..], &b"hello"[..], "é ☃".as_bytes()] {
            assert_eq!(personal_message_hash(message), eip191_hash_message(message));
        }
    }

    #[test]
    fn test_personal_message_round_trip() {
        let key = KeyPair::random();
        let long = "x".repeat(4096);
        for message in ["", "hello", long.as_str()] {
            let sig = sign_personal_message(&key, message.as_bytes()).unwrap();
            let digest = personal_message_hash(message.as_bytes());
            assert_eq!(recover_address(&digest, &sig).unwrap(), key.address());
        }
    }

    #[test]
    fn test_signature_wire_forms() {
        let sig = Signature {
            r: U256::from(0x1234u64),
            s: U256::from(0xabcdu64),
            v: 27,
        };
        assert_eq!(
            serde_json::to_value(sig).unwrap(),
            serde_json::json!({"r": "0x1234", "s": "0xabcd", "v": 27})
        );
        let hex = sig.to_string();
        assert_eq!(hex.len(), 2 + 130);
        assert!(hex.starts_with("0x"));
        assert!(hex.ends_with("1b"));

        // A `v` that does not fit the trailing byte is refused, not truncated.
        assert!(
            serde_json::from_value::<Signature>(serde_json::json!({"r": "0x1", "s": "0x2", "v": 283}))
                .is_err()
        );
    }

    #[test]
    fn test_sign_verified() {
        let key = cow();
        let digest = keccak256(b"verified");
        let sig = sign_verified(&key, &digest).unwrap();
        assert_eq!(sig, sign_digest(&key, &digest).unwrap());
    }
}
