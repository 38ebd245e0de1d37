//! Base58check address encoding.
//!
//! Address format:
//! - Version byte: per network and address type (1 byte)
//! - Content: hash160 of the public key or script (20 bytes)
//! - Checksum: sha256d(version || content)[0:4] (4 bytes)
//! - Encoded: Base58(version || content || checksum)

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use altnode_core::{Error, Result};
use altnode_crypto::hash::HASH160_LEN;
use altnode_crypto::{base58, KeyId, PublicKey};

use crate::network::{classify_version, version_byte, AddressType, Network};

/// Address payload length before the checksum: version + hash160.
pub const ADDRESS_PAYLOAD_LEN: usize = 1 + HASH160_LEN;

/// A decoded address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    pub network: Network,
    pub kind: AddressType,
    pub hash: KeyId,
}

impl Address {
    pub fn new(network: Network, kind: AddressType, hash: KeyId) -> Self {
        Self {
            network,
            kind,
            hash,
        }
    }

    pub fn encode(&self) -> String {
        let mut payload = [0u8; ADDRESS_PAYLOAD_LEN];
        payload[0] = version_byte(self.network, self.kind);
        payload[1..].copy_from_slice(self.hash.as_bytes());
        base58::encode_check(&payload)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_address(s)
    }
}

/// Encode a key ID as a pay-to-pubkey-hash address.
pub fn encode_p2pkh(id: &KeyId, network: Network) -> String {
    Address::new(network, AddressType::P2PKH, *id).encode()
}

/// Encode a script hash as a pay-to-script-hash address.
pub fn encode_p2sh(script_hash: &KeyId, network: Network) -> String {
    Address::new(network, AddressType::P2SH, *script_hash).encode()
}

/// P2PKH address of `pubkey` in its own compression form.
pub fn address_from_pubkey(pubkey: &PublicKey, network: Network) -> String {
    let payload = pubkey.address_payload(version_byte(network, AddressType::P2PKH));
    base58::encode_check(&payload)
}

/// Decode and classify a base58check address.
pub fn decode_address(s: &str) -> Result<Address> {
    let payload = base58::decode_check(s)?;
    if payload.len() != ADDRESS_PAYLOAD_LEN {
        return Err(Error::Length {
            expected: ADDRESS_PAYLOAD_LEN,
            got: payload.len(),
        });
    }
    let (network, kind) = classify_version(payload[0])
        .ok_or_else(|| Error::Decode(format!("unknown address version {}", payload[0])))?;

    let mut hash = [0u8; HASH160_LEN];
    hash.copy_from_slice(&payload[1..]);
    Ok(Address::new(network, kind, KeyId::from_bytes(hash)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use altnode_crypto::hash::sha256d;

    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn g() -> PublicKey {
        PublicKey::from_binary(&hex::decode(G_COMPRESSED).unwrap()).unwrap()
    }

    fn assert_valid(addr: &str, hash: &KeyId, version: u8) {
        let raw = bs58::decode(addr).into_vec().unwrap();
        assert_eq!(raw.len(), ADDRESS_PAYLOAD_LEN + 4);
        assert_eq!(raw[0], version);
        assert_eq!(&raw[1..21], hash.as_bytes());
        assert_eq!(&raw[21..], &sha256d(&raw[..21])[..4]);
    }

    #[test]
    fn test_known_mainnet_address() {
        let addr = address_from_pubkey(&g(), Network::Mainnet);
        assert_eq!(addr, "XmN7PQYWKn5MJFna5fRYgP6mxT2F7xpekE");
        assert_valid(&addr, &g().id(), 76);
    }

    #[test]
    fn test_known_testnet_address() {
        let addr = encode_p2pkh(&g().id(), Network::Testnet);
        assert_eq!(addr, "yWziQMcwmKjRdzi7eWjwiQX8EjWcd6dSg6");
        assert_valid(&addr, &g().id(), 140);
    }

    #[test]
    fn test_p2sh_structure() {
        let hash = KeyId::from_bytes([0x42; 20]);
        let addr = encode_p2sh(&hash, Network::Mainnet);
        assert_valid(&addr, &hash, 16);
        let decoded = decode_address(&addr).unwrap();
        assert_eq!(decoded.kind, AddressType::P2SH);
        assert_eq!(decoded.network, Network::Mainnet);
        assert_eq!(decoded.hash, hash);
    }

    #[test]
    fn test_decode_roundtrip() {
        let addr: Address = "XmN7PQYWKn5MJFna5fRYgP6mxT2F7xpekE".parse().unwrap();
        assert_eq!(addr.network, Network::Mainnet);
        assert_eq!(addr.kind, AddressType::P2PKH);
        assert_eq!(addr.hash, g().id());
        assert_eq!(addr.to_string(), "XmN7PQYWKn5MJFna5fRYgP6mxT2F7xpekE");
    }

    #[test]
    fn test_uncompressed_key_differs() {
        let mut key = g();
        key.set_compressed(false);
        assert_ne!(
            address_from_pubkey(&key, Network::Mainnet),
            address_from_pubkey(&g(), Network::Mainnet)
        );
    }

    #[test]
    fn test_decode_errors() {
        // Bitcoin mainnet version 0
        assert!(matches!(
            decode_address("1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH"),
            Err(Error::Decode(_))
        ));

        let short = base58::encode_check(&[76u8; 10]);
        assert_eq!(
            decode_address(&short),
            Err(Error::Length {
                expected: 21,
                got: 10
            })
        );

        let mut raw = bs58::decode("XmN7PQYWKn5MJFna5fRYgP6mxT2F7xpekE")
            .into_vec()
            .unwrap();
        raw[5] ^= 0x01;
        assert_eq!(
            decode_address(&bs58::encode(raw).into_string()),
            Err(Error::Checksum)
        );
    }
}
