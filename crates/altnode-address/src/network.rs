//! Network parameters: base58 version bytes and the message magic.
//!
//! Each network assigns a version byte to every kind of base58check
//! payload, so the version alone identifies both network and kind.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use altnode_core::Error;

/// Prefix hashed in front of every signed message.
pub const MESSAGE_MAGIC: &str = "DarkCoin Signed Message:\n";

/// Network type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    /// Addresses start with 'X'.
    Mainnet,
    /// Addresses start with 'y'.
    Testnet,
}

/// Version bytes and magic for one network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    pub pubkey_address: u8,
    pub script_address: u8,
    pub secret_key: u8,
    pub message_magic: &'static str,
}

const MAINNET: NetworkParams = NetworkParams {
    pubkey_address: 76,
    script_address: 16,
    secret_key: 204,
    message_magic: MESSAGE_MAGIC,
};

const TESTNET: NetworkParams = NetworkParams {
    pubkey_address: 140,
    script_address: 19,
    secret_key: 239,
    message_magic: MESSAGE_MAGIC,
};

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub const fn params(self) -> &'static NetworkParams {
        match self {
            Self::Mainnet => &MAINNET,
            Self::Testnet => &TESTNET,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Self::Mainnet),
            "testnet" | "test" => Ok(Self::Testnet),
            other => Err(Error::Decode(format!("unknown network {other:?}"))),
        }
    }
}

/// Address types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressType {
    /// Pay-to-Public-Key-Hash (P2PKH)
    P2PKH,
    /// Pay-to-Script-Hash (P2SH)
    P2SH,
}

/// Version byte for an address of `kind` on `network`.
pub const fn version_byte(network: Network, kind: AddressType) -> u8 {
    let params = network.params();
    match kind {
        AddressType::P2PKH => params.pubkey_address,
        AddressType::P2SH => params.script_address,
    }
}

/// Network and kind an address version byte belongs to.
pub fn classify_version(version: u8) -> Option<(Network, AddressType)> {
    Network::ALL.into_iter().find_map(|network| {
        [AddressType::P2PKH, AddressType::P2SH]
            .into_iter()
            .find(|&kind| version_byte(network, kind) == version)
            .map(|kind| (network, kind))
    })
}

/// Network whose WIF version byte is `version`.
pub fn network_for_secret(version: u8) -> Option<Network> {
    Network::ALL
        .into_iter()
        .find(|n| n.params().secret_key == version)
}
