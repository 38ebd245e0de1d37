//! Network parameters and base58check addresses.

#![forbid(unsafe_code)]

pub mod network;
pub mod p2pkh;

pub use network::{
    classify_version, network_for_secret, version_byte, AddressType, Network, NetworkParams,
    MESSAGE_MAGIC,
};
pub use p2pkh::{
    address_from_pubkey, decode_address, encode_p2pkh, encode_p2sh, Address, ADDRESS_PAYLOAD_LEN,
};
