use std::io::{self, Write};

use altnode_address::{
    address_from_pubkey, decode_address, network_for_secret, AddressType, Network,
};
use altnode_crypto::ec::COMPACT_SIGNATURE_LEN;
use altnode_crypto::{Curve, MessageSigner, PrivateKey, PublicKey};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "altnode-key",
    about = "Generate and inspect altnode keys, sign and verify messages"
)]
struct Cli {
    /// Network whose version bytes and message magic to use
    #[arg(long = "network", global = true, default_value = "mainnet")]
    network: Network,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh private key
    Generate {
        /// Use the uncompressed public key form
        #[arg(long = "uncompressed", default_value_t = false)]
        uncompressed: bool,
    },
    /// Show the public key and address of a WIF private key
    Inspect {
        /// Private key in wallet import format
        wif: String,
    },
    /// Show encodings, key ID and address of a hex public key
    Pubkey {
        /// SEC1 public key (33 or 65 bytes, hex)
        hex: String,
    },
    /// Sign a message with a WIF private key
    SignMessage {
        #[arg(long = "wif")]
        wif: String,
        message: String,
    },
    /// Check a message signature against an address
    VerifyMessage {
        #[arg(long = "address")]
        address: String,
        /// 65-byte compact signature (hex)
        #[arg(long = "signature")]
        signature: String,
        message: String,
    },
}

/// Install a stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn parse_wif(wif: &str) -> Result<(PrivateKey, Network)> {
    let key: PrivateKey = wif.trim().parse().context("invalid WIF private key")?;
    let network = network_for_secret(key.version()).with_context(|| {
        format!(
            "WIF version {} does not belong to a known network",
            key.version()
        )
    })?;
    Ok((key, network))
}

fn parse_signature(hex_sig: &str) -> Result<[u8; COMPACT_SIGNATURE_LEN]> {
    let bytes = hex::decode(hex_sig.trim()).context("signature is not valid hex")?;
    bytes.as_slice().try_into().map_err(|_| {
        anyhow::anyhow!(
            "signature must be {COMPACT_SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )
    })
}

fn print_key(out: &mut impl Write, key: &PrivateKey, network: Network) -> Result<()> {
    let public = key.public_key();
    writeln!(out, "Network:    {network}")?;
    writeln!(out, "WIF:        {}", key.to_wif())?;
    writeln!(out, "Compressed: {}", key.is_compressed())?;
    writeln!(out, "Public key: {}", hex::encode(public.serialize()))?;
    writeln!(out, "Key ID:     {}", public.id())?;
    writeln!(out, "Address:    {}", address_from_pubkey(public, network))?;
    Ok(())
}

fn cmd_generate(out: &mut impl Write, network: Network, uncompressed: bool) -> Result<()> {
    let key = PrivateKey::generate(
        Curve::secp256k1(),
        !uncompressed,
        network.params().secret_key,
    )
    .context("key generation failed")?;
    print_key(out, &key, network)
}

fn cmd_inspect(out: &mut impl Write, wif: &str) -> Result<()> {
    let (key, network) = parse_wif(wif)?;
    print_key(out, &key, network)
}

fn cmd_pubkey(out: &mut impl Write, network: Network, hex_key: &str) -> Result<()> {
    let bytes = hex::decode(hex_key.trim()).context("public key is not valid hex")?;
    let key = PublicKey::from_binary(&bytes).context("invalid public key")?;
    writeln!(out, "Compressed:   {}", hex::encode(key.to_binary(true)))?;
    writeln!(out, "Uncompressed: {}", hex::encode(key.to_binary(false)))?;
    writeln!(out, "Key ID:       {}", key.id())?;
    writeln!(out, "Address:      {}", address_from_pubkey(&key, network))?;
    Ok(())
}

fn cmd_sign_message(out: &mut impl Write, wif: &str, message: &str) -> Result<()> {
    let (key, network) = parse_wif(wif)?;
    let signer = MessageSigner::new(network.params().message_magic);
    let signature = signer
        .sign(&key, message.as_bytes())
        .context("signing failed")?;
    debug!(%network, address = %address_from_pubkey(key.public_key(), network), "signed message");
    writeln!(out, "{}", hex::encode(signature))?;
    Ok(())
}

fn cmd_verify_message(
    out: &mut impl Write,
    address: &str,
    signature: &str,
    message: &str,
) -> Result<()> {
    let address = decode_address(address.trim()).context("invalid address")?;
    if address.kind != AddressType::P2PKH {
        bail!("{address} is not a pay-to-pubkey-hash address");
    }
    let signature = parse_signature(signature)?;
    let signer = MessageSigner::new(address.network.params().message_magic);

    if !signer
        .verify_id(&address.hash, message.as_bytes(), &signature)
        .context("malformed signature")?
    {
        bail!("signature does not match {address}");
    }
    writeln!(out, "Signature valid for {address}")?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Command::Generate { uncompressed } => cmd_generate(&mut out, cli.network, uncompressed),
        Command::Inspect { wif } => cmd_inspect(&mut out, &wif),
        Command::Pubkey { hex } => cmd_pubkey(&mut out, cli.network, &hex),
        Command::SignMessage { wif, message } => cmd_sign_message(&mut out, &wif, &message),
        Command::VerifyMessage {
            address,
            signature,
            message,
        } => cmd_verify_message(&mut out, &address, &signature, &message),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIF_ONE: &str = "XBHddvWWiMu3nZhhpTXBQWJMmdz5JNKJD85b9fgKAckCT2coW3Y4";
    const ADDRESS_ONE: &str = "XmN7PQYWKn5MJFna5fRYgP6mxT2F7xpekE";

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cli_parses_global_flags() {
        let cli = Cli::try_parse_from([
            "altnode-key",
            "generate",
            "--uncompressed",
            "--network",
            "testnet",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.network, Network::Testnet);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Generate { uncompressed: true }
        ));

        assert!(Cli::try_parse_from(["altnode-key", "--network", "regtest", "generate"]).is_err());
    }

    #[test]
    fn test_inspect_known_key() {
        let text = output(|out| cmd_inspect(out, WIF_ONE));
        assert!(text.contains("Network:    mainnet"));
        assert!(text.contains(ADDRESS_ONE));
        assert!(text.contains("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"));
    }

    #[test]
    fn test_inspect_rejects_foreign_version() {
        // Bitcoin mainnet WIF for scalar 1.
        let mut out = Vec::new();
        let err = cmd_inspect(
            &mut out,
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn",
        )
        .unwrap_err();
        assert!(err.to_string().contains("known network"));
    }

    #[test]
    fn test_generate_then_inspect() {
        let text = output(|out| cmd_generate(out, Network::Testnet, false));
        let wif = text
            .lines()
            .find_map(|l| l.strip_prefix("WIF:"))
            .unwrap()
            .trim()
            .to_string();
        let inspected = output(|out| cmd_inspect(out, &wif));
        assert_eq!(text, inspected);
        assert!(inspected.contains("Network:    testnet"));
    }

    #[test]
    fn test_pubkey_output() {
        let text = output(|out| {
            cmd_pubkey(
                out,
                Network::Mainnet,
                "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
            )
        });
        assert!(text.contains("Key ID:       d63b43f123a3b3d1451c9454d4969119e8761e75"));
        assert!(text.contains(ADDRESS_ONE));
        assert!(text.contains("Uncompressed: 0479be667e"));
    }

    #[test]
    fn test_sign_verify_message() {
        let signature = output(|out| cmd_sign_message(out, WIF_ONE, "hello"));
        let signature = signature.trim();
        assert_eq!(signature.len(), 2 * COMPACT_SIGNATURE_LEN);

        let text = output(|out| cmd_verify_message(out, ADDRESS_ONE, signature, "hello"));
        assert!(text.contains("Signature valid"));

        let mut out = Vec::new();
        assert!(cmd_verify_message(&mut out, ADDRESS_ONE, signature, "goodbye").is_err());
    }

    #[test]
    fn test_parse_signature_length() {
        assert!(parse_signature(&"00".repeat(64)).is_err());
        assert!(parse_signature("zz").is_err());
        assert!(parse_signature(&"1f".repeat(65)).is_ok());
    }
}
