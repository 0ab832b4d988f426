use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use deploy_auth::SigningKeyPair;
use deploy_receiver::{ReceiverConfig, run};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[clap(version, about = "Receives Ed25519-signed deploy uploads")]
struct Args {
    #[clap(long, env = "DEPLOY_RECEIVER_CONFIG", default_value = "config.json")]
    config: PathBuf,
    #[clap(long)]
    host: Option<String>,
    #[clap(long)]
    port: Option<u16>,
    /// Hex-encoded Ed25519 public key; overrides security.public_key.
    #[clap(long, env = "DEPLOY_PUBLIC_KEY")]
    public_key: Option<String>,
    /// Freshness window in seconds; overrides security.timestamp_limit.
    #[clap(long)]
    timestamp_limit: Option<u64>,
    /// Print a new key pair and exit.
    #[clap(long)]
    genkey: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if args.genkey {
        print_key_pair(&SigningKeyPair::generate());
        return Ok(());
    }

    let mut config = ReceiverConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(public_key) = args.public_key {
        config.security.public_key = public_key;
    }
    if let Some(limit) = args.timestamp_limit {
        config.security.timestamp_limit = limit;
    }

    run(config).await
}

fn print_key_pair(pair: &SigningKeyPair) {
    println!("Public key (put in the receiver config as security.public_key):");
    println!("{}", pair.public_key_hex());
    println!();
    println!("Private key (keep on the operator workstation only):");
    println!("{}", pair.private_key_hex());
}
