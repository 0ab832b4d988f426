use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use deploy_auth::{SigningKeyPair, UploadResponse};
use deploy_client::{DeployClient, UploadSigner, parse_server_url};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[clap(version, about = "Uploads Ed25519-signed files to a deploy receiver")]
struct Cli {
    /// Receiver base URL.
    #[clap(long, short, env = "DEPLOY_SERVER", default_value = "http://127.0.0.1:8022", global = true)]
    server: String,
    /// Hex-encoded Ed25519 private key.
    #[clap(long, short, env = "DEPLOY_PRIVATE_KEY", hide_env_values = true, global = true)]
    key: Option<String>,
    /// Per-request timeout; defaults to 60s plus 1s per MiB.
    #[clap(long, global = true)]
    timeout_secs: Option<u64>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one file under its base name.
    Upload {
        file: PathBuf,
        path_key: String,
        /// Have the receiver unpack the archive after storing it.
        #[clap(long, short)]
        extract: bool,
    },
    /// Upload every file below a directory, keeping relative paths.
    UploadDir { dir: PathBuf, path_key: String },
    /// Check that the receiver is up.
    Health,
    /// Print the receiver's service info.
    Info,
    /// Generate a new key pair.
    Keygen,
    /// Print the public key for the configured private key.
    Pubkey,
    /// Sign an arbitrary message and print the hex signature.
    Sign { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    match cli.command {
        Command::Keygen => {
            let pair = SigningKeyPair::generate();
            println!("Public key (receiver security.public_key):");
            println!("{}", pair.public_key_hex());
            println!();
            println!("Private key (DEPLOY_PRIVATE_KEY):");
            println!("{}", pair.private_key_hex());
        }
        Command::Pubkey => {
            let signer = UploadSigner::from_private_key(cli.key.as_deref())?;
            println!("{}", signer.public_key_hex());
        }
        Command::Sign { message } => {
            let signer = UploadSigner::from_private_key(cli.key.as_deref())?;
            println!("{}", signer.sign_message(message.as_bytes()));
        }
        Command::Health => {
            let client = DeployClient::new(parse_server_url(&cli.server)?)?;
            client.health().await?;
            println!("{} is healthy", client.base_url());
        }
        Command::Info => {
            let client = DeployClient::new(parse_server_url(&cli.server)?)?;
            println!("{}", serde_json::to_string_pretty(&client.info().await?)?);
        }
        Command::Upload {
            file,
            path_key,
            extract,
        } => {
            let client = signing_client(&cli.server, cli.key.as_deref(), cli.timeout_secs)?;
            let response = client.upload_file(&file, &path_key, extract).await?;
            print_response(&response);
        }
        Command::UploadDir { dir, path_key } => {
            let client = signing_client(&cli.server, cli.key.as_deref(), cli.timeout_secs)?;
            let responses = client.upload_dir(&dir, &path_key).await?;
            for response in &responses {
                print_response(response);
            }
            println!("{} files uploaded", responses.len());
        }
    }

    Ok(())
}

/// Key problems surface here, before anything touches the network.
fn signing_client(server: &str, key: Option<&str>, timeout_secs: Option<u64>) -> Result<DeployClient> {
    let signer = UploadSigner::from_private_key(key)?;
    let mut client = DeployClient::new(parse_server_url(server)?)?.with_signer(signer);
    if let Some(secs) = timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }
    Ok(client)
}

fn print_response(response: &UploadResponse) {
    println!("{} ({} bytes)", response.path, response.size);
    if let Some(dir) = response.extract_dir.as_deref().filter(|_| response.extracted) {
        println!("  extracted to {dir}");
    }
}
