// courier - command-line front end for airgap-courier
//
// Sends a message as packet files into a drop directory and reassembles
// messages from one.

use airgap_courier::config::CourierConfig;
use airgap_courier::protocol::send::prepare_send;
use airgap_courier::transport::drop_dir;
use airgap_courier::utils::logging::init_logging;
use airgap_courier::{MessageSigner, ReceiverKey, Result, SenderKey, Verification};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Signed message chunking across air gaps", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults and AIRGAP_COURIER_* variables otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an Ed25519 key pair
    Keygen {
        /// Directory for `private_key` and `public_key`
        #[arg(long, default_value = "config")]
        out: PathBuf,
    },
    /// Split a message into packet files
    Send {
        message: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        max_packet_size: Option<usize>,
        /// Private key file
        #[arg(long)]
        key: Option<PathBuf>,
        /// Send without a signature
        #[arg(long, conflicts_with = "key")]
        unsigned: bool,
        /// Print the send bundle as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reassemble messages from packet files
    Receive {
        #[arg(long)]
        in_dir: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Only read files with this extension
        #[arg(long)]
        ext: Option<String>,
        /// Public key file
        #[arg(long)]
        public_key: Option<PathBuf>,
        /// Accept unsigned messages
        #[arg(long, conflicts_with = "public_key")]
        unsigned: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "courier failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => CourierConfig::from_file(path)?,
        None => CourierConfig::from_env()?,
    };

    init_logging(&config.logging)?;
    for problem in config.validate() {
        warn!(%problem, "Configuration check");
    }

    match cli.command {
        Commands::Keygen { out } => {
            let key = SenderKey::generate()?;
            std::fs::create_dir_all(&out)?;
            key.save(out.join("private_key"))?;
            key.receiver_key().save(out.join("public_key"))?;
            println!("{}", key.receiver_key().to_hex());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Send {
            message,
            out_dir,
            max_packet_size,
            key,
            unsigned,
            json,
        } => {
            let max_packet_size = max_packet_size.unwrap_or(config.sender.max_packet_size);
            let out_dir = out_dir.unwrap_or(config.sender.outbox_dir);

            let signer = if unsigned || config.sender.allow_unsigned {
                warn!("Sending unsigned message");
                None
            } else {
                Some(SenderKey::load(
                    key.unwrap_or(config.keys.private_key_path),
                )?)
            };

            let (message, packets, bundle) = prepare_send(
                &message,
                signer.as_ref().map(|k| k as &dyn MessageSigner),
                max_packet_size,
            )?;
            let paths = drop_dir::write_packets(&out_dir, &packets).await?;
            info!(
                fingerprint = %message.fingerprint(),
                files = paths.len(),
                dir = %out_dir.display(),
                "Message sent"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                println!("{}", message.fingerprint());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Receive {
            in_dir,
            out_dir,
            ext,
            public_key,
            unsigned,
        } => {
            let in_dir = in_dir.unwrap_or(config.receiver.inbox_dir);
            let out_dir = out_dir.unwrap_or(config.receiver.output_dir);
            let ext = ext.unwrap_or(config.receiver.file_extension);

            let verification = if unsigned || config.receiver.allow_unsigned {
                warn!("Accepting unsigned messages");
                Verification::AllowUnsigned
            } else {
                Verification::required(ReceiverKey::load(
                    public_key.unwrap_or(config.keys.public_key_path),
                )?)
            };

            let report = drop_dir::receive_from_dir(&in_dir, &ext, &out_dir, verification).await?;

            for message in &report.completed {
                println!("complete   {}", message.fingerprint());
            }
            for progress in &report.incomplete {
                println!(
                    "incomplete {} ({}/{})",
                    progress.fingerprint, progress.received, progress.expected
                );
            }
            for (fingerprint, e) in &report.failed {
                println!("failed     {fingerprint}: {e}");
            }

            Ok(if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
