use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_envelope::config::Config;
use chat_envelope::envelope::MessageEnvelope;
use chat_envelope::relay::{RelayService, RelaySettings, Sequenced};

#[derive(Debug, Parser)]
#[command(name = "chat-envelope", version, about = "Build, encode and relay chat envelopes")]
struct Cli {
    /// Path to the config file (defaults to ~/.config/chat-envelope/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the wire frame for one envelope
    Encode {
        /// CHAT, JOIN or LEAVE
        #[arg(long, default_value = "CHAT")]
        kind: String,
        #[arg(long, default_value = "")]
        content: String,
        /// Defaults to the configured username
        #[arg(long)]
        sender: Option<String>,
    },
    /// Decode one frame per line from stdin
    Decode,
    /// Run a local relay with two participants
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    let config = Config::load_or_create(&config_path)?;

    match cli.command {
        Command::Encode {
            kind,
            content,
            sender,
        } => {
            let sender = sender.unwrap_or_else(|| config.username.clone());
            let envelope = MessageEnvelope::from_parts(&kind, content, sender)?;
            let frame = String::from_utf8(envelope.encode()).context("Encoded frame is not UTF-8")?;
            println!("{frame}");
        }
        Command::Decode => {
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            let dropped = decode_lines(stdin.lock(), &mut stdout)?;
            if dropped > 0 {
                warn!("Dropped {} malformed frame(s)", dropped);
            }
        }
        Command::Demo => run_demo(&config).await?,
    }

    Ok(())
}

/// Decode each non-blank line as a frame, writing the rendered envelope.
/// Returns the number of malformed lines, which are skipped.
fn decode_lines(input: impl BufRead, output: &mut impl Write) -> Result<usize> {
    let mut dropped = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match MessageEnvelope::decode(line.as_bytes()) {
            Ok(envelope) => writeln!(output, "[{}] {}", envelope.kind(), envelope)?,
            Err(e) => {
                warn!("Line {}: {}", index + 1, e);
                dropped += 1;
            }
        }
    }
    Ok(dropped)
}

async fn run_demo(config: &Config) -> Result<()> {
    let mut service = RelayService::new(RelaySettings::from(config));
    service.initialize_channels();
    let mut deliveries = service.subscribe()?;

    let alice = service.join("alice").await?;
    let bob = service.join("bob").await?;
    info!("Joined {} and {}", alice, bob);

    service.send_envelope(&alice, &MessageEnvelope::chat("alice", "hello bob")?)?;
    service.send_frame(&bob, br#"{"type":"CHAT","content":"lost"}"#.to_vec())?;
    service.send_envelope(&bob, &MessageEnvelope::chat("bob", "hi alice")?)?;
    service.leave(&bob)?;
    service.leave(&alice)?;

    service.shutdown()?;

    // Two joins, two chats, two leaves; the malformed frame is dropped.
    let mut out = io::stdout();
    let printed = print_deliveries(&mut deliveries, &mut out).await?;
    info!("Relay delivered {} envelope(s)", printed);

    while let Some(event) = service.next_event().await {
        tracing::debug!("Relay event: {:?}", event);
    }
    Ok(())
}

/// Print deliveries until the relay closes the subscription.
async fn print_deliveries(
    deliveries: &mut mpsc::UnboundedReceiver<Sequenced>,
    output: &mut impl Write,
) -> Result<usize> {
    let mut printed = 0;
    while let Some(sequenced) = deliveries.recv().await {
        writeln!(output, "{sequenced}")?;
        printed += 1;
    }
    Ok(printed)
}
