use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use cli::{
    api::{ApiClient, ResolvedNumber, fill_number, payload_number},
    fallback::prefixes_from_env,
};
use utils::{document_number::DocumentKind, logging::init_tracing};

#[derive(Parser)]
#[command(name = "wms", about = "Warehouse document client", version)]
struct Cli {
    /// Base URL of the warehouse server
    #[arg(long, env = "WMS_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Bearer token sent with create requests
    #[arg(long, env = "WMS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the next document number for a kind
    NextNumber {
        /// adjustment, delivery, transfer or receipt (singular or plural)
        kind: String,
    },
    /// Create a document from a JSON payload, filling in its number
    Create {
        kind: String,
        /// Path to the JSON payload
        #[arg(long)]
        payload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.server, cli.token)?;
    let prefixes = prefixes_from_env().context("invalid WMS_PREFIX_* override")?;

    match cli.command {
        Command::NextNumber { kind } => {
            let kind: DocumentKind = kind.parse()?;
            let resolved = client.resolve_number(kind, &prefixes, Utc::now()).await;
            if let ResolvedNumber::Fallback { cause, .. } = &resolved {
                eprintln!("warning: server could not allocate a number ({cause}); using a fallback");
            }
            println!("{}", resolved.number());
        }
        Command::Create { kind, payload } => {
            let kind: DocumentKind = kind.parse()?;
            let raw = std::fs::read_to_string(&payload)
                .with_context(|| format!("failed to read {}", payload.display()))?;
            let mut body: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", payload.display()))?;

            if payload_number(&body, kind).is_none() {
                let resolved = client.resolve_number(kind, &prefixes, Utc::now()).await;
                if let ResolvedNumber::Fallback { cause, .. } = &resolved {
                    eprintln!(
                        "warning: server could not allocate a number ({cause}); using a fallback"
                    );
                }
                fill_number(&mut body, kind, resolved.number())?;
            }

            let created = client
                .create_document(kind, &body)
                .await
                .with_context(|| format!("failed to create {kind}"))?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
    }
    Ok(())
}
