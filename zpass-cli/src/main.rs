//! Developer CLI for zPass.
//!
//! Reads programs and transactions from an explorer, checks issued
//! transactions and validates SDK options files.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use eyre::{Result, WrapErr};
use serde_json::json;
use zpass_core::{
    string_to_field, verify_on_chain, AleoNetworkClient, Network, NetworkClient, NetworkConfig,
    SdkOptions, VerifyOnChainRequest,
};

/// zPass developer CLI.
#[derive(Parser, Debug)]
#[command(name = "zpass", version, about)]
struct Cli {
    /// Explorer base URL, without the network segment.
    #[arg(long, env = "ZPASS_HOST", global = true)]
    host: Option<String>,

    /// Network the explorer endpoints are scoped to.
    #[arg(long, env = "ZPASS_NETWORK", default_value = "mainnet", global = true)]
    network: Network,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Allow plain http hosts, e.g. a local node.
    #[arg(long, global = true)]
    allow_insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the source of a deployed program.
    Program {
        /// Program id, e.g. `credits.aleo`.
        program_id: String,
    },
    /// Print the sources of every program a deployed program imports.
    Imports {
        /// Program id, e.g. `credits.aleo`.
        program_id: String,
    },
    /// Print a confirmed transaction.
    Transaction {
        /// Transaction id.
        transaction_id: String,
    },
    /// Check that a transaction is on the ledger and list its outputs.
    VerifyOnchain {
        /// Transaction id.
        transaction_id: String,
        /// Query this explorer instead of `--host`.
        #[arg(long)]
        url: Option<String>,
    },
    /// Encode a short string as a field element.
    Field {
        /// Text of at most 16 bytes, or a decimal number.
        value: String,
    },
    /// Validate an SDK options file.
    CheckOptions {
        /// Path to the options JSON.
        path: PathBuf,
    },
}

impl Cli {
    fn network_config(&self) -> NetworkConfig {
        let mut config = NetworkConfig {
            network: self.network,
            timeout: Duration::from_secs(self.timeout_secs),
            allow_insecure: self.allow_insecure,
            ..NetworkConfig::default()
        };
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        config
    }

    fn client(&self) -> Result<AleoNetworkClient> {
        AleoNetworkClient::new(&self.network_config()).wrap_err("invalid network settings")
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(network = %cli.network, "starting");

    match &cli.command {
        Command::Program { program_id } => {
            let source = cli
                .client()?
                .get_program(program_id)
                .await
                .wrap_err_with(|| format!("failed to fetch {program_id}"))?;
            println!("{source}");
        }
        Command::Imports { program_id } => {
            let imports = cli
                .client()?
                .get_program_imports(program_id)
                .await
                .wrap_err_with(|| format!("failed to resolve imports of {program_id}"))?;
            print_json(&imports)?;
        }
        Command::Transaction { transaction_id } => {
            let transaction = cli
                .client()?
                .get_transaction(transaction_id)
                .await
                .wrap_err_with(|| format!("failed to fetch {transaction_id}"))?;
            print_json(&transaction)?;
        }
        Command::VerifyOnchain {
            transaction_id,
            url,
        } => {
            let mut request = VerifyOnChainRequest::new(transaction_id.as_str());
            if let Some(url) = url {
                request = request.with_url(url.as_str());
            }
            let verification = verify_on_chain(&cli.client()?, request).await?;
            print_json(&verification)?;
        }
        Command::Field { value } => {
            let field = string_to_field(value)?;
            print_json(&json!({ "field": format!("{field}field") }))?;
        }
        Command::CheckOptions { path } => {
            let contents = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            let options = SdkOptions::from_json(&contents)?;
            options.validate()?;
            print_json(&json!({
                "valid": true,
                "host": options.network.host,
                "network": options.network.network.to_string(),
            }))?;
        }
    }

    Ok(())
}
