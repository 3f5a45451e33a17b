//! Entrypoint.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use config::Opts;
use dotenvy::dotenv;
use extractor::{
    AttestationClient, RpcFetcher, fetch_data_record, fetch_risk_record, latest_active_block,
};
use eyre::{OptionExt, Result};
use indexer::{FallbackFetcher, GraphQlFetcher, IndexerClient};
use primitives::FetchConfig;
use proofs::{ProofsCache, ProofsPagination};
use serde_json::{Value, json};
use storage::{FileStorage, LatestBlockCache};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line of the proofscope binary
#[derive(Debug, Parser)]
#[clap(name = "proofscope", version, about = "Discover and page through attestation proofs")]
struct Cli {
    #[clap(flatten)]
    opts: Opts,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a page of correlated proofs, fetching more when the cache falls short
    Proofs {
        /// Page to show; defaults to the persisted page
        #[clap(long)]
        page: Option<usize>,
    },
    /// Print the latest block with attestation activity
    LatestBlock,
    /// Read the consensus data record of a trader and epoch
    DataRecord {
        /// Trader identifier
        trader_id: String,
        /// Reporting epoch
        epoch: u64,
    },
    /// Read the consensus risk value of a trader, epoch and risk parameter
    RiskRecord {
        /// Trader identifier
        trader_id: String,
        /// Reporting epoch
        epoch: u64,
        /// Risk parameter
        #[clap(long)]
        parameter_id: Option<u64>,
    },
    /// Drop cached proofs
    ClearCache,
}

fn rpc_client(config: &FetchConfig) -> Result<AttestationClient> {
    AttestationClient::from_config(config)
        .ok_or_eyre("RPC_URL and ATTESTATION_ADDRESS are required for this command")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn show_proofs(opts: &Opts, storage: Arc<FileStorage>, page: Option<usize>) -> Result<()> {
    let config = opts.fetch_config();
    let rpc = AttestationClient::from_config(&config).map(|client| {
        let rpc_url = client.rpc_url().to_string();
        RpcFetcher::new(client, LatestBlockCache::new(Arc::clone(&storage)), rpc_url)
    });
    let fetcher = FallbackFetcher::new(GraphQlFetcher::new(IndexerClient::new()), rpc);

    let cache = ProofsCache::load(storage);
    let mut pagination = ProofsPagination::new(cache, fetcher, config, opts.scan.page_size);
    let records = match page {
        Some(page) => pagination.handle_page_change(page).await?,
        None => pagination.load_current_page().await?,
    }
    .to_vec();

    info!(
        page = pagination.page(),
        shown = records.len(),
        cached = pagination.cache().len(),
        has_more = pagination.has_more(),
        "Loaded proofs"
    );
    print_json(&json!({
        "page": pagination.page(),
        "hasMore": pagination.has_more(),
        "proofs": records,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }

    let Cli { opts, command } = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    info!("🔭 Proofscope starting...");

    let storage = Arc::new(FileStorage::open(&opts.storage.cache_file)?);
    let config = opts.fetch_config();

    match command {
        Command::Proofs { page } => show_proofs(&opts, storage, page).await,
        Command::LatestBlock => {
            let client = rpc_client(&config)?;
            let cache = LatestBlockCache::new(storage);
            let block =
                latest_active_block(&client, &cache, client.rpc_url().as_str(), config.batch_size)
                    .await?;
            print_json(&json!({ "latestActiveBlock": block }))
        }
        Command::DataRecord { trader_id, epoch } => {
            let record = fetch_data_record(&rpc_client(&config)?, &trader_id, epoch).await?;
            print_json(&json!({
                "traderId": trader_id,
                "epoch": epoch,
                "record": record.record,
                "hasConsensus": record.has_consensus,
            }))
        }
        Command::RiskRecord { trader_id, epoch, parameter_id } => {
            let record =
                fetch_risk_record(&rpc_client(&config)?, &trader_id, epoch, parameter_id).await?;
            print_json(&json!({
                "traderId": trader_id,
                "epoch": epoch,
                "parameterId": parameter_id.unwrap_or_default(),
                "value": record.record,
                "hasConsensus": record.has_consensus,
            }))
        }
        Command::ClearCache => {
            let mut cache = ProofsCache::load(storage);
            let cleared = cache.len();
            cache.clear()?;
            info!(cleared, "Cleared proofs cache");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert()
    }
}
