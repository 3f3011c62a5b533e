mod config;
mod records;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use records::{BatchRecord, UtxoRecord};
use std::io;
use std::path::Path;
use tracing::{info, warn};
use tx_handler::{handler::TxHandler, transaction::Transaction, utxo_pool::UtxoPool};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    resolve_batch(&config)?;

    info!("Processing completed successfully");

    Ok(())
}

fn resolve_batch<C: Config>(config: &C) -> Result<()> {
    let pool = load_pool(config.pool_path())?;
    let batch = load_batch(config.batch_path())?;

    info!(
        "Loaded {} unspent outputs and {} candidate transactions",
        pool.len(),
        batch.len()
    );

    let mut handler = TxHandler::new(&pool).with_config(config.handler_config());
    let report = handler.resolve(batch).context("Failed to resolve batch")?;

    for tx in &report.accepted {
        info!("Accepted transaction {}", tx.hash());
    }
    for (hash, reason) in &report.dropped {
        warn!("Dropped transaction {hash}: {reason}");
    }
    for hash in &report.unresolved {
        warn!("Discarded transaction {hash}: depends on a transaction that never committed");
    }

    write_pool(handler.pool())
}

fn load_pool(path: &Path) -> Result<UtxoPool> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("Failed to open pool file")?;

    let mut pool = UtxoPool::new();
    let mut skipped = 0;

    for result in reader.deserialize() {
        let record: UtxoRecord = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to parse unspent output: {e}");
                skipped += 1;

                continue;
            }
        };

        let (id, output) = record.into_entry();
        if let Err(e) = pool.add(id, output) {
            warn!("Skipping unspent output: {e}");
            skipped += 1;
        }
    }

    if skipped > 0 {
        warn!("Skipped {skipped} invalid unspent outputs");
    }

    Ok(pool)
}

fn load_batch(path: &Path) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("Failed to open batch file")?;

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<BatchRecord>, _>>()
        .context("Failed to parse batch file")?;

    records::group_transactions(rows)
}

fn write_pool(pool: &UtxoPool) -> Result<()> {
    let mut entries: Vec<_> = pool.iter().collect();
    entries.sort_by_key(|(id, _)| **id);

    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::WriterBuilder::new().from_writer(handle);

    for (id, output) in entries {
        writer
            .serialize(UtxoRecord::new(id, output))
            .context("Failed to serialize unspent output")?;
    }

    writer.flush().context("Failed to flush stdout")?;

    Ok(())
}
