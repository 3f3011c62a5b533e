use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use tx_handler::handler::{BatchOrdering, ClaimPolicy, HandlerConfig};

/// Trait for reading configuration parameters
pub trait Config {
    fn pool_path(&self) -> &Path;
    fn batch_path(&self) -> &Path;
    fn handler_config(&self) -> HandlerConfig;
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OrderingArg {
    /// Walk the batch in ascending transaction hash order
    Hash,
    /// Walk the batch in file order, first conflicting spend wins
    Presented,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ClaimArg {
    /// Only accepted transactions claim the outputs they spend
    Accepted,
    /// The first validated spend claims its outputs even if it is invalid
    First,
}

/// CLI configuration
#[derive(Parser, Debug)]
#[command(
    name = "utxo-ledger",
    about = "Resolves a batch of transactions against a UTXO pool snapshot",
    version
)]
pub struct CliConfig {
    /// Path to the CSV file with the unspent outputs to start from
    #[arg(value_name = "POOL_FILE")]
    pool_file: PathBuf,

    /// Path to the CSV file with the candidate transactions
    #[arg(value_name = "BATCH_FILE")]
    batch_file: PathBuf,

    /// Order used to break ties between conflicting transactions
    #[arg(long, value_enum, default_value_t = OrderingArg::Hash)]
    ordering: OrderingArg,

    /// When an input counts as claimed within a pass
    #[arg(long, value_enum, default_value_t = ClaimArg::Accepted)]
    claim: ClaimArg,
}

impl Config for CliConfig {
    fn pool_path(&self) -> &Path {
        &self.pool_file
    }

    fn batch_path(&self) -> &Path {
        &self.batch_file
    }

    fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            ordering: match self.ordering {
                OrderingArg::Hash => BatchOrdering::ByHash,
                OrderingArg::Presented => BatchOrdering::Presented,
            },
            claim_policy: match self.claim {
                ClaimArg::Accepted => ClaimPolicy::OnAcceptance,
                ClaimArg::First => ClaimPolicy::FirstClaim,
            },
        }
    }
}
