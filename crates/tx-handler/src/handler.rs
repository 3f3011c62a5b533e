use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, trace};

use crate::crypto::{Ed25519Verifier, SignatureVerifier};
use crate::error::LedgerResult;
use crate::transaction::{Input, Transaction, TxHash, UtxoId};
use crate::utxo_pool::UtxoPool;
use crate::validator::{self, Rejection, Validity};

/// Order in which a batch is walked. It decides which of two conflicting spends wins
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchOrdering {
    /// Ascending transaction hash, independent of how the caller arranged the batch
    #[default]
    ByHash,
    /// The order the caller presented the batch in
    Presented,
}

/// When an input's UTXO counts as taken for the rest of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaimPolicy {
    /// Only an accepted transaction claims the UTXOs it spends
    #[default]
    OnAcceptance,
    /// The first transaction that reaches validation claims its UTXOs, even if it then turns
    /// out to be invalid. Later valid spends of the same UTXOs in that pass are dropped.
    FirstClaim,
}

/// Tie-breaking rules applied while resolving a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerConfig {
    pub ordering: BatchOrdering,
    pub claim_policy: ClaimPolicy,
}

/// Why a transaction was left out of the accepted set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// An earlier transaction in the same pass already claimed this UTXO
    Conflict(UtxoId),
    Invalid(Rejection),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict(id) => write!(f, "UTXO {id} already claimed in this pass"),
            Self::Invalid(rejection) => write!(f, "{rejection}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Accepted transactions in commit order: pass by pass, then in-pass order
    pub accepted: Vec<Transaction>,
    /// Transactions left out for good, with the reason, in the order they were dropped
    pub dropped: Vec<(TxHash, DropReason)>,
    /// Transactions still waiting on a producer when resolution stopped making progress
    pub unresolved: Vec<TxHash>,
    /// Number of passes over the working batch
    pub passes: usize,
}

#[derive(Default)]
struct Pass {
    accepted: Vec<Transaction>,
    deferred: Vec<Transaction>,
    dropped: Vec<(TxHash, DropReason)>,
}

impl Pass {
    fn made_progress(&self) -> bool {
        !self.accepted.is_empty() || !self.dropped.is_empty()
    }
}

/// Resolves batches of transactions against a private copy of a UTXO pool
pub struct TxHandler<V = Ed25519Verifier> {
    pool: UtxoPool,
    verifier: V,
    config: HandlerConfig,
}

impl TxHandler {
    pub fn new(pool: &UtxoPool) -> Self {
        Self::with_verifier(pool, Ed25519Verifier)
    }
}

impl<V: SignatureVerifier> TxHandler<V> {
    pub fn with_verifier(pool: &UtxoPool, verifier: V) -> Self {
        Self {
            pool: pool.clone(),
            verifier,
            config: HandlerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub const fn config(&self) -> HandlerConfig {
        self.config
    }

    pub const fn pool(&self) -> &UtxoPool {
        &self.pool
    }

    pub fn into_pool(self) -> UtxoPool {
        self.pool
    }

    /// Checks `tx` against the current pool without changing it
    pub fn is_valid_tx(&self, tx: &Transaction) -> LedgerResult<bool> {
        validator::is_valid(tx, &self.pool, &self.verifier)
    }

    /// Resolves `batch` and returns the accepted transactions in commit order
    pub fn handle_txs(
        &mut self,
        batch: impl IntoIterator<Item = Transaction>,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(self.resolve(batch)?.accepted)
    }

    /// Resolves `batch` into its largest mutually consistent subset and commits it.
    ///
    /// Transactions spending outputs of other transactions in the batch are deferred until
    /// their producers are committed, so the batch may arrive in any order. The pool is only
    /// replaced once the whole batch resolved; on error it is left as it was.
    pub fn resolve(
        &mut self,
        batch: impl IntoIterator<Item = Transaction>,
    ) -> LedgerResult<BatchReport> {
        let mut working = self.prepare(batch);
        let submitted = working.len();
        let mut pool = self.pool.clone();
        let mut report = BatchReport::default();

        while !working.is_empty() {
            report.passes += 1;
            let pass = self.run_pass(working, &pool)?;

            if !pass.made_progress() {
                for tx in &pass.deferred {
                    debug!("Discarding transaction {}, its producer never committed", tx.hash());
                }
                report.unresolved = pass.deferred.iter().map(Transaction::hash).collect();
                break;
            }

            pool = apply_pass(pool, &pass.accepted)?;
            report.accepted.extend(pass.accepted);
            report.dropped.extend(pass.dropped);
            working = pass.deferred;
        }

        self.pool = pool;

        info!(
            "Resolved batch of {submitted} transactions in {} passes: {} accepted, {} dropped, {} unresolved",
            report.passes,
            report.accepted.len(),
            report.dropped.len(),
            report.unresolved.len(),
        );

        Ok(report)
    }

    fn prepare(&self, batch: impl IntoIterator<Item = Transaction>) -> Vec<Transaction> {
        let mut seen = HashSet::new();
        let mut working: Vec<Transaction> = batch
            .into_iter()
            .filter(|tx| {
                let first = seen.insert(tx.hash());
                if !first {
                    debug!("Ignoring repeated transaction {}", tx.hash());
                }
                first
            })
            .collect();

        if self.config.ordering == BatchOrdering::ByHash {
            working.sort_by_key(Transaction::hash);
        }

        working
    }

    /// Walks the working batch once against a fixed pool snapshot
    fn run_pass(&self, working: Vec<Transaction>, pool: &UtxoPool) -> LedgerResult<Pass> {
        let pending: HashSet<TxHash> = working.iter().map(Transaction::hash).collect();
        let mut claimed: HashSet<UtxoId> = HashSet::new();
        let mut pass = Pass::default();

        for tx in working {
            if let Some(id) = tx
                .inputs()
                .iter()
                .map(Input::utxo_id)
                .find(|id| claimed.contains(id))
            {
                debug!("Dropping transaction {}: UTXO {id} already claimed", tx.hash());
                pass.dropped.push((tx.hash(), DropReason::Conflict(id)));
                continue;
            }

            if tx
                .inputs()
                .iter()
                .any(|input| pending.contains(&input.prev_tx_hash))
            {
                trace!("Deferring transaction {}, it spends a pending output", tx.hash());
                pass.deferred.push(tx);
                continue;
            }

            let validity = validator::validate(&tx, pool, &self.verifier)?;

            if validity.is_valid() || self.config.claim_policy == ClaimPolicy::FirstClaim {
                claimed.extend(tx.inputs().iter().map(Input::utxo_id));
            }

            match validity {
                Validity::Valid => pass.accepted.push(tx),
                Validity::Invalid(rejection) => {
                    debug!("Dropping transaction {}: {rejection}", tx.hash());
                    pass.dropped.push((tx.hash(), DropReason::Invalid(rejection)));
                }
            }
        }

        Ok(pass)
    }
}

/// Commits one pass: spends every input, then adds every output under the producer's hash
fn apply_pass(mut pool: UtxoPool, accepted: &[Transaction]) -> LedgerResult<UtxoPool> {
    for tx in accepted {
        for input in tx.inputs() {
            let id = input.utxo_id();
            pool.remove(&id)?;
            trace!("Spent UTXO {id}");
        }

        for (id, output) in tx.output_ids() {
            pool.add(id, output.clone())?;
            trace!("Created UTXO {id} worth {}", output.value);
        }
    }

    Ok(pool)
}
