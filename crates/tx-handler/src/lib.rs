pub mod crypto;
pub mod error;
pub mod handler;
pub mod transaction;
pub mod utxo_pool;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_support;

use error::LedgerResult;
use handler::TxHandler;
use transaction::Transaction;
use utxo_pool::UtxoPool;

/// Resolve a single batch against `pool` and return the accepted transactions with the
/// resulting pool
pub fn handle_batch(
    pool: &UtxoPool,
    batch: impl IntoIterator<Item = Transaction>,
) -> LedgerResult<(Vec<Transaction>, UtxoPool)> {
    let mut handler = TxHandler::new(pool);
    let accepted = handler.handle_txs(batch)?;

    Ok((accepted, handler.into_pool()))
}
