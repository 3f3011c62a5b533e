use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::error::{LedgerError, LedgerResult};
use crate::transaction::{Output, UtxoId};

/// Unspent transaction outputs, indexed by the producing transaction's hash and the output's
/// position in it.
///
/// Cloning yields independent storage: mutating the clone never affects the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoPool {
    utxos: HashMap<UtxoId, Output>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    pub fn get(&self, id: &UtxoId) -> LedgerResult<&Output> {
        self.utxos.get(id).ok_or(LedgerError::UtxoNotFound(*id))
    }

    pub fn add(&mut self, id: UtxoId, output: Output) -> LedgerResult<()> {
        if self.utxos.contains_key(&id) {
            return Err(LedgerError::DuplicateUtxo(id));
        }

        self.utxos.insert(id, output);

        Ok(())
    }

    pub fn remove(&mut self, id: &UtxoId) -> LedgerResult<Output> {
        self.utxos
            .remove(id)
            .ok_or(LedgerError::UtxoNotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UtxoId, &Output)> {
        self.utxos.iter()
    }

    /// Sum of all unspent values, `None` on overflow
    pub fn total_value(&self) -> Option<Decimal> {
        self.utxos
            .values()
            .try_fold(Decimal::ZERO, |total, output| total.checked_add(output.value))
    }
}

impl FromIterator<(UtxoId, Output)> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = (UtxoId, Output)>>(iter: I) -> Self {
        Self {
            utxos: iter.into_iter().collect(),
        }
    }
}
