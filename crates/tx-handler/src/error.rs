use thiserror::Error;

use crate::transaction::{TxHash, UtxoId};

/// Hard failures. Economic invalidity is never an error, see [`crate::validator::Rejection`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("UTXO not found: {0}")]
    UtxoNotFound(UtxoId),

    #[error("UTXO already present: {0}")]
    DuplicateUtxo(UtxoId),

    #[error("No input at index {index}, transaction has {inputs} inputs")]
    InputIndexOutOfRange { index: usize, inputs: usize },

    #[error("Declared hash {declared} does not match content hash {computed}")]
    HashMismatch { declared: TxHash, computed: TxHash },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
