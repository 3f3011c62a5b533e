//! Validity of a single transaction against a pool snapshot.
//!
//! A transaction is valid when every input spends an existing UTXO, no UTXO is spent twice
//! by the same transaction, none of its outputs is already in the pool, every input is signed by the owner of the output it spends,
//! no output value is negative, and the inputs cover the outputs. Whatever is left over is
//! an implicit fee.

use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;

use crate::crypto::SignatureVerifier;
use crate::error::LedgerResult;
use crate::transaction::{Transaction, UtxoId};
use crate::utxo_pool::UtxoPool;

/// Why a transaction is invalid. These are ordinary outcomes, not errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingUtxo(UtxoId),
    DuplicateInput(UtxoId),
    /// The pool already holds an output under this transaction's hash, e.g. it was committed before
    OutputExists(UtxoId),
    InvalidSignature { index: usize },
    NegativeOutput { index: usize },
    InsufficientInput { inputs: Decimal, outputs: Decimal },
    ValueOverflow,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUtxo(id) => write!(f, "spends unknown UTXO {id}"),
            Self::DuplicateInput(id) => write!(f, "spends UTXO {id} more than once"),
            Self::OutputExists(id) => write!(f, "output {id} already exists"),
            Self::InvalidSignature { index } => write!(f, "bad signature on input {index}"),
            Self::NegativeOutput { index } => write!(f, "output {index} has a negative value"),
            Self::InsufficientInput { inputs, outputs } => {
                write!(f, "inputs {inputs} do not cover outputs {outputs}")
            }
            Self::ValueOverflow => write!(f, "value sum overflows"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(Rejection),
}

impl Validity {
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Checks `tx` against `pool`, cheapest checks first, and reports the first failed condition.
///
/// Errors only on malformed input that prevents computing the signed data.
pub fn validate<V>(tx: &Transaction, pool: &UtxoPool, verifier: &V) -> LedgerResult<Validity>
where
    V: SignatureVerifier + ?Sized,
{
    let mut seen = HashSet::with_capacity(tx.inputs().len());
    for input in tx.inputs() {
        let id = input.utxo_id();
        if !pool.contains(&id) {
            return Ok(Validity::Invalid(Rejection::MissingUtxo(id)));
        }
        if !seen.insert(id) {
            return Ok(Validity::Invalid(Rejection::DuplicateInput(id)));
        }
    }

    if let Some((id, _)) = tx.output_ids().find(|(id, _)| pool.contains(id)) {
        return Ok(Validity::Invalid(Rejection::OutputExists(id)));
    }

    let mut input_total = Decimal::ZERO;
    for (index, input) in tx.inputs().iter().enumerate() {
        let spent = pool.get(&input.utxo_id())?;
        let message = tx.data_to_sign(index)?;

        if !verifier.verify(&spent.key, &message, &input.signature) {
            return Ok(Validity::Invalid(Rejection::InvalidSignature { index }));
        }

        match input_total.checked_add(spent.value) {
            Some(total) => input_total = total,
            None => return Ok(Validity::Invalid(Rejection::ValueOverflow)),
        }
    }

    let mut output_total = Decimal::ZERO;
    for (index, output) in tx.outputs().iter().enumerate() {
        if output.value < Decimal::ZERO {
            return Ok(Validity::Invalid(Rejection::NegativeOutput { index }));
        }

        match output_total.checked_add(output.value) {
            Some(total) => output_total = total,
            None => return Ok(Validity::Invalid(Rejection::ValueOverflow)),
        }
    }

    if input_total < output_total {
        return Ok(Validity::Invalid(Rejection::InsufficientInput {
            inputs: input_total,
            outputs: output_total,
        }));
    }

    Ok(Validity::Valid)
}

pub fn is_valid<V>(tx: &Transaction, pool: &UtxoPool, verifier: &V) -> LedgerResult<bool>
where
    V: SignatureVerifier + ?Sized,
{
    Ok(validate(tx, pool, verifier)?.is_valid())
}
