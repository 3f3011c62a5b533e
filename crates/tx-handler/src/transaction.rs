use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto;
use crate::error::{LedgerError, LedgerResult};

/// Content hash of a finalized transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(#[serde(with = "hex::serde")] [u8; 32]);

impl TxHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for TxHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// An ed25519 verifying key that may claim an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(#[serde(with = "hex::serde")] [u8; 32]);

impl PublicKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifies one unspent output: the producing transaction and the output's position in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtxoId {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl UtxoId {
    pub const fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl fmt::Display for UtxoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: Decimal,
    pub key: PublicKey,
}

impl Output {
    pub const fn new(value: Decimal, key: PublicKey) -> Self {
        Self { value, key }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub prev_tx_hash: TxHash,
    pub output_index: u32,
    pub signature: Vec<u8>,
}

impl Input {
    pub const fn new(prev_tx_hash: TxHash, output_index: u32) -> Self {
        Self {
            prev_tx_hash,
            output_index,
            signature: Vec::new(),
        }
    }

    pub const fn utxo_id(&self) -> UtxoId {
        UtxoId::new(self.prev_tx_hash, self.output_index)
    }
}

/// A finalized transaction. It cannot be mutated, so its hash stays valid as a key for the
/// outputs it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    hash: TxHash,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl Transaction {
    /// Rebuilds a transaction whose hash was declared elsewhere, e.g. in an input file
    pub fn from_parts(declared: TxHash, inputs: Vec<Input>, outputs: Vec<Output>) -> LedgerResult<Self> {
        let tx = TransactionBuilder { inputs, outputs }.finalize();

        if tx.hash != declared {
            return Err(LedgerError::HashMismatch {
                declared,
                computed: tx.hash,
            });
        }

        Ok(tx)
    }

    pub const fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Bytes the owner of the output spent by input `index` signs
    pub fn data_to_sign(&self, index: usize) -> LedgerResult<Vec<u8>> {
        data_to_sign(&self.inputs, &self.outputs, index)
    }

    /// The outputs paired with the identifiers they take once this transaction is committed
    pub fn output_ids(&self) -> impl Iterator<Item = (UtxoId, &Output)> + '_ {
        (0u32..)
            .zip(&self.outputs)
            .map(|(index, output)| (UtxoId::new(self.hash, index), output))
    }
}

/// Collects inputs and outputs, lets each input be signed, then computes the hash once
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add_input(mut self, prev_tx_hash: TxHash, output_index: u32) -> Self {
        self.inputs.push(Input::new(prev_tx_hash, output_index));
        self
    }

    #[must_use]
    pub fn add_output(mut self, value: Decimal, key: PublicKey) -> Self {
        self.outputs.push(Output::new(value, key));
        self
    }

    pub fn data_to_sign(&self, index: usize) -> LedgerResult<Vec<u8>> {
        data_to_sign(&self.inputs, &self.outputs, index)
    }

    pub fn set_signature(&mut self, index: usize, signature: Vec<u8>) -> LedgerResult<()> {
        let inputs = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(LedgerError::InputIndexOutOfRange { index, inputs })?;

        input.signature = signature;

        Ok(())
    }

    pub fn finalize(self) -> Transaction {
        let hash = TxHash(crypto::hash(&raw_data(&self.inputs, &self.outputs)));

        Transaction {
            hash,
            inputs: self.inputs,
            outputs: self.outputs,
        }
    }
}

fn write_output(buf: &mut Vec<u8>, output: &Output) {
    buf.extend_from_slice(&output.value.serialize());
    buf.extend_from_slice(output.key.as_bytes());
}

// Signatures are left out so signing is not circular.
fn data_to_sign(inputs: &[Input], outputs: &[Output], index: usize) -> LedgerResult<Vec<u8>> {
    let input = inputs.get(index).ok_or(LedgerError::InputIndexOutOfRange {
        index,
        inputs: inputs.len(),
    })?;

    let mut buf = Vec::with_capacity(36 + outputs.len() * 48);
    buf.extend_from_slice(input.prev_tx_hash.as_bytes());
    buf.extend_from_slice(&input.output_index.to_be_bytes());
    for output in outputs {
        write_output(&mut buf, output);
    }

    Ok(buf)
}

fn raw_data(inputs: &[Input], outputs: &[Output]) -> Vec<u8> {
    let mut buf = Vec::new();
    for input in inputs {
        buf.extend_from_slice(input.prev_tx_hash.as_bytes());
        buf.extend_from_slice(&input.output_index.to_be_bytes());
        buf.extend_from_slice(&input.signature);
    }
    for output in outputs {
        write_output(&mut buf, output);
    }

    buf
}
