use ed25519_dalek::{Signer, SigningKey};
use rust_decimal::Decimal;

use crate::transaction::{Output, PublicKey, Transaction, TransactionBuilder, TxHash, UtxoId};
use crate::utxo_pool::UtxoPool;

pub struct Wallet {
    signing_key: SigningKey,
}

impl Wallet {
    pub fn new(seed: u8) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn key(&self) -> PublicKey {
        PublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

pub fn coins(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

/// A pool holding one output per `(seed, value, owner)`, produced by a made-up transaction
pub fn seeded_pool(entries: &[(u8, i64, &Wallet)]) -> UtxoPool {
    entries
        .iter()
        .map(|&(seed, value, owner)| (seed_utxo(seed), Output::new(coins(value), owner.key())))
        .collect()
}

pub fn seed_utxo(seed: u8) -> UtxoId {
    UtxoId::new(TxHash::new([seed; 32]), 0)
}

/// Builds a transaction spending `inputs`, each signed by the paired wallet
pub fn signed_tx(inputs: &[(UtxoId, &Wallet)], outputs: &[(i64, PublicKey)]) -> Transaction {
    let mut builder = TransactionBuilder::new();
    for (id, _) in inputs {
        builder = builder.add_input(id.tx_hash, id.index);
    }
    for &(value, key) in outputs {
        builder = builder.add_output(coins(value), key);
    }

    for (index, (_, wallet)) in inputs.iter().enumerate() {
        let message = builder.data_to_sign(index).unwrap();
        builder.set_signature(index, wallet.sign(&message)).unwrap();
    }

    builder.finalize()
}
