use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tx_handler::transaction::{Input, Output, PublicKey, Transaction, TxHash, UtxoId};

/// One unspent output, as read from and written to pool files
#[derive(Debug, Serialize, Deserialize)]
pub struct UtxoRecord {
    pub tx: TxHash,
    pub index: u32,
    pub value: Decimal,
    pub key: PublicKey,
}

impl UtxoRecord {
    pub fn new(id: &UtxoId, output: &Output) -> Self {
        Self {
            tx: id.tx_hash,
            index: id.index,
            value: output.value,
            key: output.key,
        }
    }

    pub fn into_entry(self) -> (UtxoId, Output) {
        (
            UtxoId::new(self.tx, self.index),
            Output::new(self.value, self.key),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Input,
    Output,
}

/// One input or output of a transaction in a batch file
#[derive(Debug, Deserialize)]
pub struct BatchRecord {
    pub tx: TxHash,
    pub kind: RecordKind,
    #[serde(default)]
    pub ref_tx: Option<TxHash>,
    #[serde(default)]
    pub ref_index: Option<u32>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub key: Option<PublicKey>,
}

/// Groups batch rows into transactions, in order of first appearance, and checks each
/// declared hash against the transaction's content
pub fn group_transactions(records: impl IntoIterator<Item = BatchRecord>) -> Result<Vec<Transaction>> {
    let mut order = Vec::new();
    let mut parts: HashMap<TxHash, (Vec<Input>, Vec<Output>)> = HashMap::new();

    for record in records {
        let tx = record.tx;
        let (inputs, outputs) = parts.entry(tx).or_insert_with(|| {
            order.push(tx);
            (Vec::new(), Vec::new())
        });

        match record.kind {
            RecordKind::Input => {
                let prev_tx_hash = record
                    .ref_tx
                    .ok_or_else(|| anyhow!("Input of {tx} requires ref_tx"))?;
                let output_index = record
                    .ref_index
                    .ok_or_else(|| anyhow!("Input of {tx} requires ref_index"))?;
                let signature = hex::decode(record.signature.unwrap_or_default())
                    .with_context(|| format!("Input of {tx} has a malformed signature"))?;

                inputs.push(Input {
                    prev_tx_hash,
                    output_index,
                    signature,
                });
            }
            RecordKind::Output => {
                let value = record
                    .value
                    .ok_or_else(|| anyhow!("Output of {tx} requires value"))?;
                let key = record
                    .key
                    .ok_or_else(|| anyhow!("Output of {tx} requires key"))?;

                outputs.push(Output::new(value, key));
            }
        }
    }

    order
        .into_iter()
        .map(|hash| {
            let (inputs, outputs) = parts.remove(&hash).unwrap_or_default();
            Transaction::from_parts(hash, inputs, outputs)
                .with_context(|| format!("Transaction {hash} is malformed"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tx_handler::transaction::TransactionBuilder;

    const HEADER: &str = "tx,kind,ref_tx,ref_index,signature,value,key\n";

    fn parse(data: &str) -> Result<Vec<Transaction>> {
        let records = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data.as_bytes())
            .deserialize()
            .collect::<Result<Vec<BatchRecord>, _>>()?;

        group_transactions(records)
    }

    fn sample() -> Transaction {
        let mut builder = TransactionBuilder::new()
            .add_input(TxHash::new([1; 32]), 2)
            .add_output(Decimal::new(25, 1), PublicKey::new([7; 32]));
        builder.set_signature(0, vec![0xaa; 64]).unwrap();
        builder.finalize()
    }

    fn rows(tx: &Transaction) -> String {
        let input = &tx.inputs()[0];
        let output = &tx.outputs()[0];
        format!(
            "{hash},output,,,,{value},{key}\n{hash},input,{prev},{index},{sig},,\n",
            hash = tx.hash(),
            value = output.value,
            key = output.key,
            prev = input.prev_tx_hash,
            index = input.output_index,
            sig = hex::encode(&input.signature),
        )
    }

    #[test]
    fn test_group_rows_into_transaction() {
        let tx = sample();

        let parsed = parse(&format!("{HEADER}{}", rows(&tx))).unwrap();

        assert_eq!(parsed, vec![tx]);
    }

    #[test]
    fn test_keeps_first_appearance_order() {
        let first = sample();
        let second = TransactionBuilder::new()
            .add_output(Decimal::ZERO, PublicKey::new([3; 32]))
            .finalize();
        let second_row = format!("{},output,,,,0,{}\n", second.hash(), PublicKey::new([3; 32]));

        let parsed = parse(&format!("{HEADER}{second_row}{}", rows(&first))).unwrap();

        assert_eq!(parsed, vec![second, first]);
    }

    #[test]
    fn test_declared_hash_must_match() {
        let tx = sample();
        let forged = rows(&tx).replace(&tx.hash().to_string(), &TxHash::new([0; 32]).to_string());

        assert!(parse(&format!("{HEADER}{forged}")).is_err());
    }

    #[test]
    fn test_input_requires_reference() {
        let tx = sample();
        let data = format!("{HEADER}{},input,,,,,\n", tx.hash());

        assert!(parse(&data).is_err());
    }

    #[test]
    fn test_utxo_record_round_trip() {
        let id = UtxoId::new(TxHash::new([4; 32]), 1);
        let output = Output::new(Decimal::new(105, 2), PublicKey::new([5; 32]));

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(UtxoRecord::new(&id, &output)).unwrap();
        let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let record: UtxoRecord = reader.deserialize().next().unwrap().unwrap();

        assert_eq!(record.into_entry(), (id, output));
    }
}
