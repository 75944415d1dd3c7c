//! TradeLedger — append-only record of completed trades in exit order.

use super::trade::TradeRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeLedger {
    records: Vec<TradeRecord>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from records already in exit order (e.g. an imported tape).
    pub fn from_records(records: Vec<TradeRecord>) -> Self {
        Self { records }
    }

    /// Append a record. Only the engine writes to a ledger.
    pub(crate) fn append(&mut self, record: TradeRecord) {
        debug_assert!(
            self.records
                .last()
                .map_or(true, |last| last.exit_timestamp <= record.exit_timestamp),
            "ledger records must be appended in exit order"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[TradeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TradeRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_pnl(&self) -> f64 {
        self.records.iter().map(|r| r.pnl).sum()
    }

}

impl<'a> IntoIterator for &'a TradeLedger {
    type Item = &'a TradeRecord;
    type IntoIter = std::slice::Iter<'a, TradeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
