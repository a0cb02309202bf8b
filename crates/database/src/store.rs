use crate::DbError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// The fixed logical keys the ledger keeps in the store, one per top-level
/// map, index or counter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    Counters,
    Orders,
    OrdersByFi,
    OrdersByBroker,
    ConfirmedToOrder,
    Trades,
    TradeSettlement,
    Transactions,
    TransactionsByFi,
}

impl StateKey {
    pub const ALL: [StateKey; 9] = [
        StateKey::Counters,
        StateKey::Orders,
        StateKey::OrdersByFi,
        StateKey::OrdersByBroker,
        StateKey::ConfirmedToOrder,
        StateKey::Trades,
        StateKey::TradeSettlement,
        StateKey::Transactions,
        StateKey::TransactionsByFi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::Counters => "CounterMap",
            StateKey::Orders => "AllFIOrders",
            StateKey::OrdersByFi => "AllOrdersForFI",
            StateKey::OrdersByBroker => "AllOrdersForBroker",
            StateKey::ConfirmedToOrder => "ConfirmedToFIOrder",
            StateKey::Trades => "AllTradeObjects",
            StateKey::TradeSettlement => "TradeSettlementMap",
            StateKey::Transactions => "ListOfTransactions",
            StateKey::TransactionsByFi => "ListOfTransactionsForFI",
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of whole-value writes that must become visible together.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    entries: Vec<(String, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a raw value. A later write to the same key replaces the earlier one.
    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        let key = key.into();
        self.entries.retain(|(existing, _)| *existing != key);
        self.entries.push((key, value));
    }

    /// Stages the JSON encoding of `value` under `key`.
    pub fn put_json<T: Serialize>(&mut self, key: StateKey, value: &T) -> Result<(), DbError> {
        let bytes = serde_json::to_vec(value).map_err(|source| DbError::JsonError {
            key: key.to_string(),
            source,
        })?;
        self.put(key.as_str(), bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn into_entries(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

/// The durable key/value collaborator. Values are opaque whole-object
/// snapshots; there are no partial updates.
///
/// `commit` must apply every entry of the batch or none of them.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DbError>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), DbError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), DbError>;
}

/// Reads and decodes a JSON snapshot. An absent key yields `None`.
pub async fn get_json<T, S>(store: &S, key: StateKey) -> Result<Option<T>, DbError>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    match store.get(key.as_str()).await? {
        Some(bytes) if !bytes.is_empty() => {
            let value = serde_json::from_slice(&bytes).map_err(|source| DbError::JsonError {
                key: key.to_string(),
                source,
            })?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_are_unique() {
        let mut names: Vec<&str> = StateKey::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), StateKey::ALL.len());
    }

    #[test]
    fn later_write_to_same_key_wins() {
        let mut batch = WriteBatch::new();
        batch.put("a", b"1".to_vec());
        batch.put("b", b"2".to_vec());
        batch.put("a", b"3".to_vec());

        assert_eq!(batch.len(), 2);
        let entries = batch.into_entries();
        assert_eq!(entries[0], ("b".to_string(), b"2".to_vec()));
        assert_eq!(entries[1], ("a".to_string(), b"3".to_vec()));
    }

    #[test]
    fn put_json_uses_logical_key_name() {
        let mut batch = WriteBatch::new();
        batch.put_json(StateKey::Counters, &vec![1, 2, 3]).unwrap();
        assert_eq!(batch.keys().collect::<Vec<_>>(), vec!["CounterMap"]);
    }
}
