use core_types::{IdentityClass, Order, Trade, Transaction};
use database::{get_json, DbError, StateKey, StateStore, WriteBatch};
use serde::Serialize;
use std::collections::BTreeMap;

/// Next value to hand out, per identity class.
pub type Counters = BTreeMap<IdentityClass, u64>;

/// FI -> product -> transaction ids, oldest first.
pub type Chains = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// The complete ledger, as one value.
///
/// Every operation loads a snapshot, mutates a copy and hands both to
/// [`LedgerState::stage_changes`], which writes back only the sections that
/// differ. Indices hold identifiers only; the entities live in `orders`,
/// `trades` and `transactions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerState {
    pub counters: Counters,
    pub orders: BTreeMap<String, Order>,
    pub orders_by_fi: BTreeMap<String, Vec<String>>,
    pub orders_by_broker: BTreeMap<String, Vec<String>>,
    pub confirmed_to_order: BTreeMap<String, String>,
    pub trades: BTreeMap<String, Trade>,
    /// Trade id -> member confirmation ids, fixed when the trade is created.
    pub trade_settlement: BTreeMap<String, Vec<String>>,
    pub transactions: BTreeMap<String, Transaction>,
    pub chains: Chains,
}

impl LedgerState {
    /// Reads every section from the store. Absent keys load as empty.
    pub async fn load<S: StateStore + ?Sized>(store: &S) -> Result<Self, DbError> {
        Ok(Self {
            counters: get_json(store, StateKey::Counters).await?.unwrap_or_default(),
            orders: get_json(store, StateKey::Orders).await?.unwrap_or_default(),
            orders_by_fi: get_json(store, StateKey::OrdersByFi).await?.unwrap_or_default(),
            orders_by_broker: get_json(store, StateKey::OrdersByBroker).await?.unwrap_or_default(),
            confirmed_to_order: get_json(store, StateKey::ConfirmedToOrder).await?.unwrap_or_default(),
            trades: get_json(store, StateKey::Trades).await?.unwrap_or_default(),
            trade_settlement: get_json(store, StateKey::TradeSettlement).await?.unwrap_or_default(),
            transactions: get_json(store, StateKey::Transactions).await?.unwrap_or_default(),
            chains: get_json(store, StateKey::TransactionsByFi).await?.unwrap_or_default(),
        })
    }

    /// Builds the batch that turns `original` into `self`.
    pub fn stage_changes(&self, original: &LedgerState) -> Result<WriteBatch, DbError> {
        let mut batch = WriteBatch::new();
        stage_if_changed(&mut batch, StateKey::Counters, &self.counters, &original.counters)?;
        stage_if_changed(&mut batch, StateKey::Orders, &self.orders, &original.orders)?;
        stage_if_changed(&mut batch, StateKey::OrdersByFi, &self.orders_by_fi, &original.orders_by_fi)?;
        stage_if_changed(
            &mut batch,
            StateKey::OrdersByBroker,
            &self.orders_by_broker,
            &original.orders_by_broker,
        )?;
        stage_if_changed(
            &mut batch,
            StateKey::ConfirmedToOrder,
            &self.confirmed_to_order,
            &original.confirmed_to_order,
        )?;
        stage_if_changed(&mut batch, StateKey::Trades, &self.trades, &original.trades)?;
        stage_if_changed(
            &mut batch,
            StateKey::TradeSettlement,
            &self.trade_settlement,
            &original.trade_settlement,
        )?;
        stage_if_changed(&mut batch, StateKey::Transactions, &self.transactions, &original.transactions)?;
        stage_if_changed(&mut batch, StateKey::TransactionsByFi, &self.chains, &original.chains)?;
        Ok(batch)
    }

    /// Transaction ids of one FI-and-product chain, oldest first.
    pub fn chain(&self, fi_id: &str, product: &str) -> Option<&Vec<String>> {
        self.chains.get(fi_id).and_then(|products| products.get(product))
    }

    /// The most recent entry of a chain, if the chain has one.
    pub fn chain_tail(&self, fi_id: &str, product: &str) -> Option<&Transaction> {
        self.chain(fi_id, product)
            .and_then(|ids| ids.last())
            .and_then(|id| self.transactions.get(id))
    }

    /// Follows confirmation id -> order id -> order.
    pub fn order_for_confirmation(&self, confirmation_id: &str) -> Option<&Order> {
        self.confirmed_to_order
            .get(confirmation_id)
            .and_then(|order_id| self.orders.get(order_id))
    }
}

fn stage_if_changed<T: Serialize + PartialEq>(
    batch: &mut WriteBatch,
    key: StateKey,
    current: &T,
    original: &T,
) -> Result<(), DbError> {
    if current != original {
        batch.put_json(key, current)?;
    }
    Ok(())
}
