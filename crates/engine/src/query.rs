//! Read-only projections over a [`LedgerState`] snapshot.

use crate::error::EngineError;
use crate::identity::issue_order;
use crate::state::LedgerState;
use core_types::{Order, OrderStatus, TradeStatus, Transaction};
use std::collections::BTreeMap;

fn orders_in_index(
    state: &LedgerState,
    ids: &[String],
    status: Option<OrderStatus>,
) -> Vec<Order> {
    ids.iter()
        .filter_map(|id| state.orders.get(id))
        .filter(|order| status.is_none_or(|s| order.status == s))
        .cloned()
        .collect()
}

/// Orders placed by one FI, in placement order. `None` means every status.
pub fn orders_for_fi(
    state: &LedgerState,
    fi_id: &str,
    status: Option<OrderStatus>,
) -> Result<Vec<Order>, EngineError> {
    let ids = state
        .orders_by_fi
        .get(fi_id)
        .ok_or_else(|| EngineError::NotFound(format!("orders for FI {}", fi_id)))?;
    Ok(orders_in_index(state, ids, status))
}

/// Orders routed through one broker, in placement order.
pub fn orders_for_broker(
    state: &LedgerState,
    broker_id: &str,
    status: Option<OrderStatus>,
) -> Result<Vec<Order>, EngineError> {
    let ids = state
        .orders_by_broker
        .get(broker_id)
        .ok_or_else(|| EngineError::NotFound(format!("orders for broker {}", broker_id)))?;
    Ok(orders_in_index(state, ids, status))
}

fn sorted_by_order_id(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| issue_order(&a.order_id).cmp(&issue_order(&b.order_id)));
    orders
}

/// Member orders of every trade in `status`, optionally narrowed to one
/// exchange. Trades are taken in creation order.
pub fn orders_for_exchange(
    state: &LedgerState,
    status: TradeStatus,
    exchange: Option<&str>,
) -> Vec<Order> {
    let mut trade_ids: Vec<&str> = state
        .trades
        .values()
        .filter(|trade| trade.status == status)
        .map(|trade| trade.trade_id.as_str())
        .collect();
    trade_ids.sort_by(|a, b| issue_order(a).cmp(&issue_order(b)));

    trade_ids
        .into_iter()
        .filter_map(|trade_id| state.trade_settlement.get(trade_id))
        .flatten()
        .filter_map(|confirmation_id| state.order_for_confirmation(confirmation_id))
        .filter(|order| exchange.is_none_or(|e| order.exchange == e))
        .cloned()
        .collect()
}

pub fn orders_for_custodian(state: &LedgerState, custodian_id: &str) -> Vec<Order> {
    sorted_by_order_id(
        state
            .orders
            .values()
            .filter(|order| order.custodian_id == custodian_id)
            .cloned()
            .collect(),
    )
}

/// Current balance per product for one FI: the balance of each chain's tail.
pub fn holdings_for_fi(state: &LedgerState, fi_id: &str) -> Result<BTreeMap<String, i64>, EngineError> {
    let products = state
        .chains
        .get(fi_id)
        .ok_or_else(|| EngineError::NotFound(format!("holdings for FI {}", fi_id)))?;

    Ok(products
        .keys()
        .filter_map(|product| {
            state
                .chain_tail(fi_id, product)
                .map(|tail| (product.clone(), tail.balance))
        })
        .collect())
}

/// The full chain for one FI and product, oldest first. An FI with no
/// entries for `product` yields an empty list.
pub fn transactions_for_fi_product(
    state: &LedgerState,
    fi_id: &str,
    product: &str,
) -> Result<Vec<Transaction>, EngineError> {
    let products = state
        .chains
        .get(fi_id)
        .ok_or_else(|| EngineError::NotFound(format!("transactions for FI {}", fi_id)))?;

    Ok(products
        .get(product)
        .map(|ids| ids.iter().filter_map(|id| state.transactions.get(id)).cloned().collect())
        .unwrap_or_default())
}

pub fn all_orders(state: &LedgerState) -> Result<Vec<Order>, EngineError> {
    if state.orders.is_empty() {
        return Err(EngineError::NotFound("no orders have been placed".to_string()));
    }
    Ok(sorted_by_order_id(state.orders.values().cloned().collect()))
}

/// Ids of the trades still waiting for settlement, oldest first.
pub fn trades_for_settlement(state: &LedgerState) -> Vec<String> {
    let mut pending: Vec<String> = state
        .trades
        .values()
        .filter(|trade| trade.status == TradeStatus::ToBeSettled)
        .map(|trade| trade.trade_id.clone())
        .collect();
    pending.sort_by(|a, b| issue_order(a).cmp(&issue_order(b)));
    pending
}
