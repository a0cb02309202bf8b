use crate::error::EngineError;
use crate::identity::{issue_order, IdentityGenerator};
use crate::state::LedgerState;
use chrono::{DateTime, Utc};
use configuration::SeedHolding;
use core_types::{IdentityClass, Order, TradeStatus, Transaction, TransactionType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReport {
    pub settled_at: DateTime<Utc>,
    #[serde(rename = "tradeObjectIDs")]
    pub trade_ids: Vec<String>,
    #[serde(rename = "transactionIDs")]
    pub transaction_ids: Vec<String>,
    /// Member confirmation ids that did not resolve to an order.
    pub skipped_members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub seeded: bool,
    #[serde(rename = "transactionIDs")]
    pub transaction_ids: Vec<String>,
}

/// Settles every `ToBeSettled` trade, in creation order, appending one
/// ledger entry per resolved member order.
///
/// A chain with no entries starts from `opening_balance`.
pub fn clear_and_settle(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    settled_at: DateTime<Utc>,
    opening_balance: i64,
) -> Result<SettlementReport, EngineError> {
    let mut pending: Vec<String> = state
        .trades
        .iter()
        .filter(|(_, trade)| trade.status == TradeStatus::ToBeSettled)
        .map(|(id, _)| id.clone())
        .collect();
    pending.sort_by(|a, b| issue_order(a).cmp(&issue_order(b)));

    let mut report = SettlementReport {
        settled_at,
        trade_ids: Vec::with_capacity(pending.len()),
        transaction_ids: Vec::new(),
        skipped_members: Vec::new(),
    };

    for trade_id in pending {
        let members = state.trade_settlement.get(&trade_id).cloned().ok_or_else(|| {
            EngineError::SettlementFailure(format!("trade {} has no settlement membership", trade_id))
        })?;

        let mut resolved: Vec<Order> = Vec::with_capacity(members.len());
        for confirmation_id in &members {
            match state.order_for_confirmation(confirmation_id) {
                Some(order) => resolved.push(order.clone()),
                None => {
                    tracing::warn!(trade_id = %trade_id, confirmation_id = %confirmation_id, "Skipping unresolved trade member.");
                    report.skipped_members.push(confirmation_id.clone());
                }
            }
        }

        let trade = state
            .trades
            .get_mut(&trade_id)
            .ok_or_else(|| EngineError::SettlementFailure(format!("trade {} vanished", trade_id)))?;
        trade
            .settle(settled_at)
            .map_err(|e| EngineError::SettlementFailure(e.to_string()))?;

        for order in &resolved {
            let transaction_id = post(state, identities, order, settled_at, opening_balance)?;
            report.transaction_ids.push(transaction_id);
        }

        tracing::debug!(trade_id = %trade_id, postings = resolved.len(), "Trade settled.");
        report.trade_ids.push(trade_id);
    }

    Ok(report)
}

/// Appends one order's effect to its FI-and-product chain.
fn post(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    order: &Order,
    date: DateTime<Utc>,
    opening_balance: i64,
) -> Result<String, EngineError> {
    let prior_balance = match state.chain(&order.fi_id, &order.product) {
        Some(chain) if !chain.is_empty() => state
            .chain_tail(&order.fi_id, &order.product)
            .map(|tail| tail.balance)
            .ok_or_else(|| {
                EngineError::SettlementFailure(format!(
                    "chain {}/{} references a missing transaction",
                    order.fi_id, order.product
                ))
            })?,
        _ => opening_balance,
    };

    let kind = order.direction.transaction_type();
    let balance = kind.apply(prior_balance, order.quantity).ok_or_else(|| {
        EngineError::SettlementFailure(format!(
            "balance of {}/{} overflows after order {}",
            order.fi_id, order.product, order.order_id
        ))
    })?;

    let transaction_id = identities
        .next(&mut state.counters, IdentityClass::Transaction)
        .map_err(|e| EngineError::SettlementFailure(e.to_string()))?;

    append(
        state,
        Transaction {
            transaction_id: transaction_id.clone(),
            fi_id: order.fi_id.clone(),
            account_id: order.account_id.clone(),
            product: order.product.clone(),
            stock_id: order.stock_id.clone(),
            quantity: order.quantity,
            kind,
            balance,
            date,
        },
    );
    Ok(transaction_id)
}

fn append(state: &mut LedgerState, transaction: Transaction) {
    state
        .chains
        .entry(transaction.fi_id.clone())
        .or_default()
        .entry(transaction.product.clone())
        .or_default()
        .push(transaction.transaction_id.clone());
    state
        .transactions
        .insert(transaction.transaction_id.clone(), transaction);
}

/// Credits every configured opening holding as the first entry of its chain.
///
/// Runs only on an empty ledger; otherwise it reports `seeded: false` and
/// changes nothing, so calling it again is harmless.
pub fn seed_initial_transactions(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    holdings: &[SeedHolding],
    at: DateTime<Utc>,
) -> Result<SeedReport, EngineError> {
    if !state.transactions.is_empty() || !state.chains.is_empty() {
        tracing::info!("Ledger already holds transactions; seed step skipped.");
        return Ok(SeedReport { seeded: false, transaction_ids: Vec::new() });
    }

    let mut transaction_ids = Vec::with_capacity(holdings.len());
    for holding in holdings {
        let balance = TransactionType::Credit.apply(0, holding.quantity).ok_or_else(|| {
            EngineError::InvalidArgument(format!(
                "seed quantity {} for {}/{} is too large",
                holding.quantity, holding.fi_id, holding.product
            ))
        })?;
        let transaction_id = identities.next(&mut state.counters, IdentityClass::Transaction)?;

        append(
            state,
            Transaction {
                transaction_id: transaction_id.clone(),
                fi_id: holding.fi_id.clone(),
                account_id: holding.account_id.clone(),
                product: holding.product.clone(),
                stock_id: holding.stock_id.clone(),
                quantity: holding.quantity,
                kind: TransactionType::Credit,
                balance,
                date: at,
            },
        );
        transaction_ids.push(transaction_id);
    }

    Ok(SeedReport { seeded: true, transaction_ids })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble_trades;
    use crate::matching::ResolutionPolicy;
    use crate::registry::place_orders;
    use chrono::TimeZone;
    use configuration::{IdentitySettings, SeedSettings};
    use core_types::Direction;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 2, 9, 30, 0).unwrap()
    }

    fn with_trade(orders: Vec<Order>) -> (LedgerState, IdentityGenerator) {
        let mut state = LedgerState::default();
        let identities = IdentityGenerator::default();
        seed_initial_transactions(&mut state, &identities, &SeedSettings::default().holdings, at()).unwrap();
        let ids = place_orders(&mut state, &identities, orders, at()).unwrap();
        assemble_trades(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap();
        (state, identities)
    }

    #[test]
    fn seed_credits_each_holding_once() {
        let mut state = LedgerState::default();
        let identities = IdentityGenerator::default();
        let holdings = SeedSettings::default().holdings;

        let first = seed_initial_transactions(&mut state, &identities, &holdings, at()).unwrap();
        assert!(first.seeded);
        assert_eq!(first.transaction_ids.len(), 8);
        assert_eq!(state.chain_tail("FI1", "TCS").map(|t| t.balance), Some(1000));
        assert_eq!(state.chain_tail("FI2", "TCS").map(|t| t.balance), Some(500));

        let snapshot = state.clone();
        let second = seed_initial_transactions(&mut state, &identities, &holdings, at()).unwrap();
        assert!(!second.seeded);
        assert_eq!(state, snapshot);
    }

    #[test]
    fn settlement_posts_credit_and_debit() {
        let (mut state, identities) = with_trade(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 100),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 100),
        ]);

        let report = clear_and_settle(&mut state, &identities, at(), 0).unwrap();
        assert_eq!(report.trade_ids, vec!["30000"]);
        assert_eq!(report.transaction_ids.len(), 2);

        let buyer = state.chain_tail("FI1", "TCS").unwrap();
        assert_eq!((buyer.kind, buyer.balance), (TransactionType::Credit, 1100));
        let seller = state.chain_tail("FI2", "TCS").unwrap();
        assert_eq!((seller.kind, seller.balance), (TransactionType::Debit, 400));

        let trade = &state.trades["30000"];
        assert_eq!(trade.status, TradeStatus::SettledCleared);
        assert_eq!(trade.settlement_date, Some(at()));
    }

    #[test]
    fn fresh_chain_starts_from_opening_balance() {
        let (mut state, identities) = with_trade(vec![
            Order::new("FI9", "B1", "WIPRO", Direction::Buy, 10),
            Order::new("FI8", "B1", "WIPRO", Direction::Sell, 10),
        ]);

        clear_and_settle(&mut state, &identities, at(), 25).unwrap();
        assert_eq!(state.chain_tail("FI9", "WIPRO").map(|t| t.balance), Some(35));
        assert_eq!(state.chain_tail("FI8", "WIPRO").map(|t| t.balance), Some(15));
    }

    #[test]
    fn settled_trades_are_not_settled_again() {
        let (mut state, identities) = with_trade(vec![
            Order::new("FI1", "B1", "IBM", Direction::Buy, 5),
            Order::new("FI2", "B1", "IBM", Direction::Sell, 5),
        ]);
        clear_and_settle(&mut state, &identities, at(), 0).unwrap();
        let after_first = state.clone();

        let report = clear_and_settle(&mut state, &identities, at(), 0).unwrap();
        assert!(report.trade_ids.is_empty());
        assert_eq!(state, after_first);
    }

    #[test]
    fn unresolved_members_are_skipped() {
        let (mut state, identities) = with_trade(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 100),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 100),
        ]);
        state.confirmed_to_order.remove("20001");

        let report = clear_and_settle(&mut state, &identities, at(), 0).unwrap();
        assert_eq!(report.skipped_members, vec!["20001"]);
        assert_eq!(report.transaction_ids.len(), 1);
        assert_eq!(state.chain("FI2", "TCS").map(|c| c.len()), Some(1));
    }

    #[test]
    fn trades_settle_in_creation_order_across_a_digit_rollover() {
        let mut state = LedgerState::default();
        let identities = IdentityGenerator::new(IdentitySettings {
            trade_object_base: 99_999,
            ..IdentitySettings::default()
        });

        let first = place_orders(
            &mut state,
            &identities,
            vec![
                Order::new("FI1", "B1", "TCS", Direction::Buy, 10),
                Order::new("FI2", "B1", "TCS", Direction::Sell, 10),
            ],
            at(),
        )
        .unwrap();
        assemble_trades(&mut state, &identities, &first, ResolutionPolicy::BestEffort).unwrap();

        let second = place_orders(
            &mut state,
            &identities,
            vec![
                Order::new("FI1", "B1", "TCS", Direction::Sell, 3),
                Order::new("FI2", "B1", "TCS", Direction::Buy, 3),
            ],
            at(),
        )
        .unwrap();
        assemble_trades(&mut state, &identities, &second, ResolutionPolicy::BestEffort).unwrap();

        let report = clear_and_settle(&mut state, &identities, at(), 0).unwrap();
        assert_eq!(report.trade_ids, vec!["99999", "100000"]);

        let chain: Vec<(TransactionType, i64)> = state
            .chain("FI1", "TCS")
            .unwrap()
            .iter()
            .map(|id| (state.transactions[id].kind, state.transactions[id].balance))
            .collect();
        assert_eq!(chain, vec![(TransactionType::Credit, 10), (TransactionType::Debit, 7)]);
    }

    #[test]
    fn missing_membership_fails_settlement() {
        let (mut state, identities) = with_trade(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 100),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 100),
        ]);
        state.trade_settlement.clear();

        let err = clear_and_settle(&mut state, &identities, at(), 0).unwrap_err();
        assert_eq!(err.code(), "SettlementFailure");
    }
}
