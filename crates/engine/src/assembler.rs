use crate::error::EngineError;
use crate::identity::IdentityGenerator;
use crate::matching::{match_orders, MatchOutcome, ResolutionPolicy};
use crate::state::LedgerState;
use core_types::{IdentityClass, Trade};
use serde::Serialize;

/// One trade created by [`assemble_trades`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledTrade {
    #[serde(rename = "tradeObjectID")]
    pub trade_id: String,
    pub order_trade_number: String,
    pub product: String,
    /// Member order ids.
    #[serde(rename = "fiOrderIDs")]
    pub order_ids: Vec<String>,
    /// Member confirmation ids, as recorded in the settlement map.
    #[serde(rename = "conOrderIDs")]
    pub confirmation_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReport {
    pub trades: Vec<AssembledTrade>,
    pub skipped_order_ids: Vec<String>,
}

/// Matches `order_ids` and bundles every product group into a new
/// `ToBeSettled` trade.
pub fn assemble_trades(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    order_ids: &[String],
    policy: ResolutionPolicy,
) -> Result<AssemblyReport, EngineError> {
    if order_ids.is_empty() {
        return Err(EngineError::NoPendingOrders);
    }

    let outcome: MatchOutcome = match_orders(state, identities, order_ids, policy)?;
    if outcome.groups.is_empty() {
        return Err(EngineError::NoMatchFound);
    }

    let mut report = AssemblyReport {
        trades: Vec::with_capacity(outcome.groups.len()),
        skipped_order_ids: outcome.skipped().map(str::to_string).collect(),
    };

    for (product, members) in &outcome.groups {
        let trade_id = identities.next(&mut state.counters, IdentityClass::TradeObject)?;
        let order_trade_number = identities.next(&mut state.counters, IdentityClass::TradeOrderNumber)?;

        let mut confirmation_ids = Vec::with_capacity(members.len());
        for order_id in members {
            let order = state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| EngineError::NotFound(format!("order {}", order_id)))?;
            order.trade_id = Some(trade_id.clone());
            let confirmation_id = order.confirmation_id.clone().ok_or_else(|| {
                EngineError::InvalidArgument(format!("order {} has no confirmation id", order_id))
            })?;
            confirmation_ids.push(confirmation_id);
        }

        state
            .trades
            .insert(trade_id.clone(), Trade::new(trade_id.clone(), order_trade_number.clone()));
        state
            .trade_settlement
            .insert(trade_id.clone(), confirmation_ids.clone());

        tracing::debug!(trade_id = %trade_id, product = %product, members = members.len(), "Trade assembled.");
        report.trades.push(AssembledTrade {
            trade_id,
            order_trade_number,
            product: product.clone(),
            order_ids: members.clone(),
            confirmation_ids,
        });
    }

    Ok(report)
}
