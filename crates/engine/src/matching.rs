use crate::error::EngineError;
use crate::identity::IdentityGenerator;
use crate::state::LedgerState;
use core_types::{CoreError, IdentityClass, OrderStatus};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// What to do with an order id that is not in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPolicy {
    /// Skip it and record the skip.
    #[default]
    BestEffort,
    /// Fail the whole batch with `NotFound`.
    Strict,
}

/// The fate of one submitted order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "orderID", rename_all = "camelCase")]
pub enum Resolution {
    Resolved(String),
    Skipped(String),
}

/// Result of a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchOutcome {
    /// Product -> member order ids, in input order.
    pub groups: BTreeMap<String, Vec<String>>,
    /// One entry per submitted id, in input order.
    pub resolutions: Vec<Resolution>,
}

impl MatchOutcome {
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.resolutions.iter().filter_map(|r| match r {
            Resolution::Skipped(id) => Some(id.as_str()),
            Resolution::Resolved(_) => None,
        })
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped().count()
    }

    pub fn resolved_count(&self) -> usize {
        self.resolutions.len() - self.skipped_count()
    }
}

/// Validates that the resolved orders net to zero per product and, if they
/// do, confirms every one of them.
///
/// Nothing in `state` is touched unless every product balances.
pub fn match_orders(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    order_ids: &[String],
    policy: ResolutionPolicy,
) -> Result<MatchOutcome, EngineError> {
    let mut seen = HashSet::new();
    let mut outcome = MatchOutcome::default();
    let mut nets: BTreeMap<String, i64> = BTreeMap::new();

    for order_id in order_ids {
        if !seen.insert(order_id.as_str()) {
            return Err(EngineError::InvalidArgument(format!(
                "order {} appears more than once in the batch",
                order_id
            )));
        }

        let Some(order) = state.orders.get(order_id) else {
            if policy == ResolutionPolicy::Strict {
                return Err(EngineError::NotFound(format!("order {}", order_id)));
            }
            tracing::warn!(order_id = %order_id, "Skipping unknown order id during matching.");
            outcome.resolutions.push(Resolution::Skipped(order_id.clone()));
            continue;
        };

        if order.status != OrderStatus::Placed {
            return Err(EngineError::InvalidArgument(format!(
                "order {} is already {}",
                order_id, order.status
            )));
        }

        let net = nets.entry(order.product.clone()).or_insert(0);
        *net = net
            .checked_add(order.signed_quantity()?)
            .ok_or_else(|| CoreError::Overflow(format!("net quantity of {}", order.product)))?;

        outcome
            .groups
            .entry(order.product.clone())
            .or_default()
            .push(order_id.clone());
        outcome.resolutions.push(Resolution::Resolved(order_id.clone()));
    }

    let unbalanced: Vec<String> = nets
        .iter()
        .filter(|(_, net)| **net != 0)
        .map(|(product, _)| product.clone())
        .collect();
    if !unbalanced.is_empty() {
        tracing::info!(?nets, "Batch rejected: orders do not net to zero.");
        return Err(EngineError::UnbalancedOrders { products: unbalanced });
    }

    for resolution in &outcome.resolutions {
        let Resolution::Resolved(order_id) = resolution else {
            continue;
        };
        let confirmation_id = identities.next(&mut state.counters, IdentityClass::ConfirmedOrder)?;
        let order = state
            .orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::NotFound(format!("order {}", order_id)))?;
        order.confirm(confirmation_id.clone())?;
        state.confirmed_to_order.insert(confirmation_id, order_id.clone());
    }

    tracing::info!(
        groups = outcome.groups.len(),
        confirmed = outcome.resolved_count(),
        skipped = outcome.skipped_count(),
        "Orders matched."
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::place_orders;
    use chrono::Utc;
    use core_types::{Direction, Order};

    fn book(orders: Vec<Order>) -> (LedgerState, IdentityGenerator, Vec<String>) {
        let mut state = LedgerState::default();
        let identities = IdentityGenerator::default();
        let ids = place_orders(&mut state, &identities, orders, Utc::now()).unwrap();
        (state, identities, ids)
    }

    #[test]
    fn balanced_batch_confirms_in_input_order() {
        let (mut state, identities, ids) = book(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 100),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 100),
        ]);

        let outcome = match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap();
        assert_eq!(outcome.groups["TCS"], ids);
        assert_eq!(outcome.skipped_count(), 0);

        assert_eq!(state.orders[&ids[0]].confirmation_id.as_deref(), Some("20000"));
        assert_eq!(state.orders[&ids[1]].confirmation_id.as_deref(), Some("20001"));
        assert_eq!(state.confirmed_to_order["20001"], ids[1]);
    }

    #[test]
    fn unbalanced_batch_changes_nothing() {
        let (mut state, identities, ids) = book(vec![Order::new("FI1", "B1", "IBM", Direction::Buy, 50)]);
        let before = state.clone();

        let err = match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap_err();
        assert!(matches!(err, EngineError::UnbalancedOrders { ref products } if products == &vec!["IBM".to_string()]));
        assert_eq!(state, before);
    }

    #[test]
    fn unknown_ids_are_skipped_and_counted() {
        let (mut state, identities, mut ids) = book(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 10),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 10),
        ]);
        ids.insert(1, "99999".to_string());

        let outcome = match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap();
        assert_eq!(outcome.skipped().collect::<Vec<_>>(), vec!["99999"]);
        assert_eq!(outcome.resolved_count(), 2);
        assert_eq!(outcome.resolutions[1], Resolution::Skipped("99999".to_string()));
    }

    #[test]
    fn strict_policy_rejects_unknown_ids() {
        let (mut state, identities, mut ids) = book(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 10),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 10),
        ]);
        ids.push("99999".to_string());
        let before = state.clone();

        let err = match_orders(&mut state, &identities, &ids, ResolutionPolicy::Strict).unwrap_err();
        assert_eq!(err.code(), "NotFound");
        assert_eq!(state, before);
    }

    #[test]
    fn confirmed_and_duplicate_ids_are_rejected() {
        let (mut state, identities, ids) = book(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 10),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 10),
        ]);
        let duplicated = vec![ids[0].clone(), ids[0].clone()];
        assert_eq!(
            match_orders(&mut state, &identities, &duplicated, ResolutionPolicy::BestEffort)
                .unwrap_err()
                .code(),
            "InvalidArgument"
        );

        match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap();
        let again = match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap_err();
        assert_eq!(again.code(), "InvalidArgument");
    }

    #[test]
    fn products_are_netted_independently() {
        let (mut state, identities, ids) = book(vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 10),
            Order::new("FI2", "B1", "IBM", Direction::Sell, 10),
        ]);
        let err = match_orders(&mut state, &identities, &ids, ResolutionPolicy::BestEffort).unwrap_err();
        assert!(matches!(err, EngineError::UnbalancedOrders { ref products } if products.len() == 2));
    }
}
