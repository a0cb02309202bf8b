use crate::error::EngineError;
use crate::identity::IdentityGenerator;
use crate::state::LedgerState;
use chrono::{DateTime, Utc};
use core_types::{IdentityClass, Order, OrderStatus};

/// Registers a batch of client orders.
///
/// Every order gets a fresh order id, starts as `Placed`, and is indexed by
/// FI and by broker. Client-supplied engine fields (ids, status, owning
/// trade) are overwritten. Returns the new ids in input order.
pub fn place_orders(
    state: &mut LedgerState,
    identities: &IdentityGenerator,
    orders: Vec<Order>,
    now: DateTime<Utc>,
) -> Result<Vec<String>, EngineError> {
    if orders.is_empty() {
        return Err(EngineError::InvalidArgument("order batch is empty".to_string()));
    }

    let mut placed = Vec::with_capacity(orders.len());
    for mut order in orders {
        order.validate()?;

        let order_id = identities.next(&mut state.counters, IdentityClass::Order)?;
        order.order_id = order_id.clone();
        order.confirmation_id = None;
        order.status = OrderStatus::Placed;
        order.trade_id = None;
        order.created_at = Some(order.created_at.unwrap_or(now));

        state
            .orders_by_fi
            .entry(order.fi_id.clone())
            .or_default()
            .push(order_id.clone());
        state
            .orders_by_broker
            .entry(order.broker_id.clone())
            .or_default()
            .push(order_id.clone());

        tracing::debug!(
            order_id = %order_id,
            fi = %order.fi_id,
            product = %order.product,
            direction = ?order.direction,
            quantity = order.quantity,
            "Order placed."
        );
        state.orders.insert(order_id.clone(), order);
        placed.push(order_id);
    }

    Ok(placed)
}

/// Fetches one order by id.
pub fn lookup<'a>(state: &'a LedgerState, order_id: &str) -> Result<&'a Order, EngineError> {
    state
        .orders
        .get(order_id)
        .ok_or_else(|| EngineError::NotFound(format!("order {}", order_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Direction;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn empty_batch_is_rejected() {
        let mut state = LedgerState::default();
        let err = place_orders(&mut state, &IdentityGenerator::default(), vec![], now()).unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
        assert!(state.counters.is_empty());
    }

    #[test]
    fn placed_orders_are_indexed_and_reset() {
        let mut state = LedgerState::default();
        let mut tampered = Order::new("FI1", "B1", "TCS", Direction::Buy, 100);
        tampered.status = OrderStatus::Confirmed;
        tampered.confirmation_id = Some("99999".to_string());
        let orders = vec![tampered, Order::new("FI2", "B1", "TCS", Direction::Sell, 100)];

        let ids = place_orders(&mut state, &IdentityGenerator::default(), orders, now()).unwrap();
        assert_eq!(ids, vec!["10000", "10001"]);

        let first = lookup(&state, "10000").unwrap();
        assert_eq!(first.status, OrderStatus::Placed);
        assert_eq!(first.confirmation_id, None);
        assert!(first.created_at.is_some());

        assert_eq!(state.orders_by_fi["FI1"], vec!["10000"]);
        assert_eq!(state.orders_by_fi["FI2"], vec!["10001"]);
        assert_eq!(state.orders_by_broker["B1"], vec!["10000", "10001"]);
    }

    #[test]
    fn invalid_order_fails_the_batch() {
        let mut state = LedgerState::default();
        let orders = vec![
            Order::new("FI1", "B1", "TCS", Direction::Buy, 100),
            Order::new("FI2", "B1", "TCS", Direction::Sell, 0),
        ];
        let err = place_orders(&mut state, &IdentityGenerator::default(), orders, now()).unwrap_err();
        assert_eq!(err.code(), "InvalidArgument");
    }

    #[test]
    fn unknown_order_is_not_found() {
        let state = LedgerState::default();
        assert_eq!(lookup(&state, "10000").unwrap_err().code(), "NotFound");
    }
}
