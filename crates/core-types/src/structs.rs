use crate::enums::{Direction, OrderKind, OrderStatus, TradeStatus, TransactionType};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A request to buy or sell a quantity of one instrument on behalf of one FI
/// through one broker.
///
/// The engine-assigned fields (`order_id`, `confirmation_id`, `status`,
/// `trade_id`) default when absent so that clients can submit bare orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "fiOrderID", default)]
    pub order_id: String,
    #[serde(rename = "conOrderID", default, skip_serializing_if = "Option::is_none")]
    pub confirmation_id: Option<String>,
    #[serde(rename = "fiID")]
    pub fi_id: String,
    #[serde(rename = "custodianBankID", default)]
    pub custodian_id: String,
    #[serde(rename = "brokerID")]
    pub broker_id: String,
    #[serde(rename = "accountID", default)]
    pub account_id: String,
    pub product: String,
    #[serde(rename = "stockID", default)]
    pub stock_id: String,
    pub direction: Direction,
    pub quantity: u64,
    #[serde(default)]
    pub exchange: String,
    #[serde(rename = "orderValidity", default)]
    pub validity: String,
    #[serde(rename = "orderType", default)]
    pub kind: OrderKind,
    #[serde(rename = "limitPrice", default)]
    pub limit_price: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(rename = "creationDate", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "tradeObjectID", default, skip_serializing_if = "Option::is_none")]
    pub trade_id: Option<String>,
}

impl Order {
    /// Builds a minimal order; the remaining attributes take their defaults.
    pub fn new(
        fi_id: impl Into<String>,
        broker_id: impl Into<String>,
        product: impl Into<String>,
        direction: Direction,
        quantity: u64,
    ) -> Self {
        Self {
            order_id: String::new(),
            confirmation_id: None,
            fi_id: fi_id.into(),
            custodian_id: String::new(),
            broker_id: broker_id.into(),
            account_id: String::new(),
            product: product.into(),
            stock_id: String::new(),
            direction,
            quantity,
            exchange: String::new(),
            validity: String::new(),
            kind: OrderKind::default(),
            limit_price: Decimal::ZERO,
            status: OrderStatus::Placed,
            created_at: None,
            trade_id: None,
        }
    }

    /// Checks the client-supplied attributes the engine relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fi_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("fiID".to_string(), "must not be empty".to_string()));
        }
        if self.broker_id.trim().is_empty() {
            return Err(CoreError::InvalidInput("brokerID".to_string(), "must not be empty".to_string()));
        }
        if self.product.trim().is_empty() {
            return Err(CoreError::InvalidInput("product".to_string(), "must not be empty".to_string()));
        }
        if self.quantity == 0 {
            return Err(CoreError::InvalidInput("quantity".to_string(), "must be positive".to_string()));
        }
        if self.limit_price.is_sign_negative() {
            return Err(CoreError::InvalidInput(
                "limitPrice".to_string(),
                self.limit_price.to_string(),
            ));
        }
        Ok(())
    }

    /// Quantity with the sign of the direction: positive for BUY, negative for SELL.
    pub fn signed_quantity(&self) -> Result<i64, CoreError> {
        let quantity = i64::try_from(self.quantity)
            .map_err(|_| CoreError::Overflow(format!("quantity {} of order {}", self.quantity, self.order_id)))?;
        Ok(match self.direction {
            Direction::Buy => quantity,
            Direction::Sell => -quantity,
        })
    }

    /// Promotes a placed order. The confirmation identity can only be set once.
    pub fn confirm(&mut self, confirmation_id: String) -> Result<(), CoreError> {
        if !self.status.can_transition_to(OrderStatus::Confirmed) || self.confirmation_id.is_some() {
            return Err(CoreError::IllegalTransition {
                entity: "order",
                from: self.status.to_string(),
                to: OrderStatus::Confirmed.to_string(),
            });
        }
        self.status = OrderStatus::Confirmed;
        self.confirmation_id = Some(confirmation_id);
        Ok(())
    }
}

/// A settlement unit grouping confirmed orders of one product that net to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "tradeObjectID")]
    pub trade_id: String,
    #[serde(rename = "orderTradeNumber")]
    pub order_trade_number: String,
    #[serde(rename = "settlementStatus")]
    pub status: TradeStatus,
    #[serde(rename = "settlementDate", default, skip_serializing_if = "Option::is_none")]
    pub settlement_date: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn new(trade_id: String, order_trade_number: String) -> Self {
        Self {
            trade_id,
            order_trade_number,
            status: TradeStatus::ToBeSettled,
            settlement_date: None,
        }
    }

    /// Marks the trade cleared. Settling twice is rejected so the date is set exactly once.
    pub fn settle(&mut self, at: DateTime<Utc>) -> Result<(), CoreError> {
        if self.status != TradeStatus::ToBeSettled || self.settlement_date.is_some() {
            return Err(CoreError::IllegalTransition {
                entity: "trade",
                from: self.status.to_string(),
                to: TradeStatus::SettledCleared.to_string(),
            });
        }
        self.status = TradeStatus::SettledCleared;
        self.settlement_date = Some(at);
        Ok(())
    }
}

/// An immutable ledger entry: one settled order's effect on one FI's holding
/// of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "fiID")]
    pub fi_id: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    pub product: String,
    #[serde(rename = "stockID")]
    pub stock_id: String,
    pub quantity: u64,
    #[serde(rename = "txnType")]
    pub kind: TransactionType,
    pub balance: i64,
    #[serde(rename = "txnDate")]
    pub date: DateTime<Utc>,
}

impl Transaction {
    /// True when this entry is a valid successor of `prev` in a chain.
    pub fn follows(&self, prev: &Transaction) -> bool {
        self.kind.apply(prev.balance, self.quantity) == Some(self.balance)
    }
}
