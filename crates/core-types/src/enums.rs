use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The side of an order. `BUY` adds to a holding, `SELL` removes from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }

    /// The ledger entry type produced when an order of this side settles.
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Direction::Buy => TransactionType::Credit,
            Direction::Sell => TransactionType::Debit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Market,
    #[default]
    Limit,
}

/// Lifecycle of an order. The only legal transition is `Placed -> Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
}

impl OrderStatus {
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!((self, next), (OrderStatus::Placed, OrderStatus::Confirmed))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Placed => write!(f, "Placed"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
        }
    }
}

/// Accepts both the short names (`Placed`) and the legacy query names
/// (`orderPlaced`), case-insensitively.
impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placed" | "orderplaced" => Ok(OrderStatus::Placed),
            "confirmed" | "orderconfirmed" => Ok(OrderStatus::Confirmed),
            _ => Err(CoreError::InvalidInput("order status".to_string(), s.to_string())),
        }
    }
}

/// Settlement lifecycle of a trade. `ToBeSettled -> SettledCleared` is irreversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradeStatus {
    #[default]
    ToBeSettled,
    SettledCleared,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::ToBeSettled => write!(f, "ToBeSettled"),
            TradeStatus::SettledCleared => write!(f, "SettledCleared"),
        }
    }
}

impl FromStr for TradeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tobesettled" => Ok(TradeStatus::ToBeSettled),
            "settledcleared" => Ok(TradeStatus::SettledCleared),
            _ => Err(CoreError::InvalidInput("trade status".to_string(), s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    /// Applies a quantity of this type to a prior running balance.
    /// Returns `None` on overflow.
    pub fn apply(&self, prior_balance: i64, quantity: u64) -> Option<i64> {
        let quantity = i64::try_from(quantity).ok()?;
        match self {
            TransactionType::Credit => prior_balance.checked_add(quantity),
            TransactionType::Debit => prior_balance.checked_sub(quantity),
        }
    }
}

/// The five independent identity sequences kept by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentityClass {
    #[serde(rename = "OrderID")]
    Order,
    #[serde(rename = "ConfirmedOrderID")]
    ConfirmedOrder,
    #[serde(rename = "TradeObjectID")]
    TradeObject,
    #[serde(rename = "TradeOrderID")]
    TradeOrderNumber,
    #[serde(rename = "TransactionID")]
    Transaction,
}

impl IdentityClass {
    pub const ALL: [IdentityClass; 5] = [
        IdentityClass::Order,
        IdentityClass::ConfirmedOrder,
        IdentityClass::TradeObject,
        IdentityClass::TradeOrderNumber,
        IdentityClass::Transaction,
    ];

    /// Starting value of the sequence. The offsets only keep the classes
    /// visually apart; uniqueness never depends on them.
    pub fn default_base(&self) -> u64 {
        match self {
            IdentityClass::Order => 10_000,
            IdentityClass::ConfirmedOrder => 20_000,
            IdentityClass::TradeObject => 30_000,
            IdentityClass::TradeOrderNumber => 40_000,
            IdentityClass::Transaction => 50_000,
        }
    }
}

impl fmt::Display for IdentityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentityClass::Order => "order",
            IdentityClass::ConfirmedOrder => "confirmed-order",
            IdentityClass::TradeObject => "trade-object",
            IdentityClass::TradeOrderNumber => "trade-order-number",
            IdentityClass::Transaction => "transaction",
        };
        write!(f, "{}", name)
    }
}
