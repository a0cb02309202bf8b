use crate::error::DispatchError;
use crate::signature::{parse_json, parse_timestamp, Signature};
use chrono::{DateTime, Utc};
use core_types::Order;
use engine::LedgerEngine;
use serde_json::{json, Value};

/// The state-changing calls the ledger accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `createOrdersByFI(ordersJSON)`
    CreateOrders(Vec<Order>),
    /// `processFIOrdersForConfirmationBySE(orderIDsJSON)`
    ConfirmAndAssemble(Vec<String>),
    /// `clearAndSettleTrades(timestamp)`
    ClearAndSettle(DateTime<Utc>),
    /// `setAllInitialTransactions(timestamp)`
    SeedInitialTransactions(DateTime<Utc>),
}

const CREATE_ORDERS: Signature = Signature::new("createOrdersByFI", &["ordersJSON"]);
const CONFIRM_AND_ASSEMBLE: Signature = Signature::new("processFIOrdersForConfirmationBySE", &["orderIDsJSON"]);
const CLEAR_AND_SETTLE: Signature = Signature::new("clearAndSettleTrades", &["timestamp"]);
const SEED: Signature = Signature::new("setAllInitialTransactions", &["timestamp"]);

impl Operation {
    pub const SIGNATURES: [Signature; 4] = [CREATE_ORDERS, CONFIRM_AND_ASSEMBLE, CLEAR_AND_SETTLE, SEED];

    pub fn signature_of(function: &str) -> Option<Signature> {
        Self::SIGNATURES.into_iter().find(|s| s.function == function)
    }

    /// Parses a named call. Unknown names and malformed arguments are rejected.
    pub fn parse(function: &str, args: &[String]) -> Result<Self, DispatchError> {
        let signature =
            Self::signature_of(function).ok_or_else(|| DispatchError::UnknownFunction(function.to_string()))?;
        signature.check(args)?;

        let operation = match signature.function {
            "createOrdersByFI" => Operation::CreateOrders(parse_json("ordersJSON", &args[0])?),
            "processFIOrdersForConfirmationBySE" => {
                Operation::ConfirmAndAssemble(parse_json("orderIDsJSON", &args[0])?)
            }
            "clearAndSettleTrades" => Operation::ClearAndSettle(parse_timestamp("timestamp", &args[0])?),
            _ => Operation::SeedInitialTransactions(parse_timestamp("timestamp", &args[0])?),
        };
        Ok(operation)
    }

    pub fn function(&self) -> &'static str {
        match self {
            Operation::CreateOrders(_) => CREATE_ORDERS.function,
            Operation::ConfirmAndAssemble(_) => CONFIRM_AND_ASSEMBLE.function,
            Operation::ClearAndSettle(_) => CLEAR_AND_SETTLE.function,
            Operation::SeedInitialTransactions(_) => SEED.function,
        }
    }

    /// Runs the operation and returns its JSON report.
    pub async fn execute(self, engine: &LedgerEngine) -> Result<Value, DispatchError> {
        let report = match self {
            Operation::CreateOrders(orders) => {
                let ids = engine.place_orders(orders).await?;
                json!({ "fiOrderIDs": ids })
            }
            Operation::ConfirmAndAssemble(order_ids) => serde_json::to_value(engine.assemble_trades(&order_ids).await?)?,
            Operation::ClearAndSettle(at) => serde_json::to_value(engine.clear_and_settle(at).await?)?,
            Operation::SeedInitialTransactions(at) => {
                serde_json::to_value(engine.seed_initial_transactions(at).await?)?
            }
        };
        Ok(report)
    }
}
