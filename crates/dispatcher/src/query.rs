use crate::error::DispatchError;
use crate::signature::{non_empty, Signature};
use core_types::{OrderStatus, TradeStatus};
use engine::{query, LedgerState};
use serde_json::Value;

/// The read-only calls the ledger answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    OrdersForFi { fi_id: String, status: Option<OrderStatus> },
    OrdersForBroker { broker_id: String, status: Option<OrderStatus> },
    OrdersForExchange { status: TradeStatus, exchange: Option<String> },
    OrdersForCustodian { custodian_id: String },
    HoldingsForFi { fi_id: String },
    TransactionsForFiProduct { fi_id: String, product: String },
    AllOrders,
    TradesForSettlement,
}

const ORDERS_FOR_FI: Signature = Signature::new("getAllOrdersForFIBasedOnStatus", &["fiID", "status"]);
const ORDERS_FOR_BROKER: Signature = Signature::new("getAllOrdersForBrokerBasedOnStatus", &["brokerID", "status"]);
const ORDERS_FOR_EXCHANGE: Signature =
    Signature::with_optional("getAllOrdersForSEBasedOnStatus", &["status", "exchange"], 1);
const ORDERS_FOR_CUSTODIAN: Signature =
    Signature::new("getAllOrdersForCustodianBasedOnStatus", &["custodianBankID"]);
const HOLDINGS_FOR_FI: Signature = Signature::new("getAllHoldingsForFI", &["fiID"]);
const TRANSACTIONS_FOR_FI_PRODUCT: Signature =
    Signature::new("getAllTransactionsForFIBasedOnStockId", &["fiID", "product"]);
const ALL_ORDERS: Signature = Signature::new("getAllOrdersForFIMap", &[]);
const TRADES_FOR_SETTLEMENT: Signature = Signature::new("getAllTradesForSettlement", &[]);

fn order_status(raw: &str) -> Result<Option<OrderStatus>, DispatchError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|e: core_types::CoreError| DispatchError::MalformedArgument {
        param: "status",
        reason: e.to_string(),
    })
}

impl Query {
    pub const SIGNATURES: [Signature; 8] = [
        ORDERS_FOR_FI,
        ORDERS_FOR_BROKER,
        ORDERS_FOR_EXCHANGE,
        ORDERS_FOR_CUSTODIAN,
        HOLDINGS_FOR_FI,
        TRANSACTIONS_FOR_FI_PRODUCT,
        ALL_ORDERS,
        TRADES_FOR_SETTLEMENT,
    ];

    pub fn signature_of(function: &str) -> Option<Signature> {
        Self::SIGNATURES.into_iter().find(|s| s.function == function)
    }

    pub fn parse(function: &str, args: &[String]) -> Result<Self, DispatchError> {
        let signature =
            Self::signature_of(function).ok_or_else(|| DispatchError::UnknownFunction(function.to_string()))?;
        signature.check(args)?;

        let query = match signature.function {
            "getAllOrdersForFIBasedOnStatus" => Query::OrdersForFi {
                fi_id: args[0].clone(),
                status: order_status(&args[1])?,
            },
            "getAllOrdersForBrokerBasedOnStatus" => Query::OrdersForBroker {
                broker_id: args[0].clone(),
                status: order_status(&args[1])?,
            },
            "getAllOrdersForSEBasedOnStatus" => Query::OrdersForExchange {
                status: args[0].parse().map_err(|e: core_types::CoreError| DispatchError::MalformedArgument {
                    param: "status",
                    reason: e.to_string(),
                })?,
                exchange: non_empty(args.get(1)).map(str::to_string),
            },
            "getAllOrdersForCustodianBasedOnStatus" => Query::OrdersForCustodian {
                custodian_id: args[0].clone(),
            },
            "getAllHoldingsForFI" => Query::HoldingsForFi { fi_id: args[0].clone() },
            "getAllTransactionsForFIBasedOnStockId" => Query::TransactionsForFiProduct {
                fi_id: args[0].clone(),
                product: args[1].clone(),
            },
            "getAllOrdersForFIMap" => Query::AllOrders,
            _ => Query::TradesForSettlement,
        };
        Ok(query)
    }

    pub fn function(&self) -> &'static str {
        match self {
            Query::OrdersForFi { .. } => ORDERS_FOR_FI.function,
            Query::OrdersForBroker { .. } => ORDERS_FOR_BROKER.function,
            Query::OrdersForExchange { .. } => ORDERS_FOR_EXCHANGE.function,
            Query::OrdersForCustodian { .. } => ORDERS_FOR_CUSTODIAN.function,
            Query::HoldingsForFi { .. } => HOLDINGS_FOR_FI.function,
            Query::TransactionsForFiProduct { .. } => TRANSACTIONS_FOR_FI_PRODUCT.function,
            Query::AllOrders => ALL_ORDERS.function,
            Query::TradesForSettlement => TRADES_FOR_SETTLEMENT.function,
        }
    }

    /// Evaluates the query against a snapshot.
    pub fn run(&self, state: &LedgerState) -> Result<Value, DispatchError> {
        let value = match self {
            Query::OrdersForFi { fi_id, status } => serde_json::to_value(query::orders_for_fi(state, fi_id, *status)?)?,
            Query::OrdersForBroker { broker_id, status } => {
                serde_json::to_value(query::orders_for_broker(state, broker_id, *status)?)?
            }
            Query::OrdersForExchange { status, exchange } => {
                serde_json::to_value(query::orders_for_exchange(state, *status, exchange.as_deref()))?
            }
            Query::OrdersForCustodian { custodian_id } => {
                serde_json::to_value(query::orders_for_custodian(state, custodian_id))?
            }
            Query::HoldingsForFi { fi_id } => serde_json::to_value(query::holdings_for_fi(state, fi_id)?)?,
            Query::TransactionsForFiProduct { fi_id, product } => {
                serde_json::to_value(query::transactions_for_fi_product(state, fi_id, product)?)?
            }
            Query::AllOrders => serde_json::to_value(query::all_orders(state)?)?,
            Query::TradesForSettlement => serde_json::to_value(query::trades_for_settlement(state))?,
        };
        Ok(value)
    }
}
