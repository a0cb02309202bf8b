use core_types::CoreError;
use database::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Orders do not net to zero for product(s): {}", .products.join(", "))]
    UnbalancedOrders { products: Vec<String> },

    #[error("None of the submitted orders could be matched.")]
    NoMatchFound,

    #[error("No pending orders were submitted.")]
    NoPendingOrders,

    #[error("Failed to persist ledger state: {0}")]
    PersistenceFailure(#[source] DbError),

    #[error("State store unavailable: {0}")]
    StateUnavailable(#[source] DbError),

    #[error("Settlement failed: {0}")]
    SettlementFailure(String),

    #[error("Domain rule violated: {0}")]
    Core(#[from] CoreError),
}

impl EngineError {
    /// The stable name of the error kind, as reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) | EngineError::Core(_) => "InvalidArgument",
            EngineError::NotFound(_) => "NotFound",
            EngineError::UnbalancedOrders { .. } => "UnbalancedOrders",
            EngineError::NoMatchFound => "NoMatchFound",
            EngineError::NoPendingOrders => "NoPendingOrders",
            EngineError::PersistenceFailure(_) => "PersistenceFailure",
            EngineError::StateUnavailable(_) => "StateUnavailable",
            EngineError::SettlementFailure(_) => "SettlementFailure",
        }
    }
}
