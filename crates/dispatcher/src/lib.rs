//! # Ledger Dispatcher Crate
//!
//! The dispatch surface of the ledger. A call is a function name plus
//! positional string arguments; it is parsed into a closed [`Operation`] or
//! [`Query`] with a static argument schema, executed against the engine, and
//! answered with a JSON value or a named error.

use engine::LedgerEngine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

pub mod error;
pub mod operation;
pub mod query;
pub mod signature;

pub use error::DispatchError;
pub use operation::Operation;
pub use query::Query;
pub use signature::Signature;

/// One named call, as read from a batch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Call {
    pub fn new(function: impl Into<String>, args: Vec<String>) -> Self {
        Self { function: function.into(), args }
    }
}

pub struct Dispatcher {
    engine: LedgerEngine,
}

impl Dispatcher {
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Runs a state-changing operation. Query names are rejected here.
    pub async fn invoke(&self, function: &str, args: &[String]) -> Result<Value, DispatchError> {
        let span = tracing::info_span!("dispatch", request_id = %Uuid::new_v4(), function = %function);
        async move {
            let operation = Operation::parse(function, args)?;
            let result = operation.execute(&self.engine).await?;
            tracing::info!("Operation completed.");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Answers a read-only query from a fresh snapshot.
    pub async fn query(&self, function: &str, args: &[String]) -> Result<Value, DispatchError> {
        let span = tracing::info_span!("dispatch", request_id = %Uuid::new_v4(), function = %function);
        async move {
            let query = Query::parse(function, args)?;
            let state = self.engine.snapshot().await?;
            let result = query.run(&state)?;
            tracing::debug!("Query answered.");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Routes a call to `invoke` or `query` by its name. Names that are
    /// neither fail as unknown queries.
    pub async fn dispatch(&self, call: &Call) -> Result<Value, DispatchError> {
        if Operation::signature_of(&call.function).is_some() {
            self.invoke(&call.function, &call.args).await
        } else {
            self.query(&call.function, &call.args).await
        }
    }

    /// Runs calls in order. A failing call is reported in place and does not
    /// stop the ones after it.
    pub async fn run_batch(&self, calls: &[Call]) -> Vec<Value> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let entry = match self.dispatch(call).await {
                Ok(result) => json!({ "function": call.function, "result": result }),
                Err(e) => {
                    let mut payload = e.to_payload();
                    payload["function"] = Value::String(call.function.clone());
                    payload
                }
            };
            results.push(entry);
        }
        results
    }
}
