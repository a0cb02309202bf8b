use engine::EngineError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: &'static str,
        expected: String,
        actual: usize,
    },

    #[error("Malformed argument '{param}': {reason}")]
    MalformedArgument { param: &'static str, reason: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to encode the result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// The stable name of the error kind, as reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownFunction(_)
            | DispatchError::Arity { .. }
            | DispatchError::MalformedArgument { .. } => "InvalidArgument",
            DispatchError::Engine(e) => e.code(),
            DispatchError::Encode(_) => "EncodingFailure",
        }
    }

    /// Renders the error as the payload returned to the caller.
    pub fn to_payload(&self) -> Value {
        match self {
            DispatchError::Engine(
                e @ (EngineError::PersistenceFailure(_)
                | EngineError::StateUnavailable(_)
                | EngineError::SettlementFailure(_)),
            ) => {
                tracing::error!(error = ?e, "State store error.");
            }
            DispatchError::Encode(e) => {
                tracing::error!(error = ?e, "Encoding error.");
            }
            other => {
                tracing::warn!(error = %other, "Call rejected.");
            }
        }

        json!({ "error": self.code(), "message": self.to_string() })
    }
}
