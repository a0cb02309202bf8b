use crate::error::DispatchError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

/// The static argument schema of a dispatchable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub function: &'static str,
    /// Positional parameter names, required ones first.
    pub params: &'static [&'static str],
    /// How many trailing parameters may be omitted.
    pub optional: usize,
}

impl Signature {
    pub const fn new(function: &'static str, params: &'static [&'static str]) -> Self {
        Self { function, params, optional: 0 }
    }

    pub const fn with_optional(function: &'static str, params: &'static [&'static str], optional: usize) -> Self {
        Self { function, params, optional }
    }

    pub fn required(&self) -> usize {
        self.params.len() - self.optional
    }

    /// Rejects an argument list of the wrong length.
    pub fn check(&self, args: &[String]) -> Result<(), DispatchError> {
        let (min, max) = (self.required(), self.params.len());
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            };
            return Err(DispatchError::Arity {
                function: self.function,
                expected,
                actual: args.len(),
            });
        }
        Ok(())
    }
}

pub(crate) fn parse_json<T: DeserializeOwned>(param: &'static str, raw: &str) -> Result<T, DispatchError> {
    serde_json::from_str(raw).map_err(|e| DispatchError::MalformedArgument {
        param,
        reason: e.to_string(),
    })
}

pub(crate) fn parse_timestamp(param: &'static str, raw: &str) -> Result<DateTime<Utc>, DispatchError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DispatchError::MalformedArgument {
            param,
            reason: format!("'{}' is not an RFC 3339 timestamp: {}", raw, e),
        })
}

/// Treats an empty string as an omitted optional argument.
pub(crate) fn non_empty(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}
