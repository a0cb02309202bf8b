use crate::error::ConfigError;
use core_types::IdentityClass;
use std::collections::HashSet;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, IdentitySettings, LedgerSettings, LoggingSettings, SeedHolding, SeedSettings, StoreBackend,
    StoreSettings,
};

/// Prefix of the environment variables that override file settings,
/// e.g. `LEDGER__STORE__BACKEND=postgres`.
pub const ENV_PREFIX: &str = "LEDGER";

/// Loads the application configuration.
///
/// The TOML file at `path` is optional; environment variables prefixed with
/// `LEDGER__` are layered on top of it. The result is validated before it is
/// returned.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(path = %path.display(), backend = ?config.store.backend, "Configuration loaded.");
    Ok(config)
}

/// Rejects settings the engine cannot run with.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let mut bases = HashSet::new();
    for class in IdentityClass::ALL {
        if !bases.insert(config.identity.base_for(class)) {
            return Err(ConfigError::ValidationError(format!(
                "identity base for {} duplicates another class",
                class
            )));
        }
    }

    if config.store.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "store.max_connections must be greater than 0".to_string(),
        ));
    }

    let mut chains = HashSet::new();
    for holding in &config.seed.holdings {
        if holding.quantity == 0 {
            return Err(ConfigError::ValidationError(format!(
                "seed holding {}/{} has zero quantity",
                holding.fi_id, holding.product
            )));
        }
        if !chains.insert((holding.fi_id.as_str(), holding.product.as_str())) {
            return Err(ConfigError::ValidationError(format!(
                "seed holding {}/{} is listed twice",
                holding.fi_id, holding.product
            )));
        }
    }

    Ok(())
}
