use core_types::IdentityClass;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional; a missing section takes its defaults so the
/// ledger can run from environment variables alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

/// Which state-store collaborator backs the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum StoreBackend {
    /// Process-local map. State is lost when the process exits.
    #[default]
    Memory,
    /// PostgreSQL `ledger_state` table. Reads `DATABASE_URL` from the environment.
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Upper bound of the PostgreSQL connection pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long to wait for a pooled connection before giving up.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 { 10 }
fn default_acquire_timeout_secs() -> u64 { 5 }

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Starting values of the five identity sequences. Only used when the
/// counters do not exist yet in the store.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitySettings {
    #[serde(default = "default_order_base")]
    pub order_base: u64,
    #[serde(default = "default_confirmed_order_base")]
    pub confirmed_order_base: u64,
    #[serde(default = "default_trade_object_base")]
    pub trade_object_base: u64,
    #[serde(default = "default_trade_order_number_base")]
    pub trade_order_number_base: u64,
    #[serde(default = "default_transaction_base")]
    pub transaction_base: u64,
}

fn default_order_base() -> u64 { IdentityClass::Order.default_base() }
fn default_confirmed_order_base() -> u64 { IdentityClass::ConfirmedOrder.default_base() }
fn default_trade_object_base() -> u64 { IdentityClass::TradeObject.default_base() }
fn default_trade_order_number_base() -> u64 { IdentityClass::TradeOrderNumber.default_base() }
fn default_transaction_base() -> u64 { IdentityClass::Transaction.default_base() }

impl IdentitySettings {
    pub fn base_for(&self, class: IdentityClass) -> u64 {
        match class {
            IdentityClass::Order => self.order_base,
            IdentityClass::ConfirmedOrder => self.confirmed_order_base,
            IdentityClass::TradeObject => self.trade_object_base,
            IdentityClass::TradeOrderNumber => self.trade_order_number_base,
            IdentityClass::Transaction => self.transaction_base,
        }
    }
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            order_base: default_order_base(),
            confirmed_order_base: default_confirmed_order_base(),
            trade_object_base: default_trade_object_base(),
            trade_order_number_base: default_trade_order_number_base(),
            transaction_base: default_transaction_base(),
        }
    }
}

/// Behavioural switches of the matching and settlement steps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerSettings {
    /// Balance assumed before the first entry of a chain that was never seeded.
    #[serde(default)]
    pub opening_balance: i64,
    /// When true, an unknown order id fails the whole matching batch with
    /// `NotFound` instead of being skipped.
    #[serde(default)]
    pub strict_resolution: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_file_prefix() -> String { "trade-ledger.log".to_string() }

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

/// Opening positions credited by the seed step.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedSettings {
    #[serde(default)]
    pub holdings: Vec<SeedHolding>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedHolding {
    pub fi_id: String,
    pub account_id: String,
    pub product: String,
    pub stock_id: String,
    pub quantity: u64,
}

impl SeedHolding {
    fn new(fi_id: &str, account_id: &str, product: &str, stock_id: &str, quantity: u64) -> Self {
        Self {
            fi_id: fi_id.to_string(),
            account_id: account_id.to_string(),
            product: product.to_string(),
            stock_id: stock_id.to_string(),
            quantity,
        }
    }
}

// The demo book: four FIs, each holding two of the four listed products.
impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            holdings: vec![
                SeedHolding::new("FI1", "Acct001", "TCS", "1111", 1000),
                SeedHolding::new("FI2", "Acct002", "IBM", "2222", 1000),
                SeedHolding::new("FI3", "Acct003", "INFY", "3333", 1000),
                SeedHolding::new("FI4", "Acct004", "GOOGLE", "4444", 1000),
                SeedHolding::new("FI1", "Acct001", "IBM", "2222", 500),
                SeedHolding::new("FI2", "Acct002", "TCS", "1111", 500),
                SeedHolding::new("FI3", "Acct003", "GOOGLE", "4444", 500),
                SeedHolding::new("FI4", "Acct004", "INFY", "3333", 500),
            ],
        }
    }
}
