use chrono::{DateTime, Utc};
use configuration::{Config, LedgerSettings, SeedSettings};
use core_types::{IdentityClass, Order};
use database::StateStore;
use std::sync::Arc;

pub mod assembler;
pub mod error;
pub mod identity;
pub mod matching;
pub mod query;
pub mod registry;
pub mod settlement;
pub mod state;

pub use assembler::{AssembledTrade, AssemblyReport};
pub use error::EngineError;
pub use identity::IdentityGenerator;
pub use matching::{MatchOutcome, Resolution, ResolutionPolicy};
pub use settlement::{SeedReport, SettlementReport};
pub use state::LedgerState;

/// The ledger engine: owns the settings and the state-store handle, and runs
/// each operation as one load-mutate-commit cycle.
///
/// Callers are expected to serialize operations against one store; the
/// engine does no locking of its own. A failed operation commits nothing.
pub struct LedgerEngine {
    store: Arc<dyn StateStore>,
    identities: IdentityGenerator,
    ledger: LedgerSettings,
    seed: SeedSettings,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn StateStore>, config: &Config) -> Self {
        Self {
            store,
            identities: IdentityGenerator::new(config.identity.clone()),
            ledger: config.ledger.clone(),
            seed: config.seed.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    fn resolution_policy(&self) -> ResolutionPolicy {
        if self.ledger.strict_resolution {
            ResolutionPolicy::Strict
        } else {
            ResolutionPolicy::BestEffort
        }
    }

    /// Loads a consistent snapshot of the whole ledger.
    pub async fn snapshot(&self) -> Result<LedgerState, EngineError> {
        LedgerState::load(self.store.as_ref())
            .await
            .map_err(EngineError::StateUnavailable)
    }

    /// Commits the difference between `original` and `updated` as one batch.
    async fn commit(&self, original: &LedgerState, updated: &LedgerState) -> Result<(), database::DbError> {
        let batch = updated.stage_changes(original)?;
        if batch.is_empty() {
            return Ok(());
        }
        let keys = batch.len();
        self.store.commit(batch).await?;
        tracing::debug!(keys, "Ledger state committed.");
        Ok(())
    }

    /// Issues one identity directly against the store.
    pub async fn next_identity(&self, class: IdentityClass) -> Result<String, EngineError> {
        self.identities.issue(self.store.as_ref(), class).await
    }

    pub async fn place_orders(&self, orders: Vec<Order>) -> Result<Vec<String>, EngineError> {
        let original = self.snapshot().await?;
        let mut state = original.clone();

        let placed = registry::place_orders(&mut state, &self.identities, orders, Utc::now())?;

        self.commit(&original, &state).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to persist placed orders.");
            EngineError::PersistenceFailure(e)
        })?;
        tracing::info!(count = placed.len(), "Orders placed.");
        Ok(placed)
    }

    pub async fn lookup(&self, order_id: &str) -> Result<Order, EngineError> {
        let state = self.snapshot().await?;
        registry::lookup(&state, order_id).cloned()
    }

    /// Matches and confirms a batch without creating trades.
    pub async fn match_orders(&self, order_ids: &[String]) -> Result<MatchOutcome, EngineError> {
        let original = self.snapshot().await?;
        let mut state = original.clone();

        let outcome = matching::match_orders(&mut state, &self.identities, order_ids, self.resolution_policy())?;

        self.commit(&original, &state).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to persist confirmed orders.");
            EngineError::PersistenceFailure(e)
        })?;
        Ok(outcome)
    }

    /// Matches a batch and turns every product group into a trade, committing
    /// confirmations and trades together.
    pub async fn assemble_trades(&self, order_ids: &[String]) -> Result<AssemblyReport, EngineError> {
        let original = self.snapshot().await?;
        let mut state = original.clone();

        let report = assembler::assemble_trades(&mut state, &self.identities, order_ids, self.resolution_policy())?;

        self.commit(&original, &state).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to persist assembled trades.");
            EngineError::PersistenceFailure(e)
        })?;
        tracing::info!(
            trades = report.trades.len(),
            skipped = report.skipped_order_ids.len(),
            "Trades assembled."
        );
        Ok(report)
    }

    pub async fn clear_and_settle(&self, settled_at: DateTime<Utc>) -> Result<SettlementReport, EngineError> {
        let original = self.snapshot().await?;
        let mut state = original.clone();

        let report = settlement::clear_and_settle(&mut state, &self.identities, settled_at, self.ledger.opening_balance)?;

        self.commit(&original, &state).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to persist settlement.");
            EngineError::SettlementFailure(e.to_string())
        })?;
        tracing::info!(
            trades = report.trade_ids.len(),
            transactions = report.transaction_ids.len(),
            skipped = report.skipped_members.len(),
            "Trades cleared and settled."
        );
        Ok(report)
    }

    pub async fn seed_initial_transactions(&self, at: DateTime<Utc>) -> Result<SeedReport, EngineError> {
        let original = self.snapshot().await?;
        let mut state = original.clone();

        let report = settlement::seed_initial_transactions(&mut state, &self.identities, &self.seed.holdings, at)?;

        self.commit(&original, &state).await.map_err(|e| {
            tracing::error!(error = ?e, "Failed to persist seed transactions.");
            EngineError::PersistenceFailure(e)
        })?;
        if report.seeded {
            tracing::info!(transactions = report.transaction_ids.len(), "Initial transactions seeded.");
        }
        Ok(report)
    }
}
