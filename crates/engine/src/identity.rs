use crate::error::EngineError;
use crate::state::Counters;
use configuration::IdentitySettings;
use core_types::{CoreError, IdentityClass};
use database::{get_json, StateKey, StateStore, WriteBatch};

/// Hands out identities for the five identity classes.
///
/// Each class is an independent counter starting at its configured base.
/// Values are rendered as decimal strings and are never reused.
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    bases: IdentitySettings,
}

impl IdentityGenerator {
    pub fn new(bases: IdentitySettings) -> Self {
        Self { bases }
    }

    /// Takes the next identity of `class` from `counters`, leaving the
    /// post-increment value behind. The counters are persisted together with
    /// the rest of the operation's writes, so an identity is only ever
    /// observable once its operation has committed.
    pub fn next(&self, counters: &mut Counters, class: IdentityClass) -> Result<String, EngineError> {
        let current = counters.entry(class).or_insert_with(|| self.bases.base_for(class));
        let issued = *current;
        *current = issued
            .checked_add(1)
            .ok_or_else(|| CoreError::Overflow(format!("{} identity counter", class)))?;
        Ok(issued.to_string())
    }

    /// Issues one identity straight against the store: read the counters,
    /// persist the incremented value, then return the identity.
    ///
    /// Nothing is cached between calls, so a failed write leaves no trace.
    pub async fn issue<S: StateStore + ?Sized>(
        &self,
        store: &S,
        class: IdentityClass,
    ) -> Result<String, EngineError> {
        let mut counters: Counters = get_json(store, StateKey::Counters)
            .await
            .map_err(EngineError::StateUnavailable)?
            .unwrap_or_default();

        let identity = self.next(&mut counters, class)?;

        let mut batch = WriteBatch::new();
        batch
            .put_json(StateKey::Counters, &counters)
            .map_err(EngineError::StateUnavailable)?;
        store.commit(batch).await.map_err(EngineError::StateUnavailable)?;

        tracing::debug!(%class, %identity, "Issued identity.");
        Ok(identity)
    }
}

/// Ordering key that puts identities in the order they were issued.
///
/// Identities are decimal counters without leading zeros, so plain string
/// order breaks once a class gains a digit ("100000" < "99999").
pub fn issue_order(id: &str) -> (usize, &str) {
    (id.len(), id)
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new(IdentitySettings::default())
    }
}
