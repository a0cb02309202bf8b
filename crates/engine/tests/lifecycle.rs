use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use configuration::Config;
use core_types::{Direction, Order, OrderStatus, TradeStatus, TransactionType};
use database::{DbError, MemoryStore, StateStore, WriteBatch};
use engine::{query, EngineError, LedgerEngine};
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Wraps a `MemoryStore` and rejects reads or commits on demand.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_commits: AtomicBool,
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, DbError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable(format!("read of {} refused", key)));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), DbError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(DbError::WriteRejected(key.to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), DbError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(DbError::WriteRejected(format!("{} keys", batch.len())));
        }
        self.inner.commit(batch).await
    }
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 3, 1, 16, 0, 0).unwrap()
}

fn order(fi: &str, product: &str, direction: Direction, quantity: u64) -> Order {
    let mut order = Order::new(fi, "BRK1", product, direction, quantity);
    order.exchange = "NSE".to_string();
    order.limit_price = dec!(101.25);
    order
}

fn engine_on(store: Arc<dyn StateStore>, config: &Config) -> LedgerEngine {
    LedgerEngine::new(store, config)
}

#[tokio::test]
async fn tcs_orders_match_assemble_and_settle() {
    let engine = engine_on(Arc::new(MemoryStore::new()), &Config::default());
    engine.seed_initial_transactions(at()).await.unwrap();

    let ids = engine
        .place_orders(vec![
            order("FI1", "TCS", Direction::Buy, 100),
            order("FI2", "TCS", Direction::Sell, 100),
        ])
        .await
        .unwrap();

    let report = engine.assemble_trades(&ids).await.unwrap();
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].product, "TCS");
    assert_eq!(report.trades[0].order_ids, ids);
    assert_eq!(report.trades[0].confirmation_ids.len(), 2);

    let settlement = engine.clear_and_settle(at()).await.unwrap();
    assert_eq!(settlement.transaction_ids.len(), 2);

    let state = engine.snapshot().await.unwrap();
    let buyer = state.chain_tail("FI1", "TCS").unwrap();
    assert_eq!((buyer.kind, buyer.balance), (TransactionType::Credit, 1100));
    let seller = state.chain_tail("FI2", "TCS").unwrap();
    assert_eq!((seller.kind, seller.balance), (TransactionType::Debit, 400));
    assert_eq!(state.trades[&report.trades[0].trade_id].status, TradeStatus::SettledCleared);
}

#[tokio::test]
async fn unbalanced_ibm_order_stays_placed() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_on(store.clone(), &Config::default());

    let ids = engine.place_orders(vec![order("FI1", "IBM", Direction::Buy, 50)]).await.unwrap();
    let before = store.snapshot().await;

    let err = engine.assemble_trades(&ids).await.unwrap_err();
    assert_eq!(err.code(), "UnbalancedOrders");
    assert_eq!(store.snapshot().await, before);

    let placed = engine.lookup(&ids[0]).await.unwrap();
    assert_eq!(placed.status, OrderStatus::Placed);
    assert_eq!(placed.confirmation_id, None);
}

#[tokio::test]
async fn seeding_twice_equals_seeding_once() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_on(store.clone(), &Config::default());

    assert!(engine.seed_initial_transactions(at()).await.unwrap().seeded);
    let once = store.snapshot().await;

    let again = engine.seed_initial_transactions(at()).await.unwrap();
    assert!(!again.seeded);
    assert_eq!(store.snapshot().await, once);
}

#[tokio::test]
async fn failed_commit_leaks_no_identities() {
    let store = Arc::new(FlakyStore::default());
    let engine = engine_on(store.clone(), &Config::default());

    let ids = engine
        .place_orders(vec![
            order("FI1", "TCS", Direction::Buy, 10),
            order("FI2", "TCS", Direction::Sell, 10),
        ])
        .await
        .unwrap();
    let before = store.inner.snapshot().await;

    store.fail_commits.store(true, Ordering::SeqCst);
    let err = engine.assemble_trades(&ids).await.unwrap_err();
    assert_eq!(err.code(), "PersistenceFailure");
    assert_eq!(store.inner.snapshot().await, before);

    store.fail_commits.store(false, Ordering::SeqCst);
    let report = engine.assemble_trades(&ids).await.unwrap();
    assert_eq!(report.trades[0].confirmation_ids, vec!["20000", "20001"]);
    assert_eq!(report.trades[0].trade_id, "30000");
}

#[tokio::test]
async fn failed_settlement_commit_keeps_trades_pending() {
    let store = Arc::new(FlakyStore::default());
    let engine = engine_on(store.clone(), &Config::default());
    engine.seed_initial_transactions(at()).await.unwrap();
    let ids = engine
        .place_orders(vec![
            order("FI3", "INFY", Direction::Sell, 200),
            order("FI4", "INFY", Direction::Buy, 200),
        ])
        .await
        .unwrap();
    engine.assemble_trades(&ids).await.unwrap();

    store.fail_commits.store(true, Ordering::SeqCst);
    let err = engine.clear_and_settle(at()).await.unwrap_err();
    assert!(matches!(err, EngineError::SettlementFailure(_)));

    store.fail_commits.store(false, Ordering::SeqCst);
    let state = engine.snapshot().await.unwrap();
    assert_eq!(query::trades_for_settlement(&state).len(), 1);
    assert_eq!(state.chain("FI3", "INFY").map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn unreadable_store_is_state_unavailable() {
    let store = Arc::new(FlakyStore::default());
    let engine = engine_on(store.clone(), &Config::default());
    store.fail_reads.store(true, Ordering::SeqCst);

    let err = engine.place_orders(vec![order("FI1", "TCS", Direction::Buy, 1)]).await.unwrap_err();
    assert_eq!(err.code(), "StateUnavailable");

    let err = engine.next_identity(core_types::IdentityClass::Order).await.unwrap_err();
    assert_eq!(err.code(), "StateUnavailable");
}

#[tokio::test]
async fn strict_resolution_rejects_unknown_ids() {
    let mut config = Config::default();
    config.ledger.strict_resolution = true;
    let engine = engine_on(Arc::new(MemoryStore::new()), &config);

    let mut ids = engine
        .place_orders(vec![
            order("FI1", "TCS", Direction::Buy, 10),
            order("FI2", "TCS", Direction::Sell, 10),
        ])
        .await
        .unwrap();
    ids.push("77777".to_string());

    assert_eq!(engine.assemble_trades(&ids).await.unwrap_err().code(), "NotFound");
}

#[tokio::test]
async fn opening_balance_applies_to_unseeded_chains() {
    let mut config = Config::default();
    config.ledger.opening_balance = 1_000;
    let engine = engine_on(Arc::new(MemoryStore::new()), &config);

    let ids = engine
        .place_orders(vec![
            order("FI5", "WIPRO", Direction::Buy, 40),
            order("FI6", "WIPRO", Direction::Sell, 40),
        ])
        .await
        .unwrap();
    engine.assemble_trades(&ids).await.unwrap();
    engine.clear_and_settle(at()).await.unwrap();

    let state = engine.snapshot().await.unwrap();
    assert_eq!(query::holdings_for_fi(&state, "FI5").unwrap()["WIPRO"], 1_040);
    assert_eq!(query::holdings_for_fi(&state, "FI6").unwrap()["WIPRO"], 960);
}

#[tokio::test]
async fn failed_counter_write_is_retried_from_the_store() {
    let store = Arc::new(FlakyStore::default());
    let engine = engine_on(store.clone(), &Config::default());

    store.fail_commits.store(true, Ordering::SeqCst);
    let err = engine.next_identity(core_types::IdentityClass::Order).await.unwrap_err();
    assert_eq!(err.code(), "StateUnavailable");
    assert!(store.inner.snapshot().await.is_empty());

    store.fail_commits.store(false, Ordering::SeqCst);
    let retried = engine.next_identity(core_types::IdentityClass::Order).await.unwrap();
    assert_eq!(retried, "10000");
    let next = engine.next_identity(core_types::IdentityClass::Order).await.unwrap();
    assert_eq!(next, "10001");
}

#[tokio::test]
async fn failed_order_commit_is_persistence_failure() {
    let store = Arc::new(FlakyStore::default());
    let engine = engine_on(store.clone(), &Config::default());
    engine.seed_initial_transactions(at()).await.unwrap();
    let before = store.inner.snapshot().await;

    store.fail_commits.store(true, Ordering::SeqCst);
    let err = engine
        .place_orders(vec![order("FI1", "TCS", Direction::Buy, 10)])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PersistenceFailure(_)));
    assert_eq!(store.inner.snapshot().await, before);

    store.fail_commits.store(false, Ordering::SeqCst);
    let ids = engine
        .place_orders(vec![order("FI1", "TCS", Direction::Buy, 10)])
        .await
        .unwrap();
    assert_eq!(ids, vec!["10000"]);
}
