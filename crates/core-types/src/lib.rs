pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Direction, IdentityClass, OrderKind, OrderStatus, TradeStatus, TransactionType};
pub use error::CoreError;
pub use structs::{Order, Trade, Transaction};
