pub mod lock;
pub mod transactions;

pub use transactions::{StoreError, TransactionStore};
