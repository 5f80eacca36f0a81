pub mod executor;
pub mod locks;

pub use executor::MergeExecutor;
pub use locks::{PairGuard, PairLocks};
