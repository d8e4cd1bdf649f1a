pub mod cache;
pub mod chain;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use cache::{CacheStats, ResponseCache};
pub use chain::ProviderChain;
pub use error::*;
pub use traits::*;
pub use types::*;
