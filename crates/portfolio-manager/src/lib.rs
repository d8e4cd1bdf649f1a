pub mod benchmark;
pub mod models;
pub mod portfolio;
pub mod store;
pub mod valuation;

pub use models::*;
pub use store::PortfolioStore;
pub use valuation::{PortfolioValuator, ValuationSettings};
