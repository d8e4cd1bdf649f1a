//! Combines technical, sentiment and position-risk signals into per-holding
//! actions, adds portfolio-wide advisories, and ranks the lot.

pub mod engine;
pub mod models;
pub mod overlays;
pub mod prioritize;
pub mod scoring;
pub mod settings;

pub use engine::RecommendationEngine;
pub use models::*;
pub use settings::RecommendationSettings;
