//! Strategy crate: condition parsing, heuristic probabilities, ticker
//! resolution, refresh caching, and the opportunity engine.

pub mod cache;
pub mod condition;
pub mod opportunity;
pub mod probability;
pub mod resolver;

pub use cache::RefreshCache;
pub use condition::{parse_market_condition, Condition};
pub use opportunity::{position_exposure, OpportunityDecision, OpportunityEngine, OrderRequest};
pub use resolver::TickerResolver;
