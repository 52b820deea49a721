pub mod cache;
pub mod stats_store;
pub mod types;

pub use cache::MarketCache;
pub use stats_store::StatsStore;
