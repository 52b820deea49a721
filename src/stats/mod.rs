pub mod providers;
pub mod updater;

pub use providers::{GlobalSnapshot, HttpStatsProviders, StatsProviders};
pub use updater::{StatsMirror, StatsUpdater};
