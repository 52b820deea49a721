pub mod alerts;
pub mod api;
pub mod db;
pub mod market;
pub mod portfolio;
pub mod signals;
pub mod stats;
pub mod stream;
pub mod upstream;

pub mod config;
pub mod logger;
pub mod time;
