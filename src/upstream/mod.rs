pub mod feed;
pub mod messages;
pub mod rest;

pub use feed::UpbitFeed;
pub use rest::{Candle, CandleInterval, CandleSource, UpbitRestClient, UpstreamError};
