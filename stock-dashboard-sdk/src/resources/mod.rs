//! SDK resource modules
//!
//! One client per backend area. Each owns its own busy/error state.

pub mod crawler;
pub mod moving_averages;
pub mod stocks;
pub mod tasks;
pub mod trading_days;

pub use crawler::CrawlerClient;
pub use moving_averages::MovingAveragesClient;
pub use stocks::StocksClient;
pub use tasks::TasksClient;
pub use trading_days::TradingDaysClient;
