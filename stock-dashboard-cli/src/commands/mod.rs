//! Subcommand implementations, one module per command group

pub mod auth;
pub mod config;
pub mod crawler;
pub mod ma;
pub mod menu;
pub mod stocks;
pub mod tasks;
pub mod trading_days;
