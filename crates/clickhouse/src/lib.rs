//! ClickHouse storage for the beacon collector.

pub mod client;
pub mod config;
pub mod dao;
pub mod health;
pub mod insert;
pub mod query;
pub mod schema;

pub use client::*;
pub use config::*;
pub use dao::ClickHouseDao;
pub use query::*;
