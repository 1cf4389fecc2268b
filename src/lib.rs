pub mod api;
pub mod entities;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod migrator;
pub mod notify;
pub mod proximity;
pub mod sweeper;
pub mod telemetry;

pub use redis;
pub use sea_orm;
