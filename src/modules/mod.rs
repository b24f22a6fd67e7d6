//! Event handling, aggregation and export

pub mod aggregator;
pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod export;
pub mod speed;
