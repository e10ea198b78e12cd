//! Core domain types and logic.

pub mod aggregation;
pub mod config_validation;
pub mod consistency;
pub mod drawdown;
pub mod error;
pub mod factors;
pub mod perf;
pub mod positions;
pub mod regime;
pub mod report;
pub mod series;
pub mod turnover;
pub mod underwater;
