//! Port traits at the boundaries of the domain.

pub mod analytics_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
