//! Concrete adapter implementations for ports.

pub mod analytics;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod html_report_adapter;
pub mod svg_report;
