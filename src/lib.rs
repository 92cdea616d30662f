//! VictoriaMetrics datasource client for alerting rule evaluation.

pub mod config;
pub mod datasource;
pub mod net;
pub mod observability;

pub use config::schema::{Config, DatasourceConfig};
pub use datasource::{init, Querier, QuerierBuilder, QuerierParams, VmStorage};
