//! Datasource subsystem: the query client used by rule evaluation.
//!
//! # Data Flow
//! ```text
//! DatasourceConfig
//!     → init.rs (validate, provision transport, apply idle cap, bind auth)
//!     → VmStorage (QuerierBuilder, built once, shared read-only)
//!     → build_with_params(type, evaluation interval) per rule group
//!     → request.rs (paths, lookback `time`, `step`)
//!     → reqwest pooled client
//!     → response.rs (Prometheus / Graphite JSON → Metric)
//! ```
//!
//! # Design Decisions
//! - Construction does no network I/O
//! - The builder and its queriers are immutable; the connection pool is the
//!   only shared mutable state and is owned by reqwest
//! - The rule engine depends on the `QuerierBuilder`/`Querier` traits only

pub mod error;
pub mod init;
pub mod metric;
pub mod request;
pub mod response;
pub mod vm;

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::{DatasourceError, QueryError};
pub use init::init;
pub use metric::{Label, Metric};
pub use vm::{BasicAuth, VmStorage};

/// Query language spoken by the datasource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasourceType {
    #[default]
    Prometheus,
    Graphite,
}

impl DatasourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasourceType::Prometheus => "prometheus",
            DatasourceType::Graphite => "graphite",
        }
    }
}

impl fmt::Display for DatasourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "prometheus" => Ok(DatasourceType::Prometheus),
            "graphite" => Ok(DatasourceType::Graphite),
            other => Err(format!("unknown datasource type {other:?}, expected prometheus or graphite")),
        }
    }
}

/// Per-rule parameters applied on top of the shared datasource settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuerierParams {
    pub datasource_type: DatasourceType,
    /// The rule group's evaluation interval, used as `step` when no
    /// explicit step is configured.
    pub evaluation_interval: Option<Duration>,
}

/// Executes queries against the datasource.
///
/// Implementations are shared by concurrently evaluating rule groups.
#[async_trait]
pub trait Querier: Send + Sync {
    /// Evaluate `query` at `timestamp`.
    async fn query(&self, query: &str, timestamp: SystemTime) -> Result<Vec<Metric>, QueryError>;

    /// Evaluate `query` over `[start, end]`.
    async fn query_range(
        &self,
        query: &str,
        start: SystemTime,
        end: SystemTime,
    ) -> Result<Vec<Metric>, QueryError>;
}

/// Produces queriers bound to per-rule parameters.
pub trait QuerierBuilder: Send + Sync {
    fn build_with_params(&self, params: QuerierParams) -> Box<dyn Querier>;
}
