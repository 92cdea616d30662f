//! Request URL construction.
//!
//! # Responsibilities
//! - Resolve the request path (type prefix + query kind)
//! - Inject `time` backdated by the lookback
//! - Inject `step` from the configured step or the rule's evaluation interval
//!
//! # Paths
//! ```text
//! prometheus instant   {url}[/prometheus]/api/v1/query
//! prometheus range     {url}[/prometheus]/api/v1/query_range
//! graphite             {url}[/graphite]/render
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use url::Url;

use crate::datasource::QuerierParams;

const PROMETHEUS_PREFIX: &str = "/prometheus";
const PROMETHEUS_INSTANT_PATH: &str = "/api/v1/query";
const PROMETHEUS_RANGE_PATH: &str = "/api/v1/query_range";
const GRAPHITE_PREFIX: &str = "/graphite";
const GRAPHITE_PATH: &str = "/render";
const GRAPHITE_DEFAULT_FROM: &str = "-5min";

/// Query-shaping rules fixed at construction, plus the per-rule params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    pub base: Url,
    pub append_type_prefix: bool,
    pub lookback: Duration,
    pub query_step: Option<Duration>,
    pub params: QuerierParams,
}

impl QueryPolicy {
    /// URL for a Prometheus instant query evaluated at `timestamp`.
    pub fn prometheus_instant_url(&self, query: &str, timestamp: SystemTime) -> Url {
        let mut url = self.url_for(PROMETHEUS_PREFIX, PROMETHEUS_INSTANT_PATH);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            pairs.append_pair("time", &unix_secs(self.backdate(timestamp)).to_string());
            if let Some(step) = self.step() {
                pairs.append_pair("step", &format_step(step));
            }
        }
        url
    }

    /// URL for a Prometheus range query over `[start, end]`.
    pub fn prometheus_range_url(&self, query: &str, start: SystemTime, end: SystemTime) -> Url {
        let mut url = self.url_for(PROMETHEUS_PREFIX, PROMETHEUS_RANGE_PATH);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            pairs.append_pair("start", &unix_secs(start).to_string());
            pairs.append_pair("end", &unix_secs(end).to_string());
            if let Some(step) = self.step() {
                pairs.append_pair("step", &format_step(step));
            }
        }
        url
    }

    /// URL for a Graphite render query evaluated at `timestamp`.
    pub fn graphite_url(&self, query: &str, timestamp: SystemTime) -> Url {
        let mut url = self.url_for(GRAPHITE_PREFIX, GRAPHITE_PATH);
        let from = if self.lookback.is_zero() {
            GRAPHITE_DEFAULT_FROM.to_string()
        } else {
            unix_secs(self.backdate(timestamp)).to_string()
        };
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("target", query)
            .append_pair("from", &from)
            .append_pair("until", "now");
        url
    }

    /// The `step` sent with queries.
    ///
    /// An explicitly configured step wins over the evaluation interval. A
    /// configured step of zero sends no step at all.
    pub fn step(&self) -> Option<Duration> {
        match self.query_step {
            Some(step) => Some(step).filter(|s| !s.is_zero()),
            None => self.params.evaluation_interval.filter(|s| !s.is_zero()),
        }
    }

    fn backdate(&self, timestamp: SystemTime) -> SystemTime {
        timestamp.checked_sub(self.lookback).unwrap_or(UNIX_EPOCH)
    }

    fn url_for(&self, type_prefix: &str, path: &str) -> Url {
        let mut url = self.base.clone();
        let base_path = url.path().trim_end_matches('/').to_string();
        let prefix = if self.append_type_prefix { type_prefix } else { "" };
        url.set_path(&format!("{base_path}{prefix}{path}"));
        url
    }
}

fn unix_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Render a step as `15s`, or `1500ms` when it is not whole seconds.
///
/// Sub-millisecond steps round up to `1ms`.
pub fn format_step(step: Duration) -> String {
    if step.subsec_nanos() == 0 {
        format!("{}s", step.as_secs())
    } else {
        format!("{}ms", step.as_millis().max(1))
    }
}
