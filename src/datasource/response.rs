//! Response decoding for Prometheus API and Graphite render responses.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::datasource::{Label, Metric, QueryError};

const STATUS_SUCCESS: &str = "success";
const STATUS_ERROR: &str = "error";
const RESULT_VECTOR: &str = "vector";
const RESULT_MATRIX: &str = "matrix";
const RESULT_SCALAR: &str = "scalar";

#[derive(Debug, Deserialize)]
struct PromResponse {
    status: String,
    #[serde(default)]
    data: Option<PromData>,
    #[serde(rename = "errorType", default)]
    error_type: String,
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct PromData {
    #[serde(rename = "resultType")]
    result_type: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct PromInstant {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: PromSample,
}

#[derive(Debug, Deserialize)]
struct PromRange {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    values: Vec<PromSample>,
}

/// `[<unix seconds>, "<value>"]`
#[derive(Debug, Deserialize)]
struct PromSample(f64, String);

impl PromSample {
    fn parse(&self) -> Result<(i64, f64), QueryError> {
        let value = self
            .1
            .parse::<f64>()
            .map_err(|_| QueryError::InvalidValue(self.1.clone()))?;
        Ok((self.0 as i64, value))
    }
}

#[derive(Debug, Deserialize)]
struct GraphiteSeries {
    target: String,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    datapoints: Vec<(Option<f64>, i64)>,
}

fn labeled(labels: BTreeMap<String, String>) -> Metric {
    // BTreeMap iterates in name order, so labels arrive sorted.
    Metric {
        labels: labels
            .into_iter()
            .map(|(name, value)| Label { name, value })
            .collect(),
        ..Metric::default()
    }
}

fn decode_prometheus(query: &str, body: &[u8]) -> Result<PromData, QueryError> {
    let resp: PromResponse = serde_json::from_slice(body)?;
    match resp.status.as_str() {
        STATUS_SUCCESS => resp
            .data
            .ok_or_else(|| QueryError::UnknownStatus("success without data".to_string())),
        STATUS_ERROR => Err(QueryError::Api {
            query: query.to_string(),
            error_type: resp.error_type,
            error: resp.error,
        }),
        other => Err(QueryError::UnknownStatus(other.to_string())),
    }
}

/// Decode the response of a Prometheus instant query.
///
/// Accepts `vector` and `scalar` results.
pub fn parse_instant(query: &str, body: &[u8]) -> Result<Vec<Metric>, QueryError> {
    let data = decode_prometheus(query, body)?;
    match data.result_type.as_str() {
        RESULT_VECTOR => {
            let series: Vec<PromInstant> = serde_json::from_value(data.result)?;
            series
                .into_iter()
                .map(|s| {
                    let (ts, value) = s.value.parse()?;
                    let mut m = labeled(s.metric);
                    m.push_sample(ts, value);
                    Ok(m)
                })
                .collect()
        }
        RESULT_SCALAR => {
            let sample: PromSample = serde_json::from_value(data.result)?;
            let (ts, value) = sample.parse()?;
            let mut m = Metric::default();
            m.push_sample(ts, value);
            Ok(vec![m])
        }
        other => Err(QueryError::UnexpectedResultType {
            expected: RESULT_VECTOR,
            got: other.to_string(),
        }),
    }
}

/// Decode the response of a Prometheus range query.
pub fn parse_range(query: &str, body: &[u8]) -> Result<Vec<Metric>, QueryError> {
    let data = decode_prometheus(query, body)?;
    if data.result_type != RESULT_MATRIX {
        return Err(QueryError::UnexpectedResultType {
            expected: RESULT_MATRIX,
            got: data.result_type,
        });
    }

    let series: Vec<PromRange> = serde_json::from_value(data.result)?;
    series
        .into_iter()
        .map(|s| {
            let mut m = labeled(s.metric);
            for sample in &s.values {
                let (ts, value) = sample.parse()?;
                m.push_sample(ts, value);
            }
            Ok(m)
        })
        .collect()
}

/// Decode a Graphite render response.
///
/// Only the last non-null datapoint of each series is kept. Series without
/// values are dropped.
pub fn parse_graphite(body: &[u8]) -> Result<Vec<Metric>, QueryError> {
    let series: Vec<GraphiteSeries> = serde_json::from_slice(body)?;
    Ok(series
        .into_iter()
        .filter_map(|s| {
            let (value, ts) = s
                .datapoints
                .iter()
                .rev()
                .find_map(|(v, ts)| v.map(|v| (v, *ts)))?;
            let target = s.target;
            let mut m = labeled(s.tags);
            if m.label("name").is_none() {
                m.add_label("name", target);
            }
            m.push_sample(ts, value);
            Some(m)
        })
        .collect())
}
