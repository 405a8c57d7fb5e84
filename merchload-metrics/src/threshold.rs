//! Threshold expressions
//!
//! An expression has the form `<aggregate> <op> <number>`, for example
//! `p(95)<50` or `count >= 1`. Trend values are compared in milliseconds.

use crate::error::{MetricsError, MetricsResult};
use merchload_config::ThresholdsConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static THRESHOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(avg|min|max|med|count|rate|value|p\(\s*([0-9]+(?:\.[0-9]+)?)\s*\))\s*(<=|>=|==|!=|<|>)\s*(-?[0-9]+(?:\.[0-9]+)?)\s*$",
    )
    .expect("threshold pattern is a valid regex")
});

/// Statistic a threshold reads from its metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Avg,
    Min,
    Max,
    Med,
    /// Percentile between 0 and 100
    Percentile(f64),
    Count,
    /// Pass ratio for checks, events per second for counters
    Rate,
    /// Current value of a gauge
    Value,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Avg => write!(f, "avg"),
            Aggregate::Min => write!(f, "min"),
            Aggregate::Max => write!(f, "max"),
            Aggregate::Med => write!(f, "med"),
            Aggregate::Percentile(p) => write!(f, "p({})", p),
            Aggregate::Count => write!(f, "count"),
            Aggregate::Rate => write!(f, "rate"),
            Aggregate::Value => write!(f, "value"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Comparison {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Comparison::Lt),
            "<=" => Some(Comparison::Le),
            ">" => Some(Comparison::Gt),
            ">=" => Some(Comparison::Ge),
            "==" => Some(Comparison::Eq),
            "!=" => Some(Comparison::Ne),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }

    pub fn holds(&self, actual: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => actual < bound,
            Comparison::Le => actual <= bound,
            Comparison::Gt => actual > bound,
            Comparison::Ge => actual >= bound,
            Comparison::Eq => actual == bound,
            Comparison::Ne => actual != bound,
        }
    }
}

/// One parsed threshold bound to a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    /// Expression as written in the configuration
    pub expression: String,
    pub aggregate: Aggregate,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> MetricsResult<Self> {
        let invalid = |reason: &str| MetricsError::InvalidThreshold {
            metric: metric.to_string(),
            expression: expression.to_string(),
            reason: reason.to_string(),
        };

        let captures = THRESHOLD_RE
            .captures(expression)
            .ok_or_else(|| invalid("expected '<aggregate> <op> <number>'"))?;

        let aggregate = match &captures[1] {
            "avg" => Aggregate::Avg,
            "min" => Aggregate::Min,
            "max" => Aggregate::Max,
            "med" => Aggregate::Med,
            "count" => Aggregate::Count,
            "rate" => Aggregate::Rate,
            "value" => Aggregate::Value,
            _ => {
                let percentile: f64 = captures
                    .get(2)
                    .and_then(|p| p.as_str().parse().ok())
                    .ok_or_else(|| invalid("percentile is not a number"))?;
                if !(0.0..=100.0).contains(&percentile) {
                    return Err(invalid("percentile must be between 0 and 100"));
                }
                Aggregate::Percentile(percentile)
            }
        };

        let comparison =
            Comparison::parse(&captures[3]).ok_or_else(|| invalid("unknown operator"))?;
        let bound: f64 = captures[4]
            .parse()
            .map_err(|_| invalid("bound is not a number"))?;

        Ok(Self {
            metric: metric.to_string(),
            expression: expression.trim().to_string(),
            aggregate,
            comparison,
            bound,
        })
    }

    /// Decide the threshold for an observed value.
    ///
    /// `None` means the metric has no data: a count reads as 0, anything
    /// else fails. k6 reads an empty trend's percentile as 0 and passes it;
    /// here an endpoint that was never reached cannot pass a latency bound.
    pub fn check(&self, observed: Option<f64>) -> bool {
        match (observed, self.aggregate) {
            (Some(actual), _) => self.comparison.holds(actual, self.bound),
            (None, Aggregate::Count) => self.comparison.holds(0.0, self.bound),
            (None, _) => false,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}{}",
            self.metric,
            self.aggregate,
            self.comparison.as_str(),
            self.bound
        )
    }
}

/// All thresholds of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdSet {
    thresholds: Vec<Threshold>,
}

impl ThresholdSet {
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        Self { thresholds }
    }

    /// Parse every expression of the configuration, failing on the first bad one
    pub fn from_config(config: &ThresholdsConfig) -> MetricsResult<Self> {
        let mut thresholds = Vec::new();
        for (metric, expressions) in &config.rules {
            for expression in expressions {
                thresholds.push(Threshold::parse(metric, expression)?);
            }
        }
        tracing::debug!("Parsed {} thresholds", thresholds.len());
        Ok(Self { thresholds })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Threshold> {
        self.thresholds.iter()
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}
