use std::sync::Arc;

use serde_json::Value;

use super::rules::default_rules;
use super::types::{
    CategoryGraphs, CategorySnapshots, Dimension, MetricsResponse, Operation, PeerPolicy,
};
use super::{MetricPair, MetricRule};
use crate::backend::{AggregationBackend, SqliteBackend};
use crate::error::{Error, Result};
use crate::params::{extract_parameters, ParameterContext};
use crate::storage::{repository, Database};

pub const EVALUATION_KEY: &str = "engine.evaluation";
pub const TIME_TO_MERGE_OPERATION_KEY: &str = "metrics.time_to_merge.operation";
pub const REVIEW_COMPLEXITY_PEER_POLICY_KEY: &str = "metrics.review_complexity.peer_policy";

/// How the engine walks its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Evaluation {
    /// One rule at a time, stopping at the first failure.
    #[default]
    Sequential,
    /// All rules polled together. On failure, the earliest-registered failing
    /// rule's error is returned and the rest are logged.
    Concurrent,
}

impl Evaluation {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Evaluation::Sequential),
            "concurrent" => Ok(Evaluation::Concurrent),
            other => Err(Error::Config(format!("unknown evaluation mode: {other}"))),
        }
    }
}

/// Engine settings read from the `app_config` table.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub evaluation: Evaluation,
    pub time_to_merge_operation: Operation,
    pub review_complexity_peer_policy: PeerPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation: Evaluation::Sequential,
            time_to_merge_operation: Operation::Median,
            review_complexity_peer_policy: PeerPolicy::Always,
        }
    }
}

impl EngineConfig {
    /// Build from key/value pairs. Unknown keys are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                EVALUATION_KEY => config.evaluation = Evaluation::parse(value)?,
                TIME_TO_MERGE_OPERATION_KEY => {
                    config.time_to_merge_operation = match Operation::parse(value)? {
                        Operation::Count | Operation::Sum => {
                            return Err(Error::Config(format!(
                                "{key} must be one of median, avg, min, max (got {value})"
                            )))
                        }
                        op => op,
                    }
                }
                REVIEW_COMPLEXITY_PEER_POLICY_KEY => {
                    config.review_complexity_peer_policy = PeerPolicy::parse(value)?
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Check a single key/value as [`from_pairs`](Self::from_pairs) would,
    /// so bad values can be refused before they are stored.
    pub fn validate(key: &str, value: &str) -> Result<()> {
        Self::from_pairs(&[(key.to_string(), value.to_string())]).map(|_| ())
    }

    /// Validate and store one setting. A rejected value leaves the table untouched.
    pub async fn set(db: &Database, key: &str, value: &str) -> Result<()> {
        Self::validate(key, value)?;
        let (key, value) = (key.to_string(), value.to_string());
        db.writer()
            .call(move |conn| repository::set_config(conn, &key, &value))
            .await?;
        Ok(())
    }

    pub async fn load(db: &Database) -> Result<Self> {
        let pairs = db
            .reader()
            .call(|conn| repository::list_config(conn))
            .await?;
        Self::from_pairs(&pairs)
    }
}

/// Runs an ordered registry of metric rules over one request.
pub struct MetricsEngine {
    backend: Arc<dyn AggregationBackend>,
    rules: Vec<Box<dyn MetricRule>>,
    evaluation: Evaluation,
}

impl MetricsEngine {
    /// Engine with the standard rule registry and default configuration.
    pub fn new(backend: Arc<dyn AggregationBackend>) -> Self {
        Self::with_config(backend, &EngineConfig::default())
    }

    pub fn with_config(backend: Arc<dyn AggregationBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            rules: default_rules(config),
            evaluation: config.evaluation,
        }
    }

    /// Engine with a caller-chosen registry. Rules report in the given order.
    pub fn with_rules(backend: Arc<dyn AggregationBackend>, rules: Vec<Box<dyn MetricRule>>) -> Self {
        Self {
            backend,
            rules,
            evaluation: Evaluation::Sequential,
        }
    }

    /// Engine over the local warehouse, configured from its `app_config` table.
    pub async fn from_database(db: Database) -> Result<Self> {
        let config = EngineConfig::load(&db).await?;
        Ok(Self::with_config(Arc::new(SqliteBackend::new(db)), &config))
    }

    pub fn evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = evaluation;
        self
    }

    pub fn rules(&self) -> &[Box<dyn MetricRule>] {
        &self.rules
    }

    /// Look up the registered rule for a dimension.
    pub fn rule(&self, dimension: Dimension) -> Option<&dyn MetricRule> {
        self.rules
            .iter()
            .find(|r| r.descriptor().dimension == dimension)
            .map(|r| r.as_ref())
    }

    /// Validate `payload` and compute every registered metric.
    ///
    /// Fails as a whole: any validation or backend error aborts the call and
    /// no partial response is returned.
    pub async fn calculate_metrics(&self, payload: &Value) -> Result<MetricsResponse> {
        let params = extract_parameters(payload)?;
        self.calculate(&params).await
    }

    pub async fn calculate(&self, params: &ParameterContext) -> Result<MetricsResponse> {
        let pairs = match self.evaluation {
            Evaluation::Sequential => self.evaluate_sequential(params).await?,
            Evaluation::Concurrent => self.evaluate_concurrent(params).await?,
        };

        let mut response = MetricsResponse::default();
        for (rule, (snapshot, graph)) in self.rules.iter().zip(pairs) {
            response.snapshot_metrics.push(CategorySnapshots {
                category: rule.category(),
                metrics: vec![snapshot],
            });
            response.graph_metrics.push(CategoryGraphs {
                category: rule.category(),
                metrics: vec![graph],
            });
        }

        log::info!(
            "computed {} metrics for {} ({} to {}, {})",
            self.rules.len(),
            params.organization_id,
            params.start,
            params.end,
            params.interval
        );
        Ok(response)
    }

    async fn evaluate_sequential(&self, params: &ParameterContext) -> Result<Vec<MetricPair>> {
        let mut pairs = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            log::debug!("evaluating rule {}", rule.descriptor().id);
            pairs.push(rule.calculate(self.backend.as_ref(), params).await?);
        }
        Ok(pairs)
    }

    async fn evaluate_concurrent(&self, params: &ParameterContext) -> Result<Vec<MetricPair>> {
        let backend = self.backend.as_ref();
        let results = futures::future::join_all(
            self.rules.iter().map(|rule| rule.calculate(backend, params)),
        )
        .await;

        let mut pairs = Vec::with_capacity(results.len());
        let mut first_error = None;
        for (rule, result) in self.rules.iter().zip(results) {
            match result {
                Ok(pair) => pairs.push(pair),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => log::warn!("rule {} also failed: {e}", rule.descriptor().id),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(pairs),
        }
    }
}
