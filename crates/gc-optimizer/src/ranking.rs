//! Per-configuration aggregation of fold scores and final ranking.

use gc_types::{Configuration, SearchError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::evaluator::MetricResult;
use crate::metrics::MetricSet;
use crate::trial::Mode;

/// Mean score of each metric for one configuration across its folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// `None` when no fold produced a value for that metric.
    pub means: BTreeMap<String, Option<f64>>,
    /// Number of folds that contributed to each mean.
    pub contributing_folds: BTreeMap<String, usize>,
    /// Folds whose task failed outright.
    pub failed_folds: usize,
}

impl AggregatedResult {
    pub fn mean(&self, metric: &str) -> Option<f64> {
        self.means.get(metric).copied().flatten()
    }

    /// Missing-aware mean of one configuration's fold results.
    pub fn from_folds(metrics: &MetricSet, folds: &[MetricResult]) -> Self {
        let mut means = BTreeMap::new();
        let mut contributing_folds = BTreeMap::new();

        for metric in metrics.iter() {
            let values: Vec<f64> = folds.iter().filter_map(|r| r.get(metric.name())).collect();
            let mean = if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            };
            means.insert(metric.name().to_string(), mean);
            contributing_folds.insert(metric.name().to_string(), values.len());
        }

        Self {
            means,
            contributing_folds,
            failed_folds: folds.iter().filter(|r| r.is_failure()).count(),
        }
    }
}

/// Collapse the flat, row-major result list into one aggregate per configuration.
///
/// Results `[i * n_folds, (i + 1) * n_folds)` belong to configuration `i`.
pub fn aggregate(
    results: &[MetricResult],
    n_configurations: usize,
    n_folds: usize,
    metrics: &MetricSet,
) -> Result<Vec<AggregatedResult>, SearchError> {
    let expected = n_configurations * n_folds;
    if results.len() != expected || n_folds == 0 {
        return Err(SearchError::ResultCountMismatch {
            expected,
            got: results.len(),
        });
    }

    Ok(results
        .chunks(n_folds)
        .map(|chunk| AggregatedResult::from_folds(metrics, chunk))
        .collect())
}

/// One row of the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConfiguration {
    /// 1-based position.
    pub rank: usize,
    pub configuration: Configuration,
    pub result: AggregatedResult,
}

impl RankedConfiguration {
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.result.mean(metric)
    }
}

/// Configurations ordered best first by one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub metric: String,
    pub mode: Mode,
    pub entries: Vec<RankedConfiguration>,
}

impl Ranking {
    /// Sort configurations by the mean of `metric` under `mode`.
    ///
    /// The sort is stable: ties keep generator order. Configurations with no
    /// value for `metric` rank after every scored configuration in both modes.
    pub fn new(
        configurations: Vec<Configuration>,
        aggregated: Vec<AggregatedResult>,
        metric: &str,
        mode: Mode,
    ) -> Result<Self, SearchError> {
        if configurations.len() != aggregated.len() {
            return Err(SearchError::ResultCountMismatch {
                expected: configurations.len(),
                got: aggregated.len(),
            });
        }

        let mut rows: Vec<(Configuration, AggregatedResult)> =
            configurations.into_iter().zip(aggregated).collect();
        rows.sort_by(|(_, a), (_, b)| match (a.mean(metric), b.mean(metric)) {
            (Some(x), Some(y)) => mode.compare(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(i, (configuration, result))| RankedConfiguration {
                rank: i + 1,
                configuration,
                result,
            })
            .collect();

        Ok(Self {
            metric: metric.to_string(),
            mode,
            entries,
        })
    }

    /// The best configuration, if any configuration produced a score.
    pub fn best(&self) -> Option<&RankedConfiguration> {
        self.entries
            .first()
            .filter(|entry| entry.score(&self.metric).is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedConfiguration> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configurations in rank order.
    pub fn configurations(&self) -> Vec<&Configuration> {
        self.entries.iter().map(|e| &e.configuration).collect()
    }
}

impl IntoIterator for Ranking {
    type Item = RankedConfiguration;
    type IntoIter = std::vec::IntoIter<RankedConfiguration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::TaskFailure;
    use gc_types::{ModelKind, ParameterValue};

    fn metrics() -> MetricSet {
        MetricSet::builtin(&["mae"]).unwrap()
    }

    fn scored(value: f64) -> MetricResult {
        MetricResult {
            scores: BTreeMap::from([("mae".to_string(), Some(value))]),
            failure: None,
        }
    }

    fn failed() -> MetricResult {
        MetricResult::missing(&metrics(), TaskFailure::Lost)
    }

    fn config(window: i64) -> Configuration {
        Configuration::new(
            ModelKind::WindowAverage,
            vec![("window".to_string(), ParameterValue::Int(window))],
        )
    }

    fn aggregate_one(mean: Option<f64>) -> AggregatedResult {
        AggregatedResult {
            means: BTreeMap::from([("mae".to_string(), mean)]),
            contributing_folds: BTreeMap::from([("mae".to_string(), usize::from(mean.is_some()))]),
            failed_folds: 0,
        }
    }

    #[test]
    fn mean_over_folds() {
        let agg = AggregatedResult::from_folds(&metrics(), &[scored(1.0), scored(2.0), scored(3.0)]);
        assert_eq!(agg.mean("mae"), Some(2.0));
        assert_eq!(agg.contributing_folds["mae"], 3);
    }

    #[test]
    fn missing_values_are_excluded_from_the_mean() {
        let agg = AggregatedResult::from_folds(&metrics(), &[scored(1.0), failed(), scored(3.0)]);
        assert_eq!(agg.mean("mae"), Some(2.0));
        assert_eq!(agg.contributing_folds["mae"], 2);
        assert_eq!(agg.failed_folds, 1);

        let agg = AggregatedResult::from_folds(&metrics(), &[failed(), failed()]);
        assert_eq!(agg.mean("mae"), None);
        assert_eq!(agg.contributing_folds["mae"], 0);
    }

    #[test]
    fn aggregate_groups_contiguous_chunks() {
        let results = vec![scored(1.0), scored(3.0), scored(10.0), scored(20.0)];
        let aggregated = aggregate(&results, 2, 2, &metrics()).unwrap();
        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated[0].mean("mae"), Some(2.0));
        assert_eq!(aggregated[1].mean("mae"), Some(15.0));

        assert_eq!(
            aggregate(&results, 3, 2, &metrics()),
            Err(SearchError::ResultCountMismatch {
                expected: 6,
                got: 4
            })
        );
    }

    #[test]
    fn minimize_and_maximize() {
        let configs = vec![config(1), config(2)];
        let aggregated = vec![aggregate_one(Some(0.5)), aggregate_one(Some(0.3))];

        let ranking =
            Ranking::new(configs.clone(), aggregated.clone(), "mae", Mode::Minimize).unwrap();
        assert_eq!(ranking.configurations(), vec![&configs[1], &configs[0]]);
        assert_eq!(ranking.best().unwrap().rank, 1);
        assert_eq!(ranking.best().unwrap().score("mae"), Some(0.3));

        let ranking = Ranking::new(configs.clone(), aggregated, "mae", Mode::Maximize).unwrap();
        assert_eq!(ranking.configurations(), vec![&configs[0], &configs[1]]);
        assert_eq!(ranking.entries[1].rank, 2);
    }

    #[test]
    fn ties_keep_generator_order() {
        let configs = vec![config(1), config(2), config(3)];
        let aggregated = vec![
            aggregate_one(Some(0.4)),
            aggregate_one(Some(0.4)),
            aggregate_one(Some(0.1)),
        ];
        for mode in [Mode::Minimize, Mode::Maximize] {
            let ranking = Ranking::new(configs.clone(), aggregated.clone(), "mae", mode).unwrap();
            let ordered = ranking.configurations();
            let first = ordered.iter().position(|c| **c == configs[0]).unwrap();
            let second = ordered.iter().position(|c| **c == configs[1]).unwrap();
            assert!(first < second, "{mode}");
        }
    }

    #[test]
    fn missing_scores_rank_last_in_both_modes() {
        let configs = vec![config(1), config(2), config(3)];
        let aggregated = vec![
            aggregate_one(None),
            aggregate_one(Some(0.9)),
            aggregate_one(Some(0.2)),
        ];

        let ranking =
            Ranking::new(configs.clone(), aggregated.clone(), "mae", Mode::Minimize).unwrap();
        assert_eq!(
            ranking.configurations(),
            vec![&configs[2], &configs[1], &configs[0]]
        );

        let ranking = Ranking::new(configs.clone(), aggregated, "mae", Mode::Maximize).unwrap();
        assert_eq!(
            ranking.configurations(),
            vec![&configs[1], &configs[2], &configs[0]]
        );
    }

    #[test]
    fn all_missing_has_no_best() {
        let ranking = Ranking::new(
            vec![config(1), config(2)],
            vec![aggregate_one(None), aggregate_one(None)],
            "mae",
            Mode::Minimize,
        )
        .unwrap();
        assert_eq!(ranking.len(), 2);
        assert!(ranking.best().is_none());
        assert_eq!(ranking.entries[0].configuration, config(1));
    }
}
