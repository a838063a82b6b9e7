//! Derived metrics.
//!
//! A metric is a named pure function over an ordered list of attribute names.
//! For a ticker, its value is the function applied positionally to the parsed
//! resolved values of those attributes. The declared list is the only thing
//! the function can see, so it is also the exact dependency set used for
//! cache invalidation and for highlighting related cells.

use crate::error::{GridError, Result};
use crate::parser::parse_value;
use crate::store::{Stamp, ValueStore};
use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Positional numeric function; receives exactly one argument per declared
/// dependency.
pub type Formula = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct Metric {
    name: String,
    dependencies: Vec<String>,
    formula: Formula,
}

impl Metric {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Applies the formula to already-parsed arguments.
    pub fn apply(&self, args: &[f64]) -> f64 {
        (self.formula)(args)
    }
}

impl std::fmt::Debug for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

struct Cached {
    stamps: Vec<Stamp>,
    value: f64,
}

/// Registry of metrics plus a pull-based memo keyed by (metric, ticker).
///
/// A memo entry stays valid while the stamps of all declared dependencies
/// are unchanged; a write to any of them makes the next read recompute.
/// Writes to undeclared attributes never touch the entry.
pub struct MetricEngine {
    store: Arc<ValueStore>,
    metrics: Vec<Metric>,
    cache: Mutex<HashMap<(String, String), Cached>>,
    recomputations: AtomicU64,
}

impl MetricEngine {
    pub fn new(store: Arc<ValueStore>) -> Self {
        MetricEngine {
            store,
            metrics: Vec::new(),
            cache: Mutex::new(HashMap::new()),
            recomputations: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<ValueStore> {
        &self.store
    }

    /// Registers `name`. Redefining a name replaces the old metric in place
    /// and drops its memo entries.
    pub fn define_metric<F>(&mut self, name: &str, dependencies: &[&str], formula: F)
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        let metric = Metric {
            name: name.to_string(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            formula: Arc::new(formula),
        };

        match self.metrics.iter_mut().find(|m| m.name == name) {
            Some(existing) => {
                *existing = metric;
                self.cache
                    .get_mut()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(metric, _), _| metric != name);
            }
            None => self.metrics.push(metric),
        }
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metric names in definition order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    pub fn dependencies(&self, name: &str) -> Option<&[String]> {
        self.metric(name).map(Metric::dependencies)
    }

    /// Whether `attribute` appears in the declared list of `metric`.
    pub fn is_dependency(&self, metric: &str, attribute: &str) -> bool {
        self.metric(metric)
            .is_some_and(|m| m.dependencies.iter().any(|d| d == attribute))
    }

    /// Metrics whose declared list contains `attribute`.
    pub fn dependents_of(&self, attribute: &str) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|m| m.dependencies.iter().any(|d| d == attribute))
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Current value of `name` for `ticker`, recomputed only when one of its
    /// declared dependencies changed since the last read.
    pub fn value_of(&self, name: &str, ticker: &str) -> Result<f64> {
        let metric = self
            .metric(name)
            .ok_or_else(|| GridError::UnknownMetric(name.to_string()))?;

        let resolved = self.store.resolve_many(ticker, &metric.dependencies);
        let stamps: Vec<Stamp> = resolved.iter().map(|r| r.stamp).collect();
        let key = (name.to_string(), ticker.to_string());

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(&key) {
            if hit.stamps == stamps {
                return Ok(hit.value);
            }
        }

        let args: Vec<f64> = resolved.iter().map(|r| parse_value(&r.value)).collect();
        let value = metric.apply(&args);
        self.recomputations.fetch_add(1, Ordering::Relaxed);
        debug!("Recomputed {} for {} = {}", name, ticker, value);

        cache.insert(key, Cached { stamps, value });
        Ok(value)
    }

    /// Every metric for `ticker`, in definition order.
    pub fn values_for(&self, ticker: &str) -> Vec<(String, f64)> {
        self.metrics
            .iter()
            .filter_map(|m| {
                self.value_of(&m.name, ticker)
                    .ok()
                    .map(|v| (m.name.clone(), v))
            })
            .collect()
    }

    /// How many times any formula has actually been evaluated.
    pub fn recomputations(&self) -> u64 {
        self.recomputations.load(Ordering::Relaxed)
    }
}
