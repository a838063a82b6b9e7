//! Truth / override / resolved value layers.
//!
//! Every (ticker, attribute) pair has a truth slot written by the fetch path
//! and an override slot written by user edits. The resolved value is never
//! stored: it is computed on read as "override if non-empty, else truth", so
//! it cannot go stale.
//!
//! Each write stamps the slot with a fresh revision from a store-wide clock.
//! Readers that memoize (the metric engine) remember the stamps they saw and
//! treat any difference as an invalidation, which makes the dependency edges
//! explicit instead of relying on ambient tracking.

use crate::parser::UNLOADED;
use crate::pile::Pile;
use crate::source::Attributes;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Revisions of the (truth, override) slots behind a resolved value.
pub type Stamp = (u64, u64);

#[derive(Clone, Debug)]
struct Slot {
    value: String,
    revision: u64,
}

impl Slot {
    fn unloaded(_: &str) -> Self {
        Slot {
            value: UNLOADED.to_string(),
            revision: 0,
        }
    }

    fn empty(_: &str) -> Self {
        Slot {
            value: String::new(),
            revision: 0,
        }
    }
}

struct Layers {
    truth: Pile<Pile<Slot>>,
    overrides: Pile<Pile<Slot>>,
    clock: u64,
}

impl Layers {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn resolve(&self, ticker: &str, attribute: &str) -> Resolved {
        let truth = self.truth.peek(ticker).and_then(|row| row.peek(attribute));
        let over = self
            .overrides
            .peek(ticker)
            .and_then(|row| row.peek(attribute));

        let stamp = (
            truth.map_or(0, |s| s.revision),
            over.map_or(0, |s| s.revision),
        );
        let value = match over {
            Some(slot) if !slot.value.is_empty() => slot.value.clone(),
            _ => truth.map_or_else(|| UNLOADED.to_string(), |s| s.value.clone()),
        };
        Resolved { value, stamp }
    }

    fn write_truth(&mut self, ticker: &str, attribute: &str, value: &str) {
        let revision = self.tick();
        let slot = self.truth.get(ticker).get(attribute);
        slot.value = value.to_string();
        slot.revision = revision;
    }
}

/// A resolved value together with the stamp it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolved {
    pub value: String,
    pub stamp: Stamp,
}

/// Explicitly constructed value store, shared by readers and writers.
///
/// Writes take the store-wide write lock, so a whole scrape result lands as
/// one update and readers always see a consistent snapshot.
pub struct ValueStore {
    layers: RwLock<Layers>,
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStore {
    pub fn new() -> Self {
        ValueStore {
            layers: RwLock::new(Layers {
                truth: Pile::new(|_| Pile::new(Slot::unloaded)),
                overrides: Pile::new(|_| Pile::new(Slot::empty)),
                clock: 0,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Layers> {
        self.layers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Layers> {
        self.layers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Override if non-empty, else truth, else the unloaded sentinel.
    pub fn resolved(&self, ticker: &str, attribute: &str) -> String {
        self.read().resolve(ticker, attribute).value
    }

    pub fn resolve(&self, ticker: &str, attribute: &str) -> Resolved {
        self.read().resolve(ticker, attribute)
    }

    /// Resolves several attributes of one ticker from a single snapshot.
    pub fn resolve_many<S: AsRef<str>>(&self, ticker: &str, attributes: &[S]) -> Vec<Resolved> {
        let layers = self.read();
        attributes
            .iter()
            .map(|a| layers.resolve(ticker, a.as_ref()))
            .collect()
    }

    pub fn truth(&self, ticker: &str, attribute: &str) -> String {
        self.read()
            .truth
            .peek(ticker)
            .and_then(|row| row.peek(attribute))
            .map_or_else(|| UNLOADED.to_string(), |s| s.value.clone())
    }

    /// The user override, or an empty string when there is none.
    pub fn override_value(&self, ticker: &str, attribute: &str) -> String {
        self.read()
            .overrides
            .peek(ticker)
            .and_then(|row| row.peek(attribute))
            .map(|s| s.value.clone())
            .unwrap_or_default()
    }

    pub fn set_true(&self, ticker: &str, attribute: &str, value: &str) {
        self.write().write_truth(ticker, attribute, value);
    }

    /// Writes every pair of a scrape result as one logical update.
    pub fn apply_truth(&self, ticker: &str, attributes: &Attributes) {
        let mut layers = self.write();
        for (attribute, value) in attributes {
            layers.write_truth(ticker, attribute, value);
        }
    }

    /// Puts every materialized truth slot of `ticker` back to the sentinel.
    /// Returns how many slots were reset.
    pub fn reset_ticker(&self, ticker: &str) -> usize {
        let mut layers = self.write();
        let Some(row) = layers.truth.peek(ticker) else {
            return 0;
        };
        let attributes: Vec<String> = row.keys().map(str::to_string).collect();
        for attribute in &attributes {
            layers.write_truth(ticker, attribute, UNLOADED);
        }
        attributes.len()
    }

    pub fn set_override(&self, ticker: &str, attribute: &str, value: &str) {
        let mut layers = self.write();
        let revision = layers.tick();
        let slot = layers.overrides.get(ticker).get(attribute);
        slot.value = value.to_string();
        slot.revision = revision;
    }

    pub fn clear_override(&self, ticker: &str, attribute: &str) {
        self.set_override(ticker, attribute, "");
    }

    pub fn has_override(&self, ticker: &str, attribute: &str) -> bool {
        !self.override_value(ticker, attribute).is_empty()
    }

    /// Tickers that have at least one materialized truth slot.
    pub fn tickers(&self) -> Vec<String> {
        self.read().truth.keys().map(str::to_string).collect()
    }

    /// Materialized truth attributes of `ticker`, in first-write order.
    pub fn attributes(&self, ticker: &str) -> Vec<String> {
        self.read()
            .truth
            .peek(ticker)
            .map(|row| row.keys().map(str::to_string).collect())
            .unwrap_or_default()
    }
}
