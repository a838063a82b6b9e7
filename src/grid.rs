//! A tracking session: visible tickers, discovered rows, saved groups, and
//! the store/engine/fetcher they read through.

use crate::columns::{normalize_ticker, ColumnAction, ColumnState, RowSet, SavedGroups};
use crate::error::Result;
use crate::fetch::FetchCoordinator;
use crate::formulas::{register_defaults, FormulaConfig};
use crate::metrics::MetricEngine;
use crate::saving::{load_snapshot, save_columns, save_groups, Storage};
use crate::source::QuoteSource;
use crate::store::ValueStore;
use futures_util::future::join_all;
use log::{info, warn};
use std::fmt;
use std::sync::Arc;

pub struct Grid {
    store: Arc<ValueStore>,
    engine: MetricEngine,
    fetcher: FetchCoordinator,
    storage: Arc<dyn Storage>,
    columns: ColumnState,
    rows: RowSet,
    groups: SavedGroups,
    columns_changed: bool,
}

impl Grid {
    /// Restores columns and groups from `storage` and registers the stock
    /// formulas.
    pub fn open(
        storage: Arc<dyn Storage>,
        source: Arc<dyn QuoteSource>,
        formulas: FormulaConfig,
    ) -> Self {
        let snapshot = load_snapshot(storage.as_ref());
        let store = Arc::new(ValueStore::new());
        let mut engine = MetricEngine::new(store.clone());
        register_defaults(&mut engine, formulas);
        let fetcher = FetchCoordinator::new(store.clone(), source);

        info!(
            "Opened grid with {} columns and {} saved groups",
            snapshot.columns.len(),
            snapshot.groups.len()
        );

        Grid {
            store,
            engine,
            fetcher,
            storage,
            columns: ColumnState::new(snapshot.columns),
            rows: RowSet::new(),
            groups: SavedGroups::new(snapshot.groups),
            columns_changed: true,
        }
    }

    pub fn store(&self) -> &Arc<ValueStore> {
        &self.store
    }

    pub fn engine(&self) -> &MetricEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut MetricEngine {
        &mut self.engine
    }

    pub fn fetcher(&self) -> &FetchCoordinator {
        &self.fetcher
    }

    pub fn columns(&self) -> &[String] {
        &self.columns.columns
    }

    pub fn selected(&self) -> Option<usize> {
        self.columns.selected
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn groups(&self) -> &SavedGroups {
        &self.groups
    }

    /// Applies `action`, persists the column list, and returns the visible
    /// tickers that have not been requested yet.
    ///
    /// The new column list is written before it replaces the current one, so
    /// a storage failure leaves the session unchanged.
    pub fn dispatch(&mut self, action: ColumnAction) -> Result<Vec<String>> {
        let next = self.columns.clone().reduce(action);
        if next.columns != self.columns.columns {
            save_columns(self.storage.as_ref(), &next.columns)?;
            self.columns_changed = true;
        }
        self.columns = next;

        Ok(self
            .columns
            .columns
            .iter()
            .filter(|t| !self.fetcher.is_requested(t))
            .cloned()
            .collect())
    }

    /// Appends a typed ticker. Blank input is ignored.
    pub fn add_ticker(&mut self, input: &str) -> Result<Option<String>> {
        let Some(ticker) = normalize_ticker(input) else {
            return Ok(None);
        };
        self.dispatch(ColumnAction::Append(ticker.clone()))?;
        Ok(Some(ticker))
    }

    /// Loads every visible ticker not requested yet, concurrently, and grows
    /// the row list from what comes back. Runs only when the column list
    /// changed since the last pass; failures are logged and left for a
    /// refresh. Returns how many tickers loaded.
    pub async fn load_visible(&mut self) -> usize {
        if !self.columns_changed {
            return 0;
        }
        self.columns_changed = false;

        let tickers = self.columns.columns.clone();
        let fetcher = &self.fetcher;
        let results = join_all(tickers.iter().map(|t| fetcher.ensure_loaded(t))).await;

        let mut loaded = 0;
        for (ticker, result) in tickers.iter().zip(results) {
            match result {
                Ok(Some(attributes)) => {
                    self.rows.add_new_rows(&attributes);
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => warn!("{} stays unloaded: {}", ticker, e),
            }
        }
        loaded
    }

    /// Forces a reload of the column at `index`. Out of range is a no-op.
    pub async fn refresh(&mut self, index: usize) -> Result<()> {
        let Some(ticker) = self.columns.columns.get(index).cloned() else {
            return Ok(());
        };
        let attributes = self.fetcher.force_reload(&ticker).await?;
        self.rows.add_new_rows(&attributes);
        Ok(())
    }

    pub fn save_group(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        let mut groups = self.groups.clone();
        groups.save(name, &self.columns.columns);
        save_groups(self.storage.as_ref(), groups.as_map())?;
        self.groups = groups;
        Ok(())
    }

    pub fn delete_group(&mut self, name: &str) -> Result<bool> {
        let mut groups = self.groups.clone();
        if !groups.delete(name) {
            return Ok(false);
        }
        save_groups(self.storage.as_ref(), groups.as_map())?;
        self.groups = groups;
        Ok(true)
    }

    /// Replaces the visible columns with a saved group.
    pub fn apply_group(&mut self, name: &str) -> Result<bool> {
        let Some(columns) = self.groups.get(name).map(<[String]>::to_vec) else {
            return Ok(false);
        };
        self.dispatch(ColumnAction::Set(columns))?;
        Ok(true)
    }

    pub fn edit(&self, ticker: &str, attribute: &str, value: &str) {
        self.store.set_override(ticker, attribute, value);
    }

    pub fn clear(&self, ticker: &str, attribute: &str) {
        self.store.clear_override(ticker, attribute);
    }

    /// Rows that feed `metric`, for highlighting.
    pub fn highlights(&self, metric: &str) -> Vec<String> {
        self.engine.dependencies(metric).map(<[String]>::to_vec).unwrap_or_default()
    }

    /// Scraped rows with their resolved values, then one row per metric.
    pub fn table(&self) -> Table {
        let columns = self.columns.columns.clone();
        let mut rows = Vec::with_capacity(self.rows.len());

        for attribute in self.rows.rows() {
            let cells = columns
                .iter()
                .map(|ticker| self.store.resolved(ticker, attribute))
                .collect();
            rows.push(TableRow {
                label: attribute.to_string(),
                cells,
                derived: false,
            });
        }

        for metric in self.engine.names() {
            let cells = columns
                .iter()
                .map(|ticker| match self.engine.value_of(metric, ticker) {
                    Ok(value) => format_number(value),
                    Err(_) => f64::NAN.to_string(),
                })
                .collect();
            rows.push(TableRow {
                label: metric.to_string(),
                cells,
                derived: true,
            });
        }

        Table { columns, rows }
    }
}

/// Four decimals, or four significant digits below 0.1, so small values
/// never collapse to zero.
fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    if magnitude < -9 {
        return format!("{:e}", value);
    }
    let decimals = (3 - magnitude).max(4) as usize;
    format!("{:.*}", decimals, value)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableRow {
    pub label: String,
    pub cells: Vec<String>,
    pub derived: bool,
}

/// A rendered view of the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn row(&self, label: &str) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .max()
            .unwrap_or(0)
            .max(4);

        write!(f, "{:<width$}", "", width = label_width + 2)?;
        for column in &self.columns {
            write!(f, "{:<16}", column)?;
        }
        writeln!(f)?;

        for row in &self.rows {
            let marker = if row.derived { "= " } else { "  " };
            write!(f, "{:<width$}{}", row.label, marker, width = label_width)?;
            for cell in &row.cells {
                write!(f, "{:<16}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
