/*!
# Stock Grid

Track a set of stock tickers in a grid: rows are attributes scraped from a
financial quote page, columns are tickers, and some rows are derived metrics
computed from other rows (CAPM expected return, implied price, ...). Any
cell can be overridden by hand; the override shadows the scraped value until
it is cleared.

## Architecture

### Value layer
- **pile**: string-keyed container that builds missing entries on demand
- **parser**: scraped text to numbers (`12%`, `2.1T`, `...`)
- **store**: truth / override layers; resolved = override, else truth
- **metrics**: named formulas over declared dependency rows, memoized per
  ticker and invalidated by writes to those rows only
- **formulas**: the stock metrics and their constants

### Fetching
- **source**: the `QuoteSource` trait and the client for the server endpoint
- **scrape**: page scraper turning quote pages into attribute/value pairs
- **fetch**: at most one load per ticker, forced reloads, failure rollback

### Session
- **columns**: column actions, discovered rows, saved groups
- **saving**: local snapshot of columns and groups
- **grid**: ties everything together for a front end

### Server
- **app**: `GET /endpoint?ticker=T&nocache=b` with a per-process cache, and
  the static bundle

## Data flow

A visible ticker is claimed by the fetch coordinator, fetched from the
source, and written into the store's truth layer in one update. Metric
values read through the store, so the next read after that write sees
recomputed results.
*/

pub mod columns;
pub mod config;
pub mod error;
pub mod fetch;
pub mod formulas;
pub mod grid;
pub mod metrics;
pub mod parser;
pub mod pile;
pub mod saving;
pub mod scrape;
pub mod source;
pub mod store;

#[cfg(feature = "web")]
pub mod app;

pub use error::{GridError, Result};
pub use grid::Grid;
pub use metrics::MetricEngine;
pub use parser::{parse_value, UNLOADED};
pub use pile::Pile;
pub use source::{Attributes, QuoteSource};
pub use store::ValueStore;
