//! Fetch coordination: at most one load per ticker unless forced.
//!
//! The requested flag is set before the source is called and cleared again
//! only if the call fails. The source call is the single suspension point;
//! the store is written after it settles, in one update.
//!
//! A forced reload does not wait for or cancel an earlier fetch of the same
//! ticker. Whichever response settles last is the one left in the store.

use crate::error::Result;
use crate::pile::Pile;
use crate::source::{Attributes, QuoteSource};
use crate::store::ValueStore;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct FetchCoordinator {
    store: Arc<ValueStore>,
    source: Arc<dyn QuoteSource>,
    requested: Mutex<Pile<bool>>,
}

impl FetchCoordinator {
    pub fn new(store: Arc<ValueStore>, source: Arc<dyn QuoteSource>) -> Self {
        FetchCoordinator {
            store,
            source,
            requested: Mutex::new(Pile::new(|_| false)),
        }
    }

    fn flags(&self) -> MutexGuard<'_, Pile<bool>> {
        self.requested.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_requested(&self, ticker: &str) -> bool {
        self.flags().peek(ticker).copied().unwrap_or(false)
    }

    /// Sets the flag and reports whether it was clear before.
    fn claim(&self, ticker: &str) -> bool {
        let mut flags = self.flags();
        let flag = flags.get(ticker);
        let was_clear = !*flag;
        *flag = true;
        was_clear
    }

    /// Loads `ticker` unless a load was already started.
    ///
    /// Returns `Ok(None)` when the call was a no-op, otherwise the scraped
    /// attributes so the caller can grow its row list.
    pub async fn ensure_loaded(&self, ticker: &str) -> Result<Option<Attributes>> {
        if !self.claim(ticker) {
            debug!("{} already requested, skipping", ticker);
            return Ok(None);
        }
        self.run(ticker, false).await.map(Some)
    }

    /// Resets every attribute of `ticker` to the unloaded sentinel and
    /// fetches again, bypassing both the flag and the server cache.
    pub async fn force_reload(&self, ticker: &str) -> Result<Attributes> {
        let reset = self.store.reset_ticker(ticker);
        info!("Reloading {} ({} attributes reset)", ticker, reset);
        self.claim(ticker);
        self.run(ticker, true).await
    }

    async fn run(&self, ticker: &str, nocache: bool) -> Result<Attributes> {
        match self.source.fetch(ticker, nocache).await {
            Ok(attributes) => {
                self.store.apply_truth(ticker, &attributes);
                debug!("Loaded {} attributes for {}", attributes.len(), ticker);
                Ok(attributes)
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", ticker, e);
                self.flags().set(ticker, false);
                Err(e)
            }
        }
    }
}
