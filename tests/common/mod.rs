#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use stockgrid::error::{GridError, Result};
use stockgrid::source::{Attributes, QuoteSource};
use tokio::sync::oneshot;

pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Answers immediately from a fixed table; unknown tickers fail.
#[derive(Default)]
pub struct FakeSource {
    responses: Mutex<HashMap<String, Attributes>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeSource {
    pub fn with(self, ticker: &str, pairs: &[(&str, &str)]) -> Self {
        self.set(ticker, pairs);
        self
    }

    pub fn set(&self, ticker: &str, pairs: &[(&str, &str)]) {
        self.responses
            .lock()
            .unwrap()
            .insert(ticker.to_string(), attrs(pairs));
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, ticker: &str) -> usize {
        self.calls().iter().filter(|(t, _)| t == ticker).count()
    }
}

#[async_trait]
impl QuoteSource for FakeSource {
    async fn fetch(&self, ticker: &str, nocache: bool) -> Result<Attributes> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), nocache));
        self.responses
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .ok_or_else(|| GridError::Scrape(format!("no page for {}", ticker)))
    }
}

/// Every fetch parks until the test releases it by call number.
#[derive(Default)]
pub struct GatedSource {
    pending: Mutex<Vec<(String, bool, Option<oneshot::Sender<Result<Attributes>>>)>>,
}

impl GatedSource {
    pub fn call_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn call(&self, index: usize) -> (String, bool) {
        let pending = self.pending.lock().unwrap();
        (pending[index].0.clone(), pending[index].1)
    }

    /// Yields until `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..10_000 {
            if self.call_count() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {} fetches, saw {}", n, self.call_count());
    }

    pub fn release(&self, index: usize, result: Result<Attributes>) {
        let sender = self.pending.lock().unwrap()[index]
            .2
            .take()
            .expect("call already released");
        let _ = sender.send(result);
    }
}

#[async_trait]
impl QuoteSource for GatedSource {
    async fn fetch(&self, ticker: &str, nocache: bool) -> Result<Attributes> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .push((ticker.to_string(), nocache, Some(tx)));
        rx.await
            .unwrap_or_else(|_| Err(GridError::Scrape("gate dropped".to_string())))
    }
}
