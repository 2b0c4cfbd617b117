//! Single-flight deduplication of concurrent misses
//!
//! The first caller to miss on a key becomes the leader and executes. Callers
//! that miss on the same key while the leader is running wait for its result.
//! A follower only ever receives a successful result: if the leader fails or
//! is dropped mid-flight, each follower executes on its own, so every caller
//! still sees its own engine error.

use crate::cache::types::{CacheKey, CacheValue};
use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// `None` while running, `Some(None)` on leader failure, `Some(Some(v))` on success
type FlightState = Option<Option<CacheValue>>;

enum Flight<'a> {
    Leader(LeaderGuard<'a>),
    Follower(watch::Receiver<FlightState>),
}

/// Owns a key's in-flight slot. The slot is released when the guard drops,
/// whether the leader finished or its future was cancelled.
struct LeaderGuard<'a> {
    flight: &'a SingleFlight,
    key: CacheKey,
    tx: watch::Sender<FlightState>,
    outcome: FlightState,
}

impl LeaderGuard<'_> {
    fn finish(mut self, outcome: Option<CacheValue>) {
        self.outcome = Some(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        // The sender is still alive here, so the slot cannot belong to another leader
        self.flight.map().remove(&self.key);

        // Without an outcome the sender just closes and followers run on their own
        if let Some(outcome) = self.outcome.take() {
            let _ = self.tx.send(Some(outcome));
        }
    }
}

/// Outcome of a deduplicated execution
#[derive(Debug)]
pub struct FlightResult {
    pub result: Result<CacheValue>,
    /// True when the value came from another caller's execution
    pub coalesced: bool,
}

/// In-flight executions keyed by cache key
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<HashMap<CacheKey, watch::Receiver<FlightState>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or wait on an identical run already in flight
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue>>,
    {
        match self.join(key) {
            Flight::Leader(guard) => {
                let result = work().await;
                guard.finish(result.as_ref().ok().cloned());
                FlightResult {
                    result,
                    coalesced: false,
                }
            }
            Flight::Follower(mut rx) => {
                let shared = match rx.wait_for(|state| state.is_some()).await {
                    Ok(state) => (*state).clone().flatten(),
                    Err(_) => None,
                };

                match shared {
                    Some(value) => {
                        debug!("Coalesced onto in-flight execution: {}", key);
                        FlightResult {
                            result: Ok(value),
                            coalesced: true,
                        }
                    }
                    None => {
                        debug!("In-flight leader failed, executing independently: {}", key);
                        FlightResult {
                            result: work().await,
                            coalesced: false,
                        }
                    }
                }
            }
        }
    }

    /// Number of keys currently being executed
    pub fn in_flight(&self) -> usize {
        self.map().len()
    }

    fn join(&self, key: &str) -> Flight<'_> {
        let mut in_flight = self.map();

        if let Some(rx) = in_flight.get(key) {
            return Flight::Follower(rx.clone());
        }

        let (tx, rx) = watch::channel(None);
        in_flight.insert(key.to_string(), rx);
        Flight::Leader(LeaderGuard {
            flight: self,
            key: key.to_string(),
            tx,
            outcome: None,
        })
    }

    // Never held across an await
    fn map(&self) -> MutexGuard<'_, HashMap<CacheKey, watch::Receiver<FlightState>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
