//! Bounded concurrency gate.
//!
//! Jobs are queued in submission order and only turned into futures when a slot
//! frees up, so at most `limit` futures exist at any instant. Futures are
//! polled by whoever awaits [`ConcurrencyGate::next_settled`]; the gate never
//! spawns.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use std::future::Future;

pub struct ConcurrencyGate<J, Fut: Future> {
    limit: usize,
    queued: VecDeque<J>,
    in_flight: FuturesUnordered<Fut>,
}

impl<J, Fut: Future> ConcurrencyGate<J, Fut> {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            queued: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn extend(&mut self, jobs: impl IntoIterator<Item = J>) {
        self.queued.extend(jobs);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queued.is_empty() && self.in_flight.is_empty()
    }

    /// Tops up the in-flight set from the queue, then waits for the next future
    /// to settle and returns its output. `None` once every job has settled.
    ///
    /// `admit` turns a queued job into its future at admission time.
    pub async fn next_settled<A>(&mut self, mut admit: A) -> Option<Fut::Output>
    where
        A: FnMut(J) -> Fut,
    {
        while self.in_flight.len() < self.limit {
            match self.queued.pop_front() {
                Some(job) => self.in_flight.push(admit(job)),
                None => break,
            }
        }

        self.in_flight.next().await
    }
}
