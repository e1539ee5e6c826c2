//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: a single probe checks whether the backend recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first availability check after reset_timeout
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (timer restarts)
//! ```
//!
//! # Design Decisions
//! - Per-service circuit, created lazily on first reference
//! - The Open → Half-Open move happens inside `is_available`, never on a timer
//! - Only one probe in Half-Open; an unreported probe expires after reset_timeout
//! - Updates for one service are serialized by the map's entry lock

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;
use crate::resilience::clock::{Clock, SystemClock};

/// Circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Closed,
    Open,
    HalfOpen,
}

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug)]
struct Circuit {
    state: State,
    consecutive_failures: u32,
    last_transition: Instant,
    probe_started: Option<Instant>,
}

impl Circuit {
    fn new(now: Instant) -> Self {
        Self {
            state: State::Closed,
            consecutive_failures: 0,
            last_transition: now,
            probe_started: None,
        }
    }

    fn transition(&mut self, to: State, now: Instant) -> Option<State> {
        if self.state == to {
            return None;
        }
        self.state = to;
        self.last_transition = now;
        Some(to)
    }
}

/// Point-in-time view of one circuit.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub service: String,
    pub state: State,
    pub consecutive_failures: u32,
    /// Time since the last state change.
    #[serde(rename = "since_transition_ms", serialize_with = "serialize_millis")]
    pub since_transition: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Per-service circuit breakers.
#[derive(Debug)]
pub struct CircuitBreaker {
    circuits: DashMap<String, Circuit>,
    failure_threshold: u32,
    reset_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    /// Create a breaker driven by the system clock.
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self::with_clock(config.failure_threshold, config.reset_timeout(), Arc::new(SystemClock))
    }

    pub fn with_clock(failure_threshold: u32, reset_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            circuits: DashMap::new(),
            failure_threshold,
            reset_timeout,
            clock,
        }
    }

    /// Whether a call to `service` may proceed.
    ///
    /// May move an open circuit to half-open when its reset timeout has
    /// elapsed; the caller that triggers the move becomes the probe.
    pub fn is_available(&self, service: &str) -> bool {
        let now = self.clock.now();
        let reset_timeout = self.reset_timeout;

        let (available, transition) = self.with_circuit(service, now, |circuit| match circuit.state {
            State::Closed => (true, None),
            State::Open => {
                if now.saturating_duration_since(circuit.last_transition) >= reset_timeout {
                    circuit.probe_started = Some(now);
                    (true, circuit.transition(State::HalfOpen, now))
                } else {
                    (false, None)
                }
            }
            State::HalfOpen => match circuit.probe_started {
                Some(started) if now.saturating_duration_since(started) < reset_timeout => (false, None),
                _ => {
                    circuit.probe_started = Some(now);
                    (true, None)
                }
            },
        });

        self.report(service, transition);
        available
    }

    /// Record a completed call to `service`.
    pub fn record_success(&self, service: &str) {
        let now = self.clock.now();
        let transition = self.with_circuit(service, now, |circuit| {
            circuit.consecutive_failures = 0;
            match circuit.state {
                State::HalfOpen => {
                    circuit.probe_started = None;
                    circuit.transition(State::Closed, now)
                }
                State::Closed | State::Open => None,
            }
        });
        self.report(service, transition);
    }

    /// Record a transport-level failure calling `service`.
    pub fn record_failure(&self, service: &str) {
        let now = self.clock.now();
        let threshold = self.failure_threshold;
        let transition = self.with_circuit(service, now, |circuit| match circuit.state {
            State::Closed => {
                circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
                if circuit.consecutive_failures >= threshold {
                    circuit.transition(State::Open, now)
                } else {
                    None
                }
            }
            State::HalfOpen => {
                circuit.probe_started = None;
                circuit.transition(State::Open, now)
            }
            // Late failures from calls admitted before the trip.
            State::Open => None,
        });
        self.report(service, transition);
    }

    /// Current state of `service`'s circuit, if one exists.
    pub fn state(&self, service: &str) -> Option<State> {
        self.circuits.get(service).map(|c| c.state)
    }

    pub fn snapshot(&self, service: &str) -> Option<CircuitSnapshot> {
        let now = self.clock.now();
        self.circuits.get(service).map(|c| CircuitSnapshot {
            service: service.to_string(),
            state: c.state,
            consecutive_failures: c.consecutive_failures,
            since_transition: now.saturating_duration_since(c.last_transition),
        })
    }

    /// Snapshots of every known circuit, sorted by service name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let now = self.clock.now();
        let mut all: Vec<_> = self
            .circuits
            .iter()
            .map(|entry| CircuitSnapshot {
                service: entry.key().clone(),
                state: entry.state,
                consecutive_failures: entry.consecutive_failures,
                since_transition: now.saturating_duration_since(entry.last_transition),
            })
            .collect();
        all.sort_by(|a, b| a.service.cmp(&b.service));
        all
    }

    fn with_circuit<R>(&self, service: &str, now: Instant, f: impl FnOnce(&mut Circuit) -> R) -> R {
        if let Some(mut circuit) = self.circuits.get_mut(service) {
            return f(&mut circuit);
        }
        let mut circuit = self
            .circuits
            .entry(service.to_string())
            .or_insert_with(|| Circuit::new(now));
        f(&mut circuit)
    }

    fn report(&self, service: &str, transition: Option<State>) {
        let Some(to) = transition else {
            return;
        };
        match to {
            State::Open => tracing::warn!(service = %service, "Circuit opened"),
            State::HalfOpen => tracing::info!(service = %service, "Circuit half-open, probing"),
            State::Closed => tracing::info!(service = %service, "Circuit closed"),
        }
        metrics::record_circuit_transition(service, to);
    }
}
