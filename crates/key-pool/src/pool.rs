//! Credential pool state and least-recently-used rotation
//!
//! The pool holds per-key state (available, parked until a timestamp, request
//! counters) behind one async mutex. Every read-modify-write happens inside a
//! single guard with no await point, so concurrent requests sharing the pool
//! never observe a half-applied rotation.
//!
//! Parked keys return automatically: whenever rotation runs, keys whose
//! `unavailable_until` has passed flip back to available before selection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::Secret;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::clock::{Clock, SystemClock, add_saturating};
use crate::error::{Error, Result};

/// Separator between keys in the configuration value.
const DELIMITER: char = ',';

/// Runtime state of one key.
///
/// Transitions:
/// - available → unavailable (429, `unavailable_until` set)
/// - unavailable → available (rotation observes `unavailable_until` elapsed)
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialState {
    /// Non-secret label used in logs, e.g. `pub_1234...`.
    pub identifier: String,
    pub available: bool,
    pub unavailable_until: Option<DateTime<Utc>>,
    pub total_requests: u64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl CredentialState {
    fn new(identifier: String) -> Self {
        Self {
            identifier,
            available: true,
            unavailable_until: None,
            total_requests: 0,
            last_used_at: None,
        }
    }

    /// Availability as of `now`, counting an elapsed expiry as available.
    fn available_at(&self, now: DateTime<Utc>) -> bool {
        self.available || self.unavailable_until.is_some_and(|until| until <= now)
    }
}

/// A key handed out for one HTTP attempt.
#[derive(Debug, Clone)]
pub struct Lease {
    index: usize,
    identifier: String,
    key: Secret<String>,
}

impl Lease {
    /// Position of the key in configuration order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The raw key, for placing into the outgoing request only.
    pub fn expose_key(&self) -> &str {
        self.key.expose()
    }
}

/// Outcome of reporting a rate limit.
#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    /// Another key is now current.
    Rotated { from: String, to: String },
    /// No key is available; `earliest_recovery` is the soonest any key returns.
    Exhausted {
        earliest_recovery: Option<DateTime<Utc>>,
    },
}

struct PoolState {
    states: Vec<CredentialState>,
    current_index: usize,
}

/// Pool of API keys with rate-limit rotation.
///
/// Keys and their identifiers are immutable after construction; only the
/// per-key state and the current index live behind the mutex.
pub struct CredentialPool {
    credentials: Vec<Secret<String>>,
    identifiers: Vec<String>,
    state: Mutex<PoolState>,
    clock: Arc<dyn Clock>,
}

impl CredentialPool {
    /// Split a delimited key list: trim each piece, drop empty pieces.
    pub fn parse_delimited(raw: &str) -> Vec<String> {
        raw.split(DELIMITER)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Build a pool from `"keyA, keyB"` using the system clock.
    pub fn from_delimited(raw: &str) -> Result<Self> {
        Self::with_clock(raw, Arc::new(SystemClock))
    }

    /// Build a pool with an explicit clock.
    ///
    /// Fails with `Error::Config` when no key survives parsing. Repeated keys
    /// are kept once, at their first position.
    pub fn with_clock(raw: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut credentials = Vec::new();
        for key in Self::parse_delimited(raw) {
            let secret = Secret::new(key.clone());
            if seen.insert(key) {
                credentials.push(secret);
            } else {
                warn!(
                    credential = %secret.prefix_label(),
                    "duplicate API key in configuration, ignoring repeat"
                );
            }
        }

        if credentials.is_empty() {
            return Err(Error::Config("at least one credential required".into()));
        }

        let identifiers = unique_identifiers(&credentials);
        let states = identifiers
            .iter()
            .cloned()
            .map(CredentialState::new)
            .collect();

        info!(credentials = credentials.len(), "credential pool initialized");
        Ok(Self {
            credentials,
            identifiers,
            state: Mutex::new(PoolState {
                states,
                current_index: 0,
            }),
            clock,
        })
    }

    /// Number of keys in the pool (always at least one).
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false: construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Rotation logging only happens with more than one key.
    pub fn is_multi_key(&self) -> bool {
        self.credentials.len() > 1
    }

    /// Identifiers in configuration order.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Hand out the current key for a new logical request.
    ///
    /// If the current key is parked, rotation runs first. Returns `None` when
    /// every key is parked (logged once as exhaustion). The returned key is
    /// stamped as used.
    pub async fn acquire(&self) -> Option<Lease> {
        let now = self.clock.now();
        let verbose = self.is_multi_key();
        let mut state = self.state.lock().await;

        let current = state.current_index;
        if !state.states[current].available {
            match rotate(&mut state.states, now, verbose) {
                Some(next) => {
                    state.current_index = next;
                    if next != current {
                        log_rotation(&state.states, current, next, verbose);
                    }
                }
                None => {
                    log_exhausted(&state.states);
                    return None;
                }
            }
        }

        let index = state.current_index;
        mark_used(&mut state.states[index], now);
        Some(self.lease(index))
    }

    /// Count another HTTP attempt on a leased key (ordinary retries).
    pub async fn record_attempt(&self, lease: &Lease) {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        mark_used(&mut state.states[lease.index], now);
    }

    /// Park a rate-limited key for `window` and rotate to the next one.
    pub async fn report_rate_limited(&self, lease: &Lease, window: Duration) -> Rotation {
        let now = self.clock.now();
        let until = add_saturating(now, window);
        let verbose = self.is_multi_key();
        let mut state = self.state.lock().await;

        let parked = &mut state.states[lease.index];
        parked.available = false;
        parked.unavailable_until = Some(until);
        metrics::counter!("newsdata_rate_limited_total").increment(1);
        if verbose {
            warn!(
                credential = %parked.identifier,
                unavailable_until = %until.to_rfc3339(),
                "rate limit detected, credential unavailable"
            );
        }

        // Another request may already have moved the pool off this key.
        let previous = state.current_index;
        match rotate(&mut state.states, now, verbose) {
            Some(next) => {
                state.current_index = next;
                if next != previous {
                    log_rotation(&state.states, previous, next, verbose);
                }
                Rotation::Rotated {
                    from: state.states[previous].identifier.clone(),
                    to: state.states[next].identifier.clone(),
                }
            }
            None => Rotation::Exhausted {
                earliest_recovery: log_exhausted(&state.states),
            },
        }
    }

    /// Run the rotation algorithm on its own and make the result current.
    ///
    /// Returns the identifier of the selected key, or `None` if every key is
    /// parked. Does not stamp the key as used.
    pub async fn rotate(&self) -> Option<String> {
        let now = self.clock.now();
        let verbose = self.is_multi_key();
        let mut state = self.state.lock().await;
        let previous = state.current_index;
        let next = rotate(&mut state.states, now, verbose)?;
        state.current_index = next;
        if next != previous {
            log_rotation(&state.states, previous, next, verbose);
        }
        Some(state.states[next].identifier.clone())
    }

    /// Log exhaustion for a request that rotated through the whole pool.
    ///
    /// Returns the earliest recovery time of any parked key.
    pub async fn report_exhausted(&self) -> Option<DateTime<Utc>> {
        let state = self.state.lock().await;
        log_exhausted(&state.states)
    }

    /// Identifier of the key the next request will use.
    pub async fn current(&self) -> String {
        let state = self.state.lock().await;
        state.states[state.current_index].identifier.clone()
    }

    /// Copy of every key's state, in configuration order.
    pub async fn snapshot(&self) -> Vec<CredentialState> {
        self.state.lock().await.states.clone()
    }

    /// Replace every key inside `text` with its identifier.
    pub fn redact(&self, text: &str) -> String {
        self.credentials
            .iter()
            .zip(&self.identifiers)
            .fold(text.to_owned(), |acc, (key, id)| {
                acc.replace(key.expose().as_str(), id)
            })
    }

    /// Pool summary for health endpoints.
    ///
    /// Status mapping: all available → healthy, some available → degraded,
    /// none available → unhealthy. Keys whose window has elapsed count as
    /// available even before rotation observes it.
    pub async fn health(&self) -> serde_json::Value {
        let now = self.clock.now();
        let state = self.state.lock().await;

        let mut available_count = 0usize;
        let credentials: Vec<serde_json::Value> = state
            .states
            .iter()
            .map(|s| {
                let available = s.available_at(now);
                if available {
                    available_count += 1;
                }
                let recovery_in_secs = match s.unavailable_until {
                    Some(until) if !available => (until - now).num_seconds().max(0),
                    _ => 0,
                };
                serde_json::json!({
                    "id": s.identifier,
                    "status": if available { "available" } else { "rate_limited" },
                    "unavailable_until": s.unavailable_until.map(|t| t.to_rfc3339()),
                    "recovery_in_secs": recovery_in_secs,
                    "total_requests": s.total_requests,
                    "last_used_at": s.last_used_at.map(|t| t.to_rfc3339()),
                })
            })
            .collect();

        let total = state.states.len();
        let status = if available_count == total {
            "healthy"
        } else if available_count > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": status,
            "credentials_total": total,
            "credentials_available": available_count,
            "credentials_rate_limited": total - available_count,
            "current": state.states[state.current_index].identifier,
            "credentials": credentials,
        })
    }

    fn lease(&self, index: usize) -> Lease {
        Lease {
            index,
            identifier: self.identifiers[index].clone(),
            key: self.credentials[index].clone(),
        }
    }
}

/// Prefix labels, disambiguated with `#n` (1-based position) on collision.
fn unique_identifiers(credentials: &[Secret<String>]) -> Vec<String> {
    let mut used = HashSet::new();
    credentials
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let label = key.prefix_label();
            let id = if used.contains(&label) {
                format!("{label}#{}", i + 1)
            } else {
                label
            };
            used.insert(id.clone());
            id
        })
        .collect()
}

fn mark_used(state: &mut CredentialState, now: DateTime<Utc>) {
    state.total_requests += 1;
    state.last_used_at = Some(now);
}

/// Pick the least-recently-used available key.
///
/// 1. Keys whose `unavailable_until` has passed become available again.
/// 2. Among available keys, never-used keys come first, then oldest
///    `last_used_at`; ties keep configuration order (stable sort).
fn rotate(states: &mut [CredentialState], now: DateTime<Utc>, verbose: bool) -> Option<usize> {
    for state in states.iter_mut() {
        if state.available {
            continue;
        }
        if state.unavailable_until.is_some_and(|until| until <= now) {
            state.available = true;
            state.unavailable_until = None;
            metrics::counter!("newsdata_key_recovered_total").increment(1);
            if verbose {
                info!(credential = %state.identifier, "credential available again");
            }
        }
    }

    let mut candidates: Vec<usize> = (0..states.len()).filter(|&i| states[i].available).collect();
    candidates.sort_by_key(|&i| states[i].last_used_at);
    candidates.first().copied()
}

fn log_rotation(states: &[CredentialState], from: usize, to: usize, verbose: bool) {
    metrics::counter!("newsdata_key_rotations_total").increment(1);
    if verbose {
        info!(
            from = %states[from].identifier,
            to = %states[to].identifier,
            "rotated to next credential"
        );
    }
}

/// Log pool exhaustion and return the earliest recovery time.
fn log_exhausted(states: &[CredentialState]) -> Option<DateTime<Utc>> {
    metrics::counter!("newsdata_pool_exhausted_total").increment(1);
    let earliest = states.iter().filter_map(|s| s.unavailable_until).min();
    let exhausted: Vec<&str> = states.iter().map(|s| s.identifier.as_str()).collect();
    error!(
        exhausted = ?exhausted,
        earliest_recovery = %earliest.map(|t| t.to_rfc3339()).unwrap_or_else(|| "unknown".into()),
        "all credentials exhausted, returning empty result"
    );
    earliest
}
