//! Statement profiling boundary.
//!
//! Profiling is optional, injected by the caller, and must not affect
//! execution semantics: the connector reports each statement and its
//! elapsed time to the hook and never depends on its output.

use std::{
    fmt::Debug,
    sync::Mutex,
    time::Duration,
};

/// Passive observer of executed statements.
///
/// The connector calls [`record`](Profiler::record) after every execute or
/// query round-trip, but only while [`enabled`](Profiler::enabled) reports
/// true.
pub trait Profiler: Send + Sync + Debug {
    /// Whether the hook currently wants events.
    fn enabled(&self) -> bool {
        true
    }

    /// Observes one executed statement and the time it took.
    fn record(&self, statement: &str, elapsed: Duration);
}

/// One observed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRecord {
    pub statement: String,
    pub elapsed: Duration,
}

/// A profiler that keeps every observed statement in memory.
///
/// Handy in tests and demos for asserting which SQL the store emitted.
#[derive(Debug, Default)]
pub struct StatementLog {
    records: Mutex<Vec<StatementRecord>>,
}

impl StatementLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in execution order.
    pub fn records(&self) -> Vec<StatementRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Profiler for StatementLog {
    fn record(&self, statement: &str, elapsed: Duration) {
        let record = StatementRecord {
            statement: statement.to_string(),
            elapsed,
        };
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}
