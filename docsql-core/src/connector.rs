//! Engine access with statement timing.
//!
//! The connector is the single funnel every statement passes through on the
//! way to the engine. It times each round-trip and reports it to the
//! profiler hook when one is installed and enabled.

use std::{sync::Arc, time::Instant};

use crate::engine::{Engine, Row};
use crate::error::DocSqlResult;
use crate::profile::Profiler;

/// Wraps an [`Engine`] and profiles every statement that crosses it.
#[derive(Debug)]
pub struct Connector<E> {
    engine: E,
    profiler: Option<Arc<dyn Profiler>>,
}

impl<E: Engine> Connector<E> {
    pub fn new(engine: E) -> Self {
        Self { engine, profiler: None }
    }

    pub fn with_profiler(engine: E, profiler: Arc<dyn Profiler>) -> Self {
        Self { engine, profiler: Some(profiler) }
    }

    pub async fn execute(&self, sql: &str) -> DocSqlResult<u64> {
        let started = Instant::now();
        let result = self.engine.execute(sql).await;
        self.observe(sql, started);
        result
    }

    pub async fn query(&self, sql: &str) -> DocSqlResult<Vec<Row>> {
        let started = Instant::now();
        let result = self.engine.query(sql).await;
        self.observe(sql, started);
        result
    }

    /// Quotes a scalar for a SQL literal position, engine rules applied.
    pub fn quote(&self, value: &str) -> String {
        self.engine.quote(value)
    }

    fn observe(&self, sql: &str, started: Instant) {
        if let Some(profiler) = &self.profiler {
            if profiler.enabled() {
                profiler.record(sql, started.elapsed());
            }
        }
    }
}
