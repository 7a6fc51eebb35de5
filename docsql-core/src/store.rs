//! Store facade: the entry point callers hold.
//!
//! A store wraps one engine behind one connector and hands out shared
//! collection handles. Handles are cached by name, so repeated lookups do
//! not re-run table creation; the first open of a name decides its options.

use std::{collections::HashMap, fmt, sync::Arc};

use mea::rwlock::RwLock;

use crate::collection::{Collection, CollectionOptions};
use crate::connector::Connector;
use crate::engine::Engine;
use crate::error::DocSqlResult;
use crate::profile::Profiler;

/// A document store over a relational engine.
pub struct DocStore<E> {
    connector: Arc<Connector<E>>,
    collections: RwLock<HashMap<String, Arc<Collection<E>>>>,
}

impl<E: Engine> DocStore<E> {
    pub fn new(engine: E) -> Self {
        Self::from_connector(Connector::new(engine))
    }

    /// A store whose statements are reported to the given profiler.
    pub fn with_profiler(engine: E, profiler: Arc<dyn Profiler>) -> Self {
        Self::from_connector(Connector::with_profiler(engine, profiler))
    }

    fn from_connector(connector: Connector<E>) -> Self {
        Self {
            connector: Arc::new(connector),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// A handle to the named collection with default options, creating its
    /// tables on first use.
    pub async fn collection(&self, name: &str) -> DocSqlResult<Arc<Collection<E>>> {
        self.collection_with_options(name, CollectionOptions::default())
            .await
    }

    /// A handle to the named collection. When the name is already cached,
    /// the cached handle wins and `options` is ignored.
    pub async fn collection_with_options(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> DocSqlResult<Arc<Collection<E>>> {
        if let Some(collection) = self.collections.read().await.get(name) {
            return Ok(collection.clone());
        }

        let opened =
            Arc::new(Collection::open(name, self.connector.clone(), options).await?);
        let mut collections = self.collections.write().await;
        Ok(collections
            .entry(name.to_string())
            .or_insert(opened)
            .clone())
    }
}

impl<E> fmt::Debug for DocStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocStore").finish_non_exhaustive()
    }
}
