//! Engine - cached, whitelist-gated execution of query text.

use crate::config::EngineConfig;
use siftql_core::schema::Catalog;
use siftql_core::{Error, Result, RowSource, Whitelist};
use siftql_functions::FunctionRegistry;
use siftql_query::{cache_key, parse, CacheStats, Executor, QueryCache, QueryOutput, Statement};
use std::sync::Arc;
use tracing::{debug, info};

/// Parses, checks and runs query batches against one catalog, whitelist
/// and row source, memoizing batch results.
///
/// Every collaborator is injected through [`Engine::builder`]; an engine
/// shares nothing with other engines.
pub struct Engine {
    catalog: Arc<Catalog>,
    whitelist: Arc<Whitelist>,
    source: Arc<dyn RowSource>,
    registry: Arc<FunctionRegistry>,
    config: EngineConfig,
    cache: Option<QueryCache<QueryOutput>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parses query text against the catalog.
    pub fn parse(&self, text: &str) -> Result<Vec<Statement>> {
        parse(text, &self.catalog)
    }

    /// Parses and executes `text`. `allowed_tables`, when given, further
    /// restricts the whitelist for this call and is part of the cache key.
    pub async fn execute(&self, text: &str, allowed_tables: Option<&[String]>) -> Result<QueryOutput> {
        let statements = self.parse(text)?;
        self.execute_statements(statements, allowed_tables).await
    }

    /// Executes already parsed statements through the cache.
    pub async fn execute_statements(
        &self,
        statements: Vec<Statement>,
        allowed_tables: Option<&[String]>,
    ) -> Result<QueryOutput> {
        let Some(cache) = &self.cache else {
            return self.executor().execute_query(&statements, allowed_tables).await;
        };

        let key = cache_key(&statements, allowed_tables)?;
        debug!(statements = statements.len(), "executing through cache");

        let catalog = Arc::clone(&self.catalog);
        let whitelist = Arc::clone(&self.whitelist);
        let source = Arc::clone(&self.source);
        let registry = Arc::clone(&self.registry);
        let options = self.config.executor_options();
        let allowed_tables = allowed_tables.map(<[String]>::to_vec);

        cache
            .get_or_compute(&key, move || async move {
                Executor::new(&catalog, &whitelist, source.as_ref(), &registry)
                    .with_options(options)
                    .execute_query(&statements, allowed_tables.as_deref())
                    .await
            })
            .await
    }

    /// Cache key `text` would be stored under.
    pub fn cache_key(&self, text: &str, allowed_tables: Option<&[String]>) -> Result<String> {
        cache_key(&self.parse(text)?, allowed_tables)
    }

    /// Drops every cached result.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Drops one cached result, or every result whose key contains the
    /// rest of `key` when it starts with `~`.
    pub fn clear_cache_key(&self, key: &str) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.clear_key(key))
    }

    /// Zeroed when the cache is disabled.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .as_ref()
            .map(QueryCache::stats)
            .unwrap_or_default()
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(
            &self.catalog,
            &self.whitelist,
            self.source.as_ref(),
            &self.registry,
        )
        .with_options(self.config.executor_options())
    }
}

/// Builder for [`Engine`]. Catalog, whitelist and source are required.
#[derive(Default)]
pub struct EngineBuilder {
    catalog: Option<Catalog>,
    whitelist: Option<Whitelist>,
    source: Option<Arc<dyn RowSource>>,
    registry: Option<FunctionRegistry>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = Some(whitelist);
        self
    }

    pub fn source(mut self, source: Arc<dyn RowSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Defaults to [`FunctionRegistry::with_builtins`].
    pub fn registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Engine> {
        let catalog = self
            .catalog
            .ok_or_else(|| Error::config("engine requires a catalog"))?;
        let whitelist = self
            .whitelist
            .ok_or_else(|| Error::config("engine requires a whitelist"))?;
        let source = self
            .source
            .ok_or_else(|| Error::config("engine requires a row source"))?;
        self.config.validate()?;

        let registry = self.registry.unwrap_or_else(FunctionRegistry::with_builtins);
        let cache = self
            .config
            .cache_enabled
            .then(|| QueryCache::new(self.config.cache_ttl()));
        info!(
            tables = catalog.table_names().len(),
            functions = registry.keys().len(),
            cache = self.config.cache_enabled,
            "engine ready"
        );

        Ok(Engine {
            catalog: Arc::new(catalog),
            whitelist: Arc::new(whitelist),
            source,
            registry: Arc::new(registry),
            config: self.config,
            cache,
        })
    }
}
