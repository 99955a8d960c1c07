//! Database Module
//!
//! The table registry: the single source of truth for which tables exist.
//!
//! ## Responsibilities
//! - Create tables, enforcing unique names and the table-count ceiling
//! - Look tables up by name
//! - Finish deletions when a table's deletion timer fires
//! - Route typed requests to the table operations
//!
//! A `Database` is an ordinary value: construct as many as needed, each with
//! its own tables and timer thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{DbError, Result};
use crate::request::{handler, Request, Response};
use crate::table::{Table, TableDescription, TableSpec, Throughput};
use crate::timer::TimerService;

type TableMap = BTreeMap<String, Arc<Table>>;

/// The table registry
///
/// ## Concurrency
/// - `tables`: one RwLock; create and delete-completion take it exclusively,
///   so two creates of the same name cannot both succeed
/// - Table operations run after the registry lock is released; each table
///   guards its own state
/// - Deletion timers hold a `Weak` registry handle plus the table's instance
///   id, so a late timer never removes a re-created table of the same name
pub struct Database {
    config: Arc<Config>,
    tables: Arc<RwLock<TableMap>>,
    timers: TimerService,
    next_table_id: AtomicU64,
}

impl Database {
    /// Create an empty registry with its own timer thread
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            tables: Arc::new(RwLock::new(BTreeMap::new())),
            timers: TimerService::start()?,
            next_table_id: AtomicU64::new(1),
        })
    }

    /// Registry with the default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute a typed request
    pub fn execute(&self, request: Request) -> Result<Response> {
        tracing::trace!(operation = request.operation(), "execute");

        match request {
            Request::CreateTable(input) => handler::create_table(self, input).map(Response::CreateTable),
            Request::DescribeTable(input) => handler::describe_table(self, input).map(Response::DescribeTable),
            Request::ListTables(input) => handler::list_tables(self, input).map(Response::ListTables),
            Request::UpdateTable(input) => handler::update_table(self, input).map(Response::UpdateTable),
            Request::DeleteTable(input) => handler::delete_table(self, input).map(Response::DeleteTable),
            Request::PutItem(input) => handler::put_item(self, input).map(Response::PutItem),
            Request::GetItem(input) => handler::get_item(self, input).map(Response::GetItem),
            Request::UpdateItem(input) => handler::update_item(self, input).map(Response::UpdateItem),
            Request::DeleteItem(input) => handler::delete_item(self, input).map(Response::DeleteItem),
            Request::Query(input) => handler::query(self, input).map(Response::Query),
            Request::Scan(input) => handler::scan(self, input).map(Response::Scan),
            Request::BatchGetItem(input) => handler::batch_get_item(self, input).map(Response::BatchGetItem),
            Request::BatchWriteItem(input) => {
                handler::batch_write_item(self, input).map(Response::BatchWriteItem)
            }
        }
    }

    // =========================================================================
    // Table lifecycle
    // =========================================================================

    /// Register a new table in CREATING
    pub fn create_table(&self, spec: TableSpec) -> Result<TableDescription> {
        spec.validate(&self.config)?;

        let mut tables = self.tables.write();

        if tables.contains_key(&spec.name) {
            return Err(DbError::ResourceInUse(format!(
                "Table {} already exists",
                spec.name
            )));
        }
        if tables.len() >= self.config.max_tables {
            return Err(DbError::LimitExceeded(format!(
                "Subscriber limit exceeded: Only {} tables can be created",
                self.config.max_tables
            )));
        }

        let id = self.next_table_id.fetch_add(1, Ordering::Relaxed);
        let name = spec.name.clone();
        let table = Table::create(id, spec, Arc::clone(&self.config), self.timers.clone());
        let description = table.describe(false);
        tables.insert(name, table);

        Ok(description)
    }

    /// Look up a table by name
    pub fn get_table(&self, name: &str) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::ResourceNotFound(format!("Table {} not found", name)))
    }

    /// Verbose description of one table
    pub fn describe_table(&self, name: &str) -> Result<TableDescription> {
        Ok(self.get_table(name)?.describe(true))
    }

    /// All table names in ascending order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }

    /// Change a table's provisioned throughput
    pub fn update_table(&self, name: &str, throughput: Throughput) -> Result<TableDescription> {
        self.get_table(name)?.update_throughput(throughput)
    }

    /// Start deleting a table; it leaves the registry after the deletion delay
    pub fn delete_table(&self, name: &str) -> Result<TableDescription> {
        let table = self.get_table(name)?;
        let registry: Weak<RwLock<TableMap>> = Arc::downgrade(&self.tables);
        let id = table.id();

        table.schedule_delete(move |name| {
            let Some(tables) = registry.upgrade() else {
                return;
            };
            let mut tables = tables.write();
            if tables.get(&name).is_some_and(|t| t.id() == id) {
                tables.remove(&name);
                tracing::info!(table = %name, "Table removed");
            }
        })
    }

    /// Drop every table immediately, bypassing timers (test isolation)
    ///
    /// Pending timers for the dropped tables become no-ops.
    pub fn reset(&self) {
        let mut tables = self.tables.write();
        tracing::debug!(count = tables.len(), "Resetting registry");
        tables.clear();
    }
}
