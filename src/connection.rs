use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    database_error::DatabaseError, dialect::Dialect, executor::DatabaseExecutor,
    schema::Collection,
};

/// One registered database target: its dialect strategy, the collections it
/// serves, and (when the dialect has a wired backend) the executor over the
/// shared pool. Read-only after registration, so safely shared across
/// concurrent calls.
pub struct Connection {
    pub identity: String,
    pub dialect: Arc<dyn Dialect>,
    pub collections: HashMap<String, Collection>,
    executor: Option<DatabaseExecutor>,
}

impl Connection {
    pub(crate) fn new(
        identity: String,
        dialect: Arc<dyn Dialect>,
        collections: HashMap<String, Collection>,
        executor: Option<DatabaseExecutor>,
    ) -> Self {
        Self {
            identity,
            dialect,
            collections,
            executor,
        }
    }

    pub fn collection(&self, table: &str) -> Result<&Collection, DatabaseError> {
        self.collections
            .get(table)
            .ok_or_else(|| DatabaseError::UnknownCollection(table.to_string()))
    }

    pub(crate) fn executor(&self) -> Result<&DatabaseExecutor, DatabaseError> {
        self.executor.as_ref().ok_or_else(|| {
            DatabaseError::Config(format!(
                "connection `{}` has no execution backend for dialect `{}`",
                self.identity,
                self.dialect.name()
            ))
        })
    }
}
