pub(crate) mod database_client;
pub(crate) mod database_pool;

pub use database_client::{DatabaseClient, TransactionWrapper};
pub use database_pool::DatabasePool;
