//! The core idea in this library is that of [Criteria], which describes a
//! query (filters, sort, pagination, aggregates, associations) at a higher
//! level, without saying anything about how it executes. A [Dialect] turns a
//! criteria into a [SelectPlan]: a concrete SQL expression tree plus the
//! metadata needed to reassemble the flat rows it produces. [SqlAdapter]
//! orchestrates the pieces per operation, executing through a shared
//! connection pool and rebuilding nested record trees with [RowCursor].
//!
//! The separation of description vs execution keeps the compilation layer
//! synchronous and fully testable: every query shape in this crate can be
//! asserted as SQL text and bound parameters without a database. Execution is
//! currently wired for Postgres; other dialects participate in compilation
//! and can be extended with their own backends.

#[macro_use]
mod sql;

mod adapter;
mod connection;
mod criteria;
mod cursor;
mod dialect;
mod executor;
mod schema;
mod transaction_holder;
mod transform;

pub mod database_error;

pub use adapter::{ConnectionConfig, SqlAdapter};
pub use connection::Connection;
pub use criteria::{
    join_descriptor::JoinDescriptor,
    predicate::{CompareOp, CriteriaPredicate, StringMatchKind},
    value::CriteriaValue,
    Criteria,
};
pub use cursor::RowCursor;
pub use dialect::{
    mysql::MysqlDialect, oracle::OracleDialect, postgres::PostgresDialect,
    sqlite::SqliteDialect, Dialect, DialectKind, LimitSyntax, Placeholder, RankMethod, SqlStyle,
};
pub use executor::{DatabaseExecutor, Record};
pub use schema::{AttributeDefinition, AttributeType, Collection, IntrospectedColumn};
pub use sql::{
    column::Column,
    connect::{DatabaseClient, DatabasePool, TransactionWrapper},
    group_by::GroupBy,
    join::{Join, JoinKind},
    limit::Limit,
    offset::Offset,
    order::{OrderBy, OrderByElement, Ordering},
    predicate::ConcretePredicate,
    select::Select,
    table::Table,
    SQLParam, SQLParamContainer,
};
pub use transaction_holder::TransactionHolder;
pub use transform::{
    pagination::Pagination,
    select_planner::{AssociationPlan, AttributeSelection, SelectPlan, SelectPlanner},
};
