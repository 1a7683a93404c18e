use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    criteria,
    database_error::DatabaseError,
    executor::Record,
    schema::{AttributeDefinition, AttributeType, Collection, IntrospectedColumn},
};

pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;

pub use crate::sql::sql_builder::{LimitSyntax, Placeholder, SqlStyle};

/// How an engine computes the per-partition rank that bounds paginated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMethod {
    /// `DENSE_RANK() OVER (...)`
    Window,
    /// A correlated `count(1) + 1` subquery over the same total order, for
    /// engines without window functions
    CorrelatedCount,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Postgres,
    Mysql,
    Sqlite,
    Oracle,
}

impl DialectKind {
    pub fn dialect(&self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::Postgres => Arc::new(postgres::PostgresDialect),
            DialectKind::Mysql => Arc::new(mysql::MysqlDialect),
            DialectKind::Sqlite => Arc::new(sqlite::SqliteDialect),
            DialectKind::Oracle => Arc::new(oracle::OracleDialect),
        }
    }
}

/// Everything that differs between target engines: lexical style, the rank
/// primitive available for pagination, identifier length limits, catalog
/// introspection, and DDL type mapping. Shared behavior lives in the default
/// methods; concrete dialects override only the genuinely engine-specific
/// pieces.
pub trait Dialect: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn style(&self) -> SqlStyle;

    fn rank_method(&self) -> RankMethod;

    /// Engines that cap `IN`-list sizes; lists at or above the cap are
    /// chunked into OR-ed batches of this size.
    fn in_chunk_size(&self) -> Option<usize> {
        None
    }

    fn normalize_table_name(&self, table: &str) -> String {
        table.to_string()
    }

    /// Synthesize the alias for a joined table or a selected column.
    fn create_alias(&self, table_alias: &str, column: Option<&str>) -> String {
        match column {
            None => table_alias.to_string(),
            Some(column) => format!("{table_alias}_{column}"),
        }
    }

    fn sql_escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    fn format_timestamp(&self, ts: &DateTime<Utc>) -> String {
        criteria::value::format_timestamp(ts)
    }

    fn quote_identifier(&self, identifier: &str) -> String {
        let quote = self.style().identifier_quote;
        format!("{quote}{identifier}{quote}")
    }

    /// The catalog queries `describe` runs for a table, in order.
    fn describe_queries(&self, table: &str) -> Vec<String>;

    /// Interpret the result rows of [`Dialect::describe_queries`]; `None`
    /// signals that the table does not exist.
    fn interpret_describe(
        &self,
        results: &[Vec<Record>],
    ) -> Result<Option<Vec<IntrospectedColumn>>, DatabaseError>;

    /// `CREATE TABLE` plus any index statements for a collection.
    fn create_table_sql(&self, collection: &Collection) -> Vec<String> {
        let table = self.normalize_table_name(&collection.table_name);
        let columns = collection
            .attributes
            .iter()
            .map(|attribute| self.column_ddl(attribute))
            .collect::<Vec<_>>()
            .join(", ");

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.quote_identifier(&table),
            columns
        )];

        for attribute in &collection.attributes {
            if attribute.index && !attribute.primary_key && !attribute.unique {
                statements.push(format!(
                    "CREATE INDEX {} ON {} ({})",
                    self.quote_identifier(&format!("idx_{table}_{}", attribute.name)),
                    self.quote_identifier(&table),
                    self.quote_identifier(&attribute.name)
                ));
            }
        }

        statements
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!(
            "DROP TABLE IF EXISTS {}",
            self.quote_identifier(&self.normalize_table_name(table))
        )
    }

    fn column_ddl(&self, attribute: &AttributeDefinition) -> String {
        let name = self.quote_identifier(&attribute.name);

        if attribute.auto_increment && attribute.primary_key {
            return format!("{name} {}", self.serial_pk_ddl());
        }

        let mut ddl = format!("{name} {}", self.type_ddl(attribute));
        if attribute.primary_key {
            ddl.push_str(" PRIMARY KEY");
        } else if attribute.unique {
            ddl.push_str(" UNIQUE");
        }
        if attribute.required {
            ddl.push_str(" NOT NULL");
        }
        ddl
    }

    fn serial_pk_ddl(&self) -> &'static str {
        "INTEGER PRIMARY KEY"
    }

    fn type_ddl(&self, attribute: &AttributeDefinition) -> String {
        default_type_ddl(attribute)
    }
}

/// The shared attribute-type mapping; dialects call back into this for the
/// types they do not specialize.
pub(crate) fn default_type_ddl(attribute: &AttributeDefinition) -> String {
    match attribute.typ {
        AttributeType::String => format!("VARCHAR({})", attribute.size.unwrap_or(255)),
        AttributeType::Text
        | AttributeType::MediumText
        | AttributeType::LongText
        | AttributeType::Json
        | AttributeType::Array => "TEXT".to_string(),
        AttributeType::Integer => "INTEGER".to_string(),
        AttributeType::Float | AttributeType::Double => "DOUBLE PRECISION".to_string(),
        AttributeType::Decimal => "DECIMAL".to_string(),
        AttributeType::Boolean => "BOOLEAN".to_string(),
        AttributeType::Date => "DATE".to_string(),
        AttributeType::Time => "TIME".to_string(),
        AttributeType::DateTime => "TIMESTAMP".to_string(),
        AttributeType::Binary => "BLOB".to_string(),
    }
}

pub(crate) fn row_str<'a>(row: &'a Record, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

pub(crate) fn row_string(row: &Record, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeDefinition;

    #[test]
    fn default_alias_shape() {
        let dialect = postgres::PostgresDialect;
        assert_eq!(dialect.create_alias("orders", Some("id")), "orders_id");
        assert_eq!(dialect.create_alias("_PARENT_", Some("users")), "_PARENT__users");
        assert_eq!(dialect.create_alias("orders", None), "orders");
    }

    #[test]
    fn create_table_with_index() {
        let dialect = postgres::PostgresDialect;
        let collection = Collection::new(
            "users",
            vec![
                AttributeDefinition::new("id", AttributeType::Integer)
                    .primary_key()
                    .auto_increment(),
                AttributeDefinition::new("name", AttributeType::String),
                {
                    let mut age = AttributeDefinition::new("age", AttributeType::Integer);
                    age.index = true;
                    age
                },
            ],
        );

        let statements = dialect.create_table_sql(&collection);
        assert_eq!(
            statements[0],
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" SERIAL PRIMARY KEY, "name" VARCHAR(255), "age" INTEGER)"#
        );
        assert_eq!(
            statements[1],
            r#"CREATE INDEX "idx_users_age" ON "users" ("age")"#
        );
    }

    #[test]
    fn escape_string_doubles_quotes() {
        let dialect = postgres::PostgresDialect;
        assert_eq!(dialect.sql_escape_string("it's"), "'it''s'");
    }
}
