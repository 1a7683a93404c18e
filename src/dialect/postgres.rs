use crate::{
    database_error::DatabaseError,
    executor::Record,
    schema::{AttributeDefinition, AttributeType, IntrospectedColumn},
    sql::sql_builder::{LimitSyntax, Placeholder, SqlStyle},
};

use super::{default_type_ddl, row_str, row_string, Dialect, RankMethod};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn style(&self) -> SqlStyle {
        SqlStyle {
            placeholder: Placeholder::Dollar,
            identifier_quote: '"',
            from_dual: false,
            supports_returning: true,
            limit_syntax: LimitSyntax::LimitOffset,
        }
    }

    fn rank_method(&self) -> RankMethod {
        RankMethod::Window
    }

    fn describe_queries(&self, table: &str) -> Vec<String> {
        vec![
            format!(
                "SELECT column_name, data_type, is_nullable, column_default \
                 FROM information_schema.columns WHERE table_name = '{table}'"
            ),
            format!(
                "SELECT a.attname FROM pg_index i \
                 JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
                 WHERE i.indrelid = '{table}'::regclass AND i.indisprimary"
            ),
        ]
    }

    fn interpret_describe(
        &self,
        results: &[Vec<Record>],
    ) -> Result<Option<Vec<IntrospectedColumn>>, DatabaseError> {
        let columns = match results.first() {
            Some(rows) if !rows.is_empty() => rows,
            _ => return Ok(None),
        };
        let pk_rows = results.get(1).map(Vec::as_slice).unwrap_or_default();

        let pk_names: Vec<&str> = pk_rows
            .iter()
            .filter_map(|row| row_str(row, "attname"))
            .collect();

        let introspected = columns
            .iter()
            .map(|row| {
                let name = row_str(row, "column_name").unwrap_or_default().to_string();
                let default_value = row_string(row, "column_default");
                let primary_key = pk_names.contains(&name.as_str());
                // serial columns surface as a nextval() default
                let auto_increment = default_value
                    .as_deref()
                    .map(|default| default.starts_with("nextval("))
                    .unwrap_or(false);

                IntrospectedColumn {
                    name,
                    db_type: row_str(row, "data_type").unwrap_or_default().to_string(),
                    nullable: row_str(row, "is_nullable") == Some("YES"),
                    default_value,
                    primary_key,
                    auto_increment,
                    unique: false,
                    indexed: primary_key,
                }
            })
            .collect();

        Ok(Some(introspected))
    }

    fn serial_pk_ddl(&self) -> &'static str {
        "SERIAL PRIMARY KEY"
    }

    fn type_ddl(&self, attribute: &AttributeDefinition) -> String {
        match attribute.typ {
            AttributeType::Binary => "BYTEA".to_string(),
            _ => default_type_ddl(attribute),
        }
    }
}
