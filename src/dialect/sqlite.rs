use crate::{
    database_error::DatabaseError,
    executor::Record,
    schema::{AttributeDefinition, AttributeType, IntrospectedColumn},
    sql::sql_builder::{LimitSyntax, Placeholder, SqlStyle},
};

use super::{default_type_ddl, row_str, row_string, Dialect, RankMethod};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn style(&self) -> SqlStyle {
        SqlStyle {
            placeholder: Placeholder::Question,
            identifier_quote: '"',
            from_dual: false,
            supports_returning: false,
            limit_syntax: LimitSyntax::LimitOffset,
        }
    }

    fn rank_method(&self) -> RankMethod {
        RankMethod::CorrelatedCount
    }

    fn describe_queries(&self, table: &str) -> Vec<String> {
        vec![
            format!("PRAGMA table_info({table})"),
            format!("PRAGMA index_list({table})"),
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

        let introspected = columns
            .iter()
            .map(|row| {
                let primary_key = row
                    .get("pk")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(0)
                    > 0;
                let db_type = row_str(row, "type").unwrap_or_default().to_string();

                IntrospectedColumn {
                    name: row_str(row, "name").unwrap_or_default().to_string(),
                    // INTEGER PRIMARY KEY is the rowid, which auto-assigns
                    auto_increment: primary_key && db_type.eq_ignore_ascii_case("integer"),
                    primary_key,
                    unique: false,
                    indexed: primary_key,
                    nullable: row
                        .get("notnull")
                        .and_then(serde_json::Value::as_i64)
                        .unwrap_or(0)
                        == 0,
                    default_value: row_string(row, "dflt_value"),
                    db_type,
                }
            })
            .collect();

        Ok(Some(introspected))
    }

    fn serial_pk_ddl(&self) -> &'static str {
        "INTEGER PRIMARY KEY AUTOINCREMENT"
    }

    fn type_ddl(&self, attribute: &AttributeDefinition) -> String {
        match attribute.typ {
            AttributeType::Float | AttributeType::Double | AttributeType::Decimal => {
                "REAL".to_string()
            }
            AttributeType::Boolean => "INTEGER".to_string(),
            _ => default_type_ddl(attribute),
        }
    }
}
