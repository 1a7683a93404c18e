use crate::{
    database_error::DatabaseError,
    executor::Record,
    schema::{AttributeDefinition, AttributeType, IntrospectedColumn},
    sql::sql_builder::{LimitSyntax, Placeholder, SqlStyle},
};

use super::{default_type_ddl, row_str, row_string, Dialect, RankMethod};

#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn style(&self) -> SqlStyle {
        SqlStyle {
            placeholder: Placeholder::Question,
            identifier_quote: '`',
            from_dual: false,
            supports_returning: false,
            limit_syntax: LimitSyntax::LimitOffset,
        }
    }

    fn rank_method(&self) -> RankMethod {
        RankMethod::Window
    }

    fn sql_escape_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn describe_queries(&self, table: &str) -> Vec<String> {
        vec![
            format!("DESCRIBE `{table}`"),
            format!("SHOW INDEX FROM `{table}`"),
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
        let index_rows = results.get(1).map(Vec::as_slice).unwrap_or_default();

        let indexed_columns: Vec<&str> = index_rows
            .iter()
            .filter_map(|row| row_str(row, "Column_name"))
            .collect();

        let introspected = columns
            .iter()
            .map(|row| {
                let name = row_str(row, "Field").unwrap_or_default().to_string();
                let db_type = row_str(row, "Type").unwrap_or_default().to_string();
                let key = row_str(row, "Key").unwrap_or_default();
                let extra = row_str(row, "Extra").unwrap_or_default();
                let primary_key = key == "PRI";

                IntrospectedColumn {
                    auto_increment: extra.contains("auto_increment")
                        || (primary_key && db_type == "int(11)"),
                    primary_key,
                    unique: key == "UNI",
                    indexed: indexed_columns.contains(&name.as_str()),
                    nullable: row_str(row, "Null") == Some("YES"),
                    default_value: row_string(row, "Default"),
                    name,
                    db_type,
                }
            })
            .collect();

        Ok(Some(introspected))
    }

    fn serial_pk_ddl(&self) -> &'static str {
        "INT AUTO_INCREMENT PRIMARY KEY"
    }

    fn type_ddl(&self, attribute: &AttributeDefinition) -> String {
        match attribute.typ {
            AttributeType::MediumText => "MEDIUMTEXT".to_string(),
            AttributeType::LongText | AttributeType::Json | AttributeType::Array => {
                "LONGTEXT".to_string()
            }
            AttributeType::DateTime => "DATETIME".to_string(),
            AttributeType::Float | AttributeType::Double => "DOUBLE".to_string(),
            AttributeType::Binary => "BLOB".to_string(),
            _ => default_type_ddl(attribute),
        }
    }
}
