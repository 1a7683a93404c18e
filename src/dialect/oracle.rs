use sha2::{Digest, Sha256};

use crate::{
    database_error::DatabaseError,
    executor::Record,
    schema::{AttributeDefinition, AttributeType, Collection, IntrospectedColumn},
    sql::sql_builder::{LimitSyntax, Placeholder, SqlStyle},
};

use super::{default_type_ddl, row_str, Dialect, RankMethod};

/// Oracle caps identifiers at 30 characters; anything longer is squeezed to a
/// stable hash.
const MAX_IDENTIFIER_LEN: usize = 30;

#[derive(Debug, Clone, Copy, Default)]
pub struct OracleDialect;

fn squeeze_identifier(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    digest
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>()[..MAX_IDENTIFIER_LEN - 2]
        .to_string()
}

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn style(&self) -> SqlStyle {
        SqlStyle {
            placeholder: Placeholder::Colon,
            identifier_quote: '"',
            from_dual: true,
            supports_returning: false,
            limit_syntax: LimitSyntax::FetchFirst,
        }
    }

    fn rank_method(&self) -> RankMethod {
        RankMethod::Window
    }

    fn in_chunk_size(&self) -> Option<usize> {
        Some(1000)
    }

    fn normalize_table_name(&self, table: &str) -> String {
        if table.len() < MAX_IDENTIFIER_LEN {
            table.to_string()
        } else {
            squeeze_identifier(table)
        }
    }

    fn create_alias(&self, table_alias: &str, column: Option<&str>) -> String {
        let alias = match column {
            None => table_alias.to_string(),
            Some(column) => format!("{table_alias}_{column}"),
        };
        if alias.len() > MAX_IDENTIFIER_LEN {
            squeeze_identifier(&alias)
        } else {
            alias
        }
    }

    fn describe_queries(&self, table: &str) -> Vec<String> {
        let table = self.normalize_table_name(table);
        vec![
            format!(
                "SELECT COLUMN_NAME, DATA_TYPE, NULLABLE FROM USER_TAB_COLUMNS \
                 WHERE TABLE_NAME = '{table}'"
            ),
            format!(
                "SELECT INDEX_NAME, COLUMN_NAME FROM USER_IND_COLUMNS \
                 WHERE TABLE_NAME = '{table}'"
            ),
            format!(
                "SELECT cols.TABLE_NAME, cols.COLUMN_NAME, cols.POSITION, cons.STATUS, cons.OWNER \
                 FROM ALL_CONSTRAINTS cons, ALL_CONS_COLUMNS cols \
                 WHERE cols.TABLE_NAME = '{table}' AND cons.CONSTRAINT_TYPE = 'P' \
                 AND cons.CONSTRAINT_NAME = cols.CONSTRAINT_NAME AND cons.OWNER = cols.OWNER \
                 ORDER BY cols.TABLE_NAME, cols.POSITION"
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
        let index_rows = results.get(1).map(Vec::as_slice).unwrap_or_default();
        let pk_rows = results.get(2).map(Vec::as_slice).unwrap_or_default();

        let indexed_columns: Vec<&str> = index_rows
            .iter()
            .filter_map(|row| row_str(row, "COLUMN_NAME"))
            .collect();
        let pk_columns: Vec<&str> = pk_rows
            .iter()
            .filter_map(|row| row_str(row, "COLUMN_NAME"))
            .collect();

        let introspected = columns
            .iter()
            .map(|row| {
                let name = row_str(row, "COLUMN_NAME").unwrap_or_default().to_string();
                let db_type = row_str(row, "DATA_TYPE").unwrap_or_default().to_string();
                let primary_key = pk_columns.contains(&name.as_str());

                IntrospectedColumn {
                    auto_increment: primary_key && db_type == "NUMBER",
                    primary_key,
                    unique: false,
                    indexed: indexed_columns.contains(&name.as_str()),
                    nullable: row_str(row, "NULLABLE") != Some("N"),
                    default_value: None,
                    name,
                    db_type,
                }
            })
            .collect();

        Ok(Some(introspected))
    }

    fn create_table_sql(&self, collection: &Collection) -> Vec<String> {
        // No IF NOT EXISTS on this engine
        let table = self.normalize_table_name(&collection.table_name);
        let columns = collection
            .attributes
            .iter()
            .map(|attribute| self.column_ddl(attribute))
            .collect::<Vec<_>>()
            .join(", ");

        vec![format!(
            "CREATE TABLE {} ({})",
            self.quote_identifier(&table),
            columns
        )]
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!(
            "DROP TABLE {}",
            self.quote_identifier(&self.normalize_table_name(table))
        )
    }

    fn serial_pk_ddl(&self) -> &'static str {
        "NUMBER GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"
    }

    fn type_ddl(&self, attribute: &AttributeDefinition) -> String {
        match attribute.typ {
            AttributeType::String => format!("VARCHAR2({})", attribute.size.unwrap_or(255)),
            AttributeType::Text
            | AttributeType::MediumText
            | AttributeType::LongText
            | AttributeType::Json
            | AttributeType::Array => "CLOB".to_string(),
            AttributeType::Integer => "NUMBER(38)".to_string(),
            AttributeType::Float | AttributeType::Double => "BINARY_DOUBLE".to_string(),
            AttributeType::Decimal => "NUMBER".to_string(),
            AttributeType::Boolean => "NUMBER(1)".to_string(),
            AttributeType::DateTime | AttributeType::Time => "TIMESTAMP".to_string(),
            AttributeType::Binary => "BLOB".to_string(),
            _ => default_type_ddl(attribute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_aliases_are_squeezed() {
        let dialect = OracleDialect;
        let alias = dialect.create_alias(
            "a_very_long_association_alias",
            Some("a_very_long_column_name"),
        );
        assert_eq!(alias.len(), MAX_IDENTIFIER_LEN - 2);

        // stable across calls
        let again = dialect.create_alias(
            "a_very_long_association_alias",
            Some("a_very_long_column_name"),
        );
        assert_eq!(alias, again);
    }

    #[test]
    fn short_aliases_pass_through() {
        let dialect = OracleDialect;
        assert_eq!(dialect.create_alias("orders", Some("id")), "orders_id");
    }
}
