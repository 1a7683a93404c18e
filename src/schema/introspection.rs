use serde_json::{json, Map, Value};

/// A column as reported by an engine's catalog, already lifted out of the
/// engine-specific row shape by the dialect.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntrospectedColumn {
    pub name: String,
    pub db_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub indexed: bool,
}

/// Marshal introspected columns into the plain attribute map handed back to
/// the caller: `{name: {type, defaultsTo, autoIncrement, primaryKey?, ...}}`.
pub fn normalize_schema(columns: &[IntrospectedColumn]) -> Value {
    let mut schema = Map::new();
    for column in columns {
        let mut attribute = Map::new();
        attribute.insert("type".to_string(), json!(strip_size(&column.db_type)));
        attribute.insert("defaultsTo".to_string(), json!(column.default_value));
        attribute.insert("autoIncrement".to_string(), json!(column.auto_increment));
        if column.primary_key {
            attribute.insert("primaryKey".to_string(), json!(true));
        }
        if column.unique {
            attribute.insert("unique".to_string(), json!(true));
        }
        if column.indexed {
            attribute.insert("indexed".to_string(), json!(true));
        }
        schema.insert(column.name.clone(), Value::Object(attribute));
    }
    Value::Object(schema)
}

/// Remove a trailing `(n)` column-size indicator from a reported type.
fn strip_size(db_type: &str) -> String {
    if let Some(open) = db_type.rfind('(') {
        if db_type.ends_with(')') && db_type[open + 1..db_type.len() - 1].chars().all(|c| c.is_ascii_digit()) {
            return db_type[..open].to_string();
        }
    }
    db_type.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_suffix_is_stripped() {
        assert_eq!(strip_size("varchar(255)"), "varchar");
        assert_eq!(strip_size("int(11)"), "int");
        assert_eq!(strip_size("text"), "text");
        assert_eq!(strip_size("numeric(10,2)"), "numeric(10,2)");
    }

    #[test]
    fn normalized_shape() {
        let columns = vec![IntrospectedColumn {
            name: "id".to_string(),
            db_type: "int(11)".to_string(),
            primary_key: true,
            auto_increment: true,
            ..Default::default()
        }];

        let schema = normalize_schema(&columns);
        assert_eq!(schema["id"]["type"], "int");
        assert_eq!(schema["id"]["primaryKey"], true);
        assert_eq!(schema["id"]["autoIncrement"], true);
    }
}
