use serde_json::Value;

use crate::database_error::DatabaseError;

use super::Criteria;

/// Describes how a child collection relates to its parent for one query.
///
/// Two descriptors sharing an `alias` encode a many-to-many association: the
/// one with `select: None` names the junction table, the other the target
/// collection. A lone descriptor with `select: None` joins the child purely as
/// a filter, contributing no columns to the result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JoinDescriptor {
    pub parent: String,
    pub parent_key: String,
    pub child: String,
    pub child_key: String,
    pub alias: String,
    /// `None` encodes the wire form `select: false`
    pub select: Option<Vec<String>>,
    /// `true` nests children as an array, `false` as a single object
    pub collection: bool,
    pub criteria: Criteria,
}

impl JoinDescriptor {
    pub fn from_json(value: &Value) -> Result<JoinDescriptor, DatabaseError> {
        let object = value
            .as_object()
            .ok_or_else(|| DatabaseError::Criteria("join descriptor must be an object".into()))?;

        let field = |name: &str| -> Result<String, DatabaseError> {
            object
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    DatabaseError::Criteria(format!("join descriptor is missing `{name}`"))
                })
        };

        let select = match object.get("select") {
            None | Some(Value::Bool(false)) => None,
            Some(Value::Array(columns)) => Some(
                columns
                    .iter()
                    .map(|column| {
                        column.as_str().map(str::to_string).ok_or_else(|| {
                            DatabaseError::Criteria("join `select` entries must be strings".into())
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(other) => {
                return Err(DatabaseError::Criteria(format!(
                    "join `select` must be false or an array, got {other}"
                )))
            }
        };

        let criteria = match object.get("criteria") {
            Some(criteria) => Criteria::from_json(criteria)?,
            None => Criteria::default(),
        };

        Ok(JoinDescriptor {
            parent: field("parent")?,
            parent_key: field("parentKey")?,
            child: field("child")?,
            child_key: field("childKey")?,
            alias: field("alias")?,
            select,
            collection: object
                .get("collection")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            criteria,
        })
    }
}
