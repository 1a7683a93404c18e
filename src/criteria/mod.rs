use serde_json::Value;

use crate::{database_error::DatabaseError, sql::order::Ordering};

pub mod join_descriptor;
pub mod predicate;
pub mod value;

use join_descriptor::JoinDescriptor;
use predicate::CriteriaPredicate;

/// An immutable description of a query: filters, ordering, pagination,
/// selection, aggregates, and associations. Compilation derives whatever
/// working state it needs (pagination windows in particular) instead of
/// rewriting the criteria value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Criteria {
    pub where_clause: Option<CriteriaPredicate>,
    pub sort: Vec<(String, Ordering)>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub select: Option<Vec<String>>,
    pub group_by: Vec<String>,
    pub sum: Vec<String>,
    pub average: Vec<String>,
    pub min: Vec<String>,
    pub max: Vec<String>,
    pub joins: Vec<JoinDescriptor>,
}

impl Criteria {
    pub fn has_aggregates(&self) -> bool {
        !self.sum.is_empty()
            || !self.average.is_empty()
            || !self.min.is_empty()
            || !self.max.is_empty()
    }

    pub fn has_pagination(&self) -> bool {
        self.skip.is_some() || self.limit.is_some()
    }

    /// Checks performed before any compilation.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if !self.group_by.is_empty() && !self.has_aggregates() {
            return Err(DatabaseError::Criteria(
                "groupBy requires at least one aggregate (sum, average, min, max)".into(),
            ));
        }
        Ok(())
    }

    /// Parse the duck-typed wire form. Scalar aggregate fields are forced to
    /// arrays, `sort` accepts both the `{column: 1|-1}` map and an array of
    /// pairs, and the `where` tree goes through the closed-vocabulary
    /// predicate parser.
    pub fn from_json(value: &Value) -> Result<Criteria, DatabaseError> {
        let object = match value {
            Value::Null => return Ok(Criteria::default()),
            Value::Object(object) => object,
            other => {
                return Err(DatabaseError::Criteria(format!(
                    "criteria must be an object, got {other}"
                )))
            }
        };

        let where_clause = match object.get("where") {
            None | Some(Value::Null) => None,
            Some(Value::Object(where_clause)) => Some(CriteriaPredicate::from_json(where_clause)?),
            Some(other) => {
                return Err(DatabaseError::Criteria(format!(
                    "`where` must be an object, got {other}"
                )))
            }
        };

        let sort = match object.get("sort") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(sort)) => sort
                .iter()
                .map(|(column, direction)| Ok((column.clone(), parse_direction(direction)?)))
                .collect::<Result<Vec<_>, DatabaseError>>()?,
            Some(Value::Array(pairs)) => pairs
                .iter()
                .map(|pair| {
                    let (column, direction) = pair
                        .as_array()
                        .filter(|p| p.len() == 2)
                        .map(|p| (&p[0], &p[1]))
                        .ok_or_else(|| {
                            DatabaseError::Criteria("`sort` pairs must be [column, 1|-1]".into())
                        })?;
                    let column = column.as_str().ok_or_else(|| {
                        DatabaseError::Criteria("`sort` column must be a string".into())
                    })?;
                    Ok((column.to_string(), parse_direction(direction)?))
                })
                .collect::<Result<Vec<_>, DatabaseError>>()?,
            Some(other) => {
                return Err(DatabaseError::Criteria(format!(
                    "`sort` must be an object or array, got {other}"
                )))
            }
        };

        let joins = match object.get("joins") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(joins)) => joins
                .iter()
                .map(JoinDescriptor::from_json)
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(DatabaseError::Criteria(format!(
                    "`joins` must be an array, got {other}"
                )))
            }
        };

        let criteria = Criteria {
            where_clause,
            sort,
            skip: integer_field(object.get("skip"), "skip")?,
            limit: integer_field(object.get("limit"), "limit")?,
            select: string_list(object.get("select"), "select")?,
            group_by: string_list(object.get("groupBy"), "groupBy")?.unwrap_or_default(),
            sum: string_list(object.get("sum"), "sum")?.unwrap_or_default(),
            average: string_list(object.get("average"), "average")?.unwrap_or_default(),
            min: string_list(object.get("min"), "min")?.unwrap_or_default(),
            max: string_list(object.get("max"), "max")?.unwrap_or_default(),
            joins,
        };

        Ok(criteria)
    }
}

fn parse_direction(direction: &Value) -> Result<Ordering, DatabaseError> {
    match direction.as_i64() {
        Some(d) if d >= 0 => Ok(Ordering::Asc),
        Some(_) => Ok(Ordering::Desc),
        None => Err(DatabaseError::Criteria(format!(
            "sort direction must be 1 or -1, got {direction}"
        ))),
    }
}

fn integer_field(value: Option<&Value>, name: &str) -> Result<Option<i64>, DatabaseError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            DatabaseError::Criteria(format!("`{name}` must be an integer, got {value}"))
        }),
    }
}

/// Accepts either a single string or an array of strings, normalizing to an
/// array; aggregate fields arrive in both shapes.
fn string_list(value: Option<&Value>, name: &str) -> Result<Option<Vec<String>>, DatabaseError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(single)) => Ok(Some(vec![single.clone()])),
        Some(Value::Array(values)) => Ok(Some(
            values
                .iter()
                .map(|value| {
                    value.as_str().map(str::to_string).ok_or_else(|| {
                        DatabaseError::Criteria(format!("`{name}` entries must be strings"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Some(other) => Err(DatabaseError::Criteria(format!(
            "`{name}` must be a string or an array of strings, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_aggregates_become_arrays() {
        let criteria = Criteria::from_json(&json!({
            "sum": "amount",
            "groupBy": "user_id"
        }))
        .unwrap();

        assert_eq!(criteria.sum, vec!["amount".to_string()]);
        assert_eq!(criteria.group_by, vec!["user_id".to_string()]);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn group_by_without_aggregate_is_rejected() {
        let criteria = Criteria::from_json(&json!({"groupBy": ["user_id"]})).unwrap();
        assert!(matches!(
            criteria.validate(),
            Err(DatabaseError::Criteria(_))
        ));
    }

    #[test]
    fn sort_map_and_pairs() {
        let criteria = Criteria::from_json(&json!({"sort": {"name": 1, "age": -1}})).unwrap();
        assert_eq!(
            criteria.sort,
            vec![
                ("name".to_string(), Ordering::Asc),
                ("age".to_string(), Ordering::Desc)
            ]
        );

        let criteria = Criteria::from_json(&json!({"sort": [["name", 1], ["age", -1]]})).unwrap();
        assert_eq!(
            criteria.sort,
            vec![
                ("name".to_string(), Ordering::Asc),
                ("age".to_string(), Ordering::Desc)
            ]
        );
    }

    #[test]
    fn nested_join_criteria() {
        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id", "amount"],
                "collection": true,
                "criteria": {"skip": 0, "limit": 2, "sort": {"id": 1}}
            }]
        }))
        .unwrap();

        let join = &criteria.joins[0];
        assert_eq!(join.alias, "orders");
        assert_eq!(join.select, Some(vec!["id".to_string(), "amount".to_string()]));
        assert!(join.collection);
        assert_eq!(join.criteria.limit, Some(2));
        assert_eq!(join.criteria.skip, Some(0));
    }

    #[test]
    fn junction_select_false() {
        let join = JoinDescriptor::from_json(&json!({
            "parent": "users",
            "parentKey": "id",
            "child": "users_orders",
            "childKey": "user_id",
            "alias": "orders",
            "select": false
        }))
        .unwrap();

        assert_eq!(join.select, None);
    }
}
