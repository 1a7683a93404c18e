use serde_json::{Map, Value};

use crate::database_error::DatabaseError;

use super::value::CriteriaValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMatchKind {
    /// The pattern is used as given
    Like,
    /// `%pattern%`
    Contains,
    /// `pattern%`
    StartsWith,
    /// `%pattern`
    EndsWith,
}

/// A `where` tree. Unlike the loosely-typed criteria objects ORMs pass around,
/// this is a closed vocabulary: every recognized operator has a variant, and
/// parsing rejects anything else instead of letting unknown tokens leak into
/// SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaPredicate {
    And(Vec<CriteriaPredicate>),
    Or(Vec<CriteriaPredicate>),
    Compare {
        column: String,
        op: CompareOp,
        value: CriteriaValue,
    },
    In {
        column: String,
        values: Vec<CriteriaValue>,
    },
    NotIn {
        column: String,
        values: Vec<CriteriaValue>,
    },
    StringMatch {
        column: String,
        kind: StringMatchKind,
        pattern: String,
    },
}

impl CriteriaPredicate {
    pub fn eq(column: impl Into<String>, value: impl Into<CriteriaValue>) -> Self {
        CriteriaPredicate::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn compare(
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<CriteriaValue>,
    ) -> Self {
        CriteriaPredicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn in_values(
        column: impl Into<String>,
        values: impl IntoIterator<Item = CriteriaValue>,
    ) -> Self {
        CriteriaPredicate::In {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Parse the legacy duck-typed `where` object. Top-level keys are AND-ed;
    /// `or`/`and` take arrays of sibling objects; `like` takes a map of
    /// column to pattern; everything else is a column whose value is a plain
    /// comparison, a membership array, or a nested operator object.
    pub fn from_json(where_clause: &Map<String, Value>) -> Result<CriteriaPredicate, DatabaseError> {
        let mut members = Vec::new();

        for (key, value) in where_clause {
            match key.to_lowercase().as_str() {
                "or" => members.push(Self::parse_group(key, value, false)?),
                "and" => members.push(Self::parse_group(key, value, true)?),
                "like" => {
                    let patterns = value.as_object().ok_or_else(|| {
                        DatabaseError::Criteria("`like` expects an object of column patterns".into())
                    })?;
                    for (column, pattern) in patterns {
                        members.push(CriteriaPredicate::StringMatch {
                            column: column.clone(),
                            kind: StringMatchKind::Like,
                            pattern: string_pattern(column, pattern)?,
                        });
                    }
                }
                _ => members.push(Self::parse_column(key, value)?),
            }
        }

        Ok(Self::group(members))
    }

    fn group(mut members: Vec<CriteriaPredicate>) -> CriteriaPredicate {
        if members.len() == 1 {
            members.remove(0)
        } else {
            CriteriaPredicate::And(members)
        }
    }

    fn parse_group(key: &str, value: &Value, conjoin: bool) -> Result<CriteriaPredicate, DatabaseError> {
        let elements = value.as_array().ok_or_else(|| {
            DatabaseError::Criteria(format!("`{key}` expects an array of predicate objects"))
        })?;

        let mut members = Vec::new();
        for element in elements {
            let object = element.as_object().ok_or_else(|| {
                DatabaseError::Criteria(format!("`{key}` elements must be objects"))
            })?;
            members.push(Self::from_json(object)?);
        }

        Ok(if conjoin {
            CriteriaPredicate::And(members)
        } else {
            CriteriaPredicate::Or(members)
        })
    }

    fn parse_column(column: &str, value: &Value) -> Result<CriteriaPredicate, DatabaseError> {
        match value {
            Value::Array(values) => Ok(CriteriaPredicate::In {
                column: column.to_string(),
                values: values.iter().map(CriteriaValue::from_json).collect(),
            }),
            Value::Object(operators) => {
                let mut members = Vec::new();
                for (op_key, op_value) in operators {
                    members.push(Self::parse_operator(column, op_key, op_value)?);
                }
                Ok(Self::group(members))
            }
            plain => Ok(CriteriaPredicate::Compare {
                column: column.to_string(),
                op: CompareOp::Eq,
                value: CriteriaValue::from_json(plain),
            }),
        }
    }

    fn parse_operator(
        column: &str,
        op_key: &str,
        value: &Value,
    ) -> Result<CriteriaPredicate, DatabaseError> {
        let compare = |op: CompareOp| CriteriaPredicate::Compare {
            column: column.to_string(),
            op,
            value: CriteriaValue::from_json(value),
        };
        let string_match = |kind: StringMatchKind| {
            Ok(CriteriaPredicate::StringMatch {
                column: column.to_string(),
                kind,
                pattern: string_pattern(column, value)?,
            })
        };

        match op_key {
            "not" | "!" | "!=" => match value {
                Value::Array(values) => Ok(CriteriaPredicate::NotIn {
                    column: column.to_string(),
                    values: values.iter().map(CriteriaValue::from_json).collect(),
                }),
                _ => Ok(compare(CompareOp::Ne)),
            },
            "lessThan" | "<" => Ok(compare(CompareOp::Lt)),
            "lessThanOrEqual" | "<=" => Ok(compare(CompareOp::Lte)),
            "greaterThan" | ">" => Ok(compare(CompareOp::Gt)),
            "greaterThanOrEqual" | ">=" => Ok(compare(CompareOp::Gte)),
            "like" => string_match(StringMatchKind::Like),
            "contains" => string_match(StringMatchKind::Contains),
            "startsWith" => string_match(StringMatchKind::StartsWith),
            "endsWith" => string_match(StringMatchKind::EndsWith),
            unknown => Err(DatabaseError::Criteria(format!(
                "Unknown operator `{unknown}` for column `{column}`"
            ))),
        }
    }
}

fn string_pattern(column: &str, value: &Value) -> Result<String, DatabaseError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(DatabaseError::Criteria(format!(
            "String match on column `{column}` expects a string pattern"
        ))),
    }
}
