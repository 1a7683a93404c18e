use crate::{
    criteria::{
        predicate::{CompareOp, CriteriaPredicate, StringMatchKind},
        value::CriteriaValue,
    },
    dialect::Dialect,
    sql::{column::Column, predicate::ConcretePredicate},
    SQLParamContainer,
};

/// Compile a criteria predicate tree against a table alias. The result is a
/// plain predicate expression: the caller decides whether it lands in the
/// outer `WHERE` or inside a join's `ON` (needed to preserve LEFT JOIN
/// semantics for optional associations).
pub fn compile(
    dialect: &dyn Dialect,
    table_alias: &str,
    predicate: &CriteriaPredicate,
) -> ConcretePredicate {
    match predicate {
        CriteriaPredicate::And(members) => ConcretePredicate::all(
            members
                .iter()
                .map(|member| compile(dialect, table_alias, member)),
        ),
        CriteriaPredicate::Or(members) => ConcretePredicate::any(
            members
                .iter()
                .map(|member| compile(dialect, table_alias, member)),
        ),
        CriteriaPredicate::Compare { column, op, value } => {
            compile_compare(dialect, table_alias, column, *op, value)
        }
        CriteriaPredicate::In { column, values } => {
            compile_membership(dialect, table_alias, column, values, false)
        }
        CriteriaPredicate::NotIn { column, values } => {
            compile_membership(dialect, table_alias, column, values, true)
        }
        CriteriaPredicate::StringMatch {
            column,
            kind,
            pattern,
        } => compile_string_match(table_alias, column, *kind, pattern),
    }
}

fn compile_compare(
    dialect: &dyn Dialect,
    table_alias: &str,
    column: &str,
    op: CompareOp,
    value: &CriteriaValue,
) -> ConcretePredicate {
    let physical = Column::physical(table_alias, column);

    if value.is_null() {
        return match op {
            CompareOp::Eq => ConcretePredicate::IsNull(physical),
            CompareOp::Ne => ConcretePredicate::IsNotNull(physical),
            // Ordering against NULL matches nothing
            _ => ConcretePredicate::False,
        };
    }

    // String comparisons go through LOWER on both sides: portable
    // case-insensitive matching across engines with differing collations.
    let (lhs, rhs) = match value {
        CriteriaValue::String(s) => (
            Column::function("LOWER", physical),
            Column::literal(SQLParamContainer::new(s.to_lowercase())),
        ),
        other => (physical, Column::literal(value_param(dialect, other))),
    };

    match op {
        CompareOp::Eq => ConcretePredicate::Eq(lhs, rhs),
        CompareOp::Ne => ConcretePredicate::Neq(lhs, rhs),
        CompareOp::Lt => ConcretePredicate::Lt(lhs, rhs),
        CompareOp::Lte => ConcretePredicate::Lte(lhs, rhs),
        CompareOp::Gt => ConcretePredicate::Gt(lhs, rhs),
        CompareOp::Gte => ConcretePredicate::Gte(lhs, rhs),
    }
}

fn compile_membership(
    dialect: &dyn Dialect,
    table_alias: &str,
    column: &str,
    values: &[CriteriaValue],
    negated: bool,
) -> ConcretePredicate {
    if values.is_empty() {
        // never an empty IN list, which is invalid SQL on most engines
        return if negated {
            ConcretePredicate::True
        } else {
            ConcretePredicate::False
        };
    }

    let physical = Column::physical(table_alias, column);
    let literals = |chunk: &[CriteriaValue]| -> Vec<Column> {
        chunk
            .iter()
            .map(|value| Column::literal(value_param(dialect, value)))
            .collect()
    };

    match dialect.in_chunk_size() {
        Some(cap) if values.len() >= cap => {
            let chunked = values.chunks(cap).map(|chunk| {
                if negated {
                    ConcretePredicate::NotIn(physical.clone(), literals(chunk))
                } else {
                    ConcretePredicate::In(physical.clone(), literals(chunk))
                }
            });
            if negated {
                // a value is outside the full list only if outside every chunk
                ConcretePredicate::all(chunked)
            } else {
                ConcretePredicate::any(chunked)
            }
        }
        _ => {
            if negated {
                ConcretePredicate::NotIn(physical, literals(values))
            } else {
                ConcretePredicate::In(physical, literals(values))
            }
        }
    }
}

fn compile_string_match(
    table_alias: &str,
    column: &str,
    kind: StringMatchKind,
    pattern: &str,
) -> ConcretePredicate {
    let pattern = pattern.to_lowercase();
    let pattern = match kind {
        StringMatchKind::Like => pattern,
        StringMatchKind::Contains => format!("%{pattern}%"),
        StringMatchKind::StartsWith => format!("{pattern}%"),
        StringMatchKind::EndsWith => format!("%{pattern}"),
    };

    ConcretePredicate::Like(
        Column::function("LOWER", Column::physical(table_alias, column)),
        Column::literal(SQLParamContainer::new(pattern)),
    )
}

pub(crate) fn value_param(dialect: &dyn Dialect, value: &CriteriaValue) -> SQLParamContainer {
    match value {
        CriteriaValue::Null => SQLParamContainer::new(None::<String>),
        CriteriaValue::Bool(b) => SQLParamContainer::new(*b),
        CriteriaValue::Int(i) => SQLParamContainer::new(*i),
        CriteriaValue::Float(f) => SQLParamContainer::new(*f),
        CriteriaValue::String(s) => SQLParamContainer::new(s.clone()),
        CriteriaValue::Timestamp(ts) => SQLParamContainer::new(dialect.format_timestamp(ts)),
        CriteriaValue::Json(value) => SQLParamContainer::new(value.to_string()),
    }
}
