use super::{column::Column, select::Select, ExpressionBuilder, SQLBuilder};

/// A fully compiled predicate over concrete column expressions.
///
/// `True` and `False` render as `1 = 1` and `1 = 0`: unlike boolean literals,
/// those comparisons are accepted by every supported engine, and `1 = 0` is
/// what an empty membership test must become (an empty `IN ()` is invalid
/// SQL on most engines).
#[derive(Debug, Clone, PartialEq)]
pub enum ConcretePredicate {
    True,
    False,
    Eq(Column, Column),
    Neq(Column, Column),
    Lt(Column, Column),
    Lte(Column, Column),
    Gt(Column, Column),
    Gte(Column, Column),
    In(Column, Vec<Column>),
    NotIn(Column, Vec<Column>),
    InSubselect(Column, Box<Select>),
    IsNull(Column),
    IsNotNull(Column),
    Like(Column, Column),
    // Prefer ConcretePredicate::and(), which simplifies the clause, to construct an And expression
    And(Box<ConcretePredicate>, Box<ConcretePredicate>),
    // Prefer ConcretePredicate::or(), which simplifies the clause, to construct an Or expression
    Or(Box<ConcretePredicate>, Box<ConcretePredicate>),
    Not(Box<ConcretePredicate>),
}

impl ConcretePredicate {
    pub fn and(lhs: ConcretePredicate, rhs: ConcretePredicate) -> ConcretePredicate {
        match (lhs, rhs) {
            (ConcretePredicate::False, _) | (_, ConcretePredicate::False) => {
                ConcretePredicate::False
            }
            (ConcretePredicate::True, rhs) => rhs,
            (lhs, ConcretePredicate::True) => lhs,
            (lhs, rhs) => ConcretePredicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn or(lhs: ConcretePredicate, rhs: ConcretePredicate) -> ConcretePredicate {
        match (lhs, rhs) {
            (ConcretePredicate::True, _) | (_, ConcretePredicate::True) => ConcretePredicate::True,
            (ConcretePredicate::False, rhs) => rhs,
            (lhs, ConcretePredicate::False) => lhs,
            (lhs, rhs) => ConcretePredicate::Or(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Conjoin a whole list, simplifying as it goes.
    pub fn all(predicates: impl IntoIterator<Item = ConcretePredicate>) -> ConcretePredicate {
        predicates
            .into_iter()
            .fold(ConcretePredicate::True, ConcretePredicate::and)
    }

    /// Disjoin a whole list, simplifying as it goes.
    pub fn any(predicates: impl IntoIterator<Item = ConcretePredicate>) -> ConcretePredicate {
        predicates
            .into_iter()
            .fold(ConcretePredicate::False, ConcretePredicate::or)
    }
}

impl std::ops::Not for ConcretePredicate {
    type Output = ConcretePredicate;

    fn not(self) -> Self::Output {
        match self {
            // Reduced to a simpler form when possible, else fall back to Not
            ConcretePredicate::True => ConcretePredicate::False,
            ConcretePredicate::False => ConcretePredicate::True,
            ConcretePredicate::Eq(lhs, rhs) => ConcretePredicate::Neq(lhs, rhs),
            ConcretePredicate::Neq(lhs, rhs) => ConcretePredicate::Eq(lhs, rhs),
            ConcretePredicate::Lt(lhs, rhs) => ConcretePredicate::Gte(lhs, rhs),
            ConcretePredicate::Lte(lhs, rhs) => ConcretePredicate::Gt(lhs, rhs),
            ConcretePredicate::Gt(lhs, rhs) => ConcretePredicate::Lte(lhs, rhs),
            ConcretePredicate::Gte(lhs, rhs) => ConcretePredicate::Lt(lhs, rhs),
            ConcretePredicate::In(col, values) => ConcretePredicate::NotIn(col, values),
            ConcretePredicate::NotIn(col, values) => ConcretePredicate::In(col, values),
            ConcretePredicate::IsNull(col) => ConcretePredicate::IsNotNull(col),
            ConcretePredicate::IsNotNull(col) => ConcretePredicate::IsNull(col),
            predicate => ConcretePredicate::Not(Box::new(predicate)),
        }
    }
}

impl ExpressionBuilder for ConcretePredicate {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            ConcretePredicate::True => builder.push_str("1 = 1"),
            ConcretePredicate::False => builder.push_str("1 = 0"),
            ConcretePredicate::Eq(column1, column2) => {
                combine(column1, column2, builder, " = ");
            }
            ConcretePredicate::Neq(column1, column2) => {
                combine(column1, column2, builder, " <> ");
            }
            ConcretePredicate::Lt(column1, column2) => {
                combine(column1, column2, builder, " < ");
            }
            ConcretePredicate::Lte(column1, column2) => {
                combine(column1, column2, builder, " <= ");
            }
            ConcretePredicate::Gt(column1, column2) => {
                combine(column1, column2, builder, " > ");
            }
            ConcretePredicate::Gte(column1, column2) => {
                combine(column1, column2, builder, " >= ");
            }
            ConcretePredicate::In(column, values) => {
                column.build(builder);
                builder.push_str(" IN (");
                builder.push_elems(values, ", ");
                builder.push(')');
            }
            ConcretePredicate::NotIn(column, values) => {
                column.build(builder);
                builder.push_str(" NOT IN (");
                builder.push_elems(values, ", ");
                builder.push(')');
            }
            ConcretePredicate::InSubselect(column, select) => {
                column.build(builder);
                builder.push_str(" IN (");
                select.build(builder);
                builder.push(')');
            }
            ConcretePredicate::IsNull(column) => {
                column.build(builder);
                builder.push_str(" IS NULL");
            }
            ConcretePredicate::IsNotNull(column) => {
                column.build(builder);
                builder.push_str(" IS NOT NULL");
            }
            ConcretePredicate::Like(column1, column2) => {
                combine(column1, column2, builder, " LIKE ");
            }
            ConcretePredicate::And(predicate1, predicate2) => {
                match (predicate1.as_ref(), predicate2.as_ref()) {
                    (ConcretePredicate::True, predicate) => predicate.build(builder),
                    (ConcretePredicate::False, _) => ConcretePredicate::False.build(builder),
                    (predicate, ConcretePredicate::True) => predicate.build(builder),
                    (_, ConcretePredicate::False) => ConcretePredicate::False.build(builder),
                    (predicate1, predicate2) => {
                        builder.push('(');
                        predicate1.build(builder);
                        builder.push_str(" AND ");
                        predicate2.build(builder);
                        builder.push(')');
                    }
                }
            }
            ConcretePredicate::Or(predicate1, predicate2) => {
                builder.push('(');
                predicate1.build(builder);
                builder.push_str(" OR ");
                predicate2.build(builder);
                builder.push(')');
            }
            ConcretePredicate::Not(predicate) => {
                builder.push_str("NOT (");
                predicate.build(builder);
                builder.push(')');
            }
        }
    }
}

fn combine(column1: &Column, column2: &Column, builder: &mut SQLBuilder, op: &str) {
    column1.build(builder);
    builder.push_str(op);
    column2.build(builder);
}
