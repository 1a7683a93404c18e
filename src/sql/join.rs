use super::{predicate::ConcretePredicate, table::Table, ExpressionBuilder, SQLBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Cross,
}

/// A join between two table expressions. Join chains nest on the left, so the
/// base table of a chain is the left-most leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    left: Box<Table>,
    right: Box<Table>,
    kind: JoinKind,
    predicate: Option<ConcretePredicate>,
}

impl Join {
    pub fn new(
        left: Table,
        right: Table,
        kind: JoinKind,
        predicate: Option<ConcretePredicate>,
    ) -> Self {
        Join {
            left: Box::new(left),
            right: Box::new(right),
            kind,
            predicate,
        }
    }

    pub fn left(&self) -> &Table {
        &self.left
    }
}

impl ExpressionBuilder for Join {
    fn build(&self, builder: &mut SQLBuilder) {
        self.left.build(builder);
        match self.kind {
            JoinKind::Left => builder.push_str(" LEFT JOIN "),
            JoinKind::Cross => builder.push_str(" CROSS JOIN "),
        }
        self.right.build(builder);
        if let Some(predicate) = &self.predicate {
            builder.push_str(" ON ");
            predicate.build(builder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::column::Column;

    #[test]
    fn basic_join() {
        let join = Join::new(
            Table::physical("concerts", None),
            Table::physical("venues", None),
            JoinKind::Left,
            Some(ConcretePredicate::Eq(
                Column::physical("concerts", "venue_id"),
                Column::physical("venues", "id"),
            )),
        );

        assert_binding!(
            join.into_sql(),
            r#""concerts" LEFT JOIN "venues" ON "concerts"."venue_id" = "venues"."id""#
        );
    }
}
