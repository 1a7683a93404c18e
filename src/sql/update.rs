use super::{column::Column, predicate::ConcretePredicate, table::Table, ExpressionBuilder, SQLBuilder};
use crate::SQLParamContainer;

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Table,
    pub assignments: Vec<(String, SQLParamContainer)>,
    pub predicate: ConcretePredicate,
    pub returning: Vec<Column>,
}

impl ExpressionBuilder for Update {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("UPDATE ");
        self.table.build(builder);

        builder.push_str(" SET ");
        builder.push_iter(self.assignments.iter(), ", ", |builder, (column, value)| {
            builder.push_identifier(column);
            builder.push_str(" = ");
            builder.push_param(value.param());
        });

        if self.predicate != ConcretePredicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(builder);
        }

        if !self.returning.is_empty() && builder.style().supports_returning {
            builder.push_str(" RETURNING ");
            builder.push_elems(&self.returning, ", ");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicated_update() {
        let update = Update {
            table: Table::physical("users", None),
            assignments: vec![("name".to_string(), SQLParamContainer::new("bar"))],
            predicate: ConcretePredicate::Eq(
                Column::physical("users", "id"),
                Column::literal(SQLParamContainer::new(7)),
            ),
            returning: vec![],
        };

        assert_binding!(
            update.into_sql(),
            r#"UPDATE "users" SET "name" = $1 WHERE "users"."id" = $2"#,
            "bar",
            7
        );
    }
}
