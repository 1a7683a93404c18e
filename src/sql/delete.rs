use super::{predicate::ConcretePredicate, table::Table, ExpressionBuilder, SQLBuilder};

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: Table,
    pub predicate: ConcretePredicate,
}

impl ExpressionBuilder for Delete {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("DELETE FROM ");
        self.table.build(builder);

        if self.predicate != ConcretePredicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(builder);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sql::column::Column, SQLParamContainer};

    #[test]
    fn predicated_delete() {
        let delete = Delete {
            table: Table::physical("users", None),
            predicate: ConcretePredicate::Lt(
                Column::physical("users", "age"),
                Column::literal(SQLParamContainer::new(18)),
            ),
        };

        assert_binding!(
            delete.into_sql(),
            r#"DELETE FROM "users" WHERE "users"."age" < $1"#,
            18
        );
    }
}
