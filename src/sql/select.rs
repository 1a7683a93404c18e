use std::sync::Arc;

use super::{
    column::Column,
    group_by::GroupBy,
    limit::Limit,
    offset::Offset,
    order::OrderBy,
    predicate::ConcretePredicate,
    sql_builder::LimitSyntax,
    table::Table,
    ExpressionBuilder, SQLBuilder,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: Table,
    pub columns: Vec<Column>,
    pub predicate: ConcretePredicate,
    pub group_by: Option<GroupBy>,
    pub having: Option<ConcretePredicate>,
    pub order_by: Option<OrderBy>,
    pub offset: Option<Offset>,
    pub limit: Option<Limit>,
}

impl Select {
    pub fn new(table: Table, columns: Vec<Column>, predicate: ConcretePredicate) -> Self {
        Self {
            table,
            columns,
            predicate,
            group_by: None,
            having: None,
            order_by: None,
            offset: None,
            limit: None,
        }
    }
}

impl ExpressionBuilder for Select {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("SELECT ");
        builder.push_elems(&self.columns, ", ");

        builder.push_str(" FROM ");
        self.table.build(builder);

        // Avoid correct, but inelegant "WHERE 1 = 1"
        if self.predicate != ConcretePredicate::True {
            builder.push_str(" WHERE ");
            self.predicate.build(builder);
        }

        if let Some(group_by) = &self.group_by {
            builder.push(' ');
            group_by.build(builder);
        }

        if let Some(having) = &self.having {
            builder.push_str(" HAVING ");
            having.build(builder);
        }

        if let Some(order_by) = &self.order_by {
            builder.push(' ');
            order_by.build(builder);
        }

        match builder.style().limit_syntax {
            LimitSyntax::LimitOffset => {
                if let Some(limit) = &self.limit {
                    builder.push(' ');
                    limit.build(builder);
                }
                if let Some(offset) = &self.offset {
                    builder.push(' ');
                    offset.build(builder);
                }
            }
            LimitSyntax::FetchFirst => {
                if let Some(Offset(offset)) = &self.offset {
                    builder.push_str(" OFFSET ");
                    builder.push_param(Arc::new(*offset));
                    builder.push_str(" ROWS");
                }
                if let Some(Limit(limit)) = &self.limit {
                    builder.push_str(" FETCH NEXT ");
                    builder.push_param(Arc::new(*limit));
                    builder.push_str(" ROWS ONLY");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sql::join::JoinKind,
        sql::order::{OrderByElement, Ordering},
        sql::sql_builder::{Placeholder, SqlStyle},
        SQLParamContainer,
    };

    #[test]
    fn predicated_select() {
        let predicate = ConcretePredicate::Eq(
            Column::physical("people", "age"),
            Column::literal(SQLParamContainer::new(5)),
        );

        let mut select = Select::new(
            Table::physical("people", None),
            vec![Column::physical("people", "age")],
            predicate,
        );
        select.limit = Some(Limit(20));
        select.offset = Some(Offset(10));

        assert_binding!(
            select.into_sql(),
            r#"SELECT "people"."age" FROM "people" WHERE "people"."age" = $1 LIMIT $2 OFFSET $3"#,
            5,
            20i64,
            10i64
        );
    }

    #[test]
    fn fetch_first_style() {
        let style = SqlStyle {
            limit_syntax: LimitSyntax::FetchFirst,
            ..SqlStyle::ansi()
        };

        let mut select = Select::new(
            Table::physical("people", None),
            vec![Column::physical("people", "age")],
            ConcretePredicate::True,
        );
        select.limit = Some(Limit(20));
        select.offset = Some(Offset(10));

        assert_binding!(
            select.into_sql_styled(style),
            r#"SELECT "people"."age" FROM "people" OFFSET $1 ROWS FETCH NEXT $2 ROWS ONLY"#,
            10i64,
            20i64
        );
    }

    #[test]
    fn joined_select_with_group_by() {
        let table = Table::physical("orders", None).join(
            Table::physical("users", None),
            JoinKind::Left,
            Some(ConcretePredicate::Eq(
                Column::physical("users", "id"),
                Column::physical("orders", "user_id"),
            )),
        );

        let mut select = Select::new(
            table,
            vec![
                Column::physical("orders", "user_id"),
                Column::aliased(
                    Column::function("SUM", Column::physical("orders", "amount")),
                    "amount",
                ),
            ],
            ConcretePredicate::True,
        );
        select.group_by = Some(GroupBy(vec![Column::physical("orders", "user_id")]));

        assert_binding!(
            select.into_sql(),
            r#"SELECT "orders"."user_id", SUM("orders"."amount") AS "amount" FROM "orders" LEFT JOIN "users" ON "users"."id" = "orders"."user_id" GROUP BY "orders"."user_id""#
        );
    }

    #[test]
    fn question_placeholders() {
        let style = SqlStyle {
            placeholder: Placeholder::Question,
            identifier_quote: '`',
            ..SqlStyle::ansi()
        };

        let select = Select::new(
            Table::physical("people", None),
            vec![Column::physical("people", "age")],
            ConcretePredicate::Eq(
                Column::physical("people", "age"),
                Column::literal(SQLParamContainer::new(5)),
            ),
        );

        assert_binding!(
            select.into_sql_styled(style),
            r#"SELECT `people`.`age` FROM `people` WHERE `people`.`age` = ?"#,
            5
        );
    }

    #[test]
    fn subselect_in_from() {
        let inner = Select::new(
            Table::physical("people", None),
            vec![Column::Star(None)],
            ConcretePredicate::True,
        );

        let mut outer = Select::new(
            Table::SubSelect {
                select: Box::new(inner),
                alias: "SKLMT".to_string(),
            },
            vec![Column::Star(Some("SKLMT".to_string()))],
            ConcretePredicate::Gt(
                Column::physical("SKLMT", "row_PARENT"),
                Column::literal(SQLParamContainer::new(2i64)),
            ),
        );
        outer.order_by = Some(OrderBy(vec![OrderByElement(
            Column::physical("SKLMT", "row_PARENT"),
            Ordering::Asc,
        )]));

        assert_binding!(
            outer.into_sql(),
            r#"SELECT "SKLMT".* FROM (SELECT * FROM "people") AS "SKLMT" WHERE "SKLMT"."row_PARENT" > $1 ORDER BY "SKLMT"."row_PARENT" ASC"#,
            2i64
        );
    }
}
