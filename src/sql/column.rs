use super::{order::OrderBy, select::Select, ExpressionBuilder, SQLBuilder};
use crate::SQLParamContainer;

/// A column-position expression in a `SELECT` list, a predicate, or an `ON`
/// clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// A reference to a column of an aliased table: `"table"."column"`
    Physical { table: String, column: String },
    /// `<expr> AS "alias"`
    Aliased { column: Box<Column>, alias: String },
    /// A bound parameter
    Literal(SQLParamContainer),
    /// `*` or `"table".*`
    Star(Option<String>),
    /// A function applied to an expression, e.g. `LOWER`, `SUM`, `AVG`,
    /// `MIN`, `MAX`, `COUNT`
    Function {
        function_name: String,
        column: Box<Column>,
    },
    /// A scalar subquery
    SubSelect(Box<Select>),
    /// `(DENSE_RANK() OVER (PARTITION BY ... ORDER BY ...))`: the pagination
    /// rank for engines with window functions. An empty partition list ranks
    /// over the whole result.
    DenseRank {
        partition_by: Vec<Column>,
        order_by: OrderBy,
    },
    /// A raw fragment carrying no parameters. Kept to the few engine
    /// arithmetic spots (`count(1) + 1`) that the typed variants do not cover.
    Raw(&'static str),
}

impl Column {
    pub fn physical(table: impl Into<String>, column: impl Into<String>) -> Self {
        Column::Physical {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn aliased(column: Column, alias: impl Into<String>) -> Self {
        Column::Aliased {
            column: Box::new(column),
            alias: alias.into(),
        }
    }

    pub fn function(function_name: impl Into<String>, column: Column) -> Self {
        Column::Function {
            function_name: function_name.into(),
            column: Box::new(column),
        }
    }

    pub fn literal(param: SQLParamContainer) -> Self {
        Column::Literal(param)
    }
}

impl ExpressionBuilder for Column {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Column::Physical { table, column } => builder.push_column(table, column),
            Column::Aliased { column, alias } => {
                column.build(builder);
                builder.push_str(" AS ");
                builder.push_identifier(alias);
            }
            Column::Literal(value) => builder.push_param(value.param()),
            Column::Star(table) => {
                if let Some(table) = table {
                    builder.push_identifier(table);
                    builder.push('.');
                }
                builder.push('*');
            }
            Column::Function {
                function_name,
                column,
            } => {
                builder.push_str(function_name);
                builder.push('(');
                column.build(builder);
                builder.push(')');
            }
            Column::SubSelect(select) => {
                builder.push('(');
                select.build(builder);
                builder.push(')');
            }
            Column::DenseRank {
                partition_by,
                order_by,
            } => {
                builder.push_str("(DENSE_RANK() OVER (");
                if !partition_by.is_empty() {
                    builder.push_str("PARTITION BY ");
                    builder.push_elems(partition_by, ", ");
                    builder.push(' ');
                }
                order_by.build(builder);
                builder.push_str("))");
            }
            Column::Raw(fragment) => builder.push_str(fragment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::order::{OrderByElement, Ordering};

    #[test]
    fn physical_column() {
        let col = Column::physical("people", "age");
        assert_binding!(col.into_sql(), r#""people"."age""#);
    }

    #[test]
    fn aliased_column() {
        let col = Column::aliased(Column::physical("orders", "id"), "orders_id");
        assert_binding!(col.into_sql(), r#""orders"."id" AS "orders_id""#);
    }

    #[test]
    fn lowered_literal() {
        let col = Column::function("LOWER", Column::literal(SQLParamContainer::new("foo")));
        assert_binding!(col.into_sql(), "LOWER($1)", "foo");
    }

    #[test]
    fn dense_rank_column() {
        let col = Column::DenseRank {
            partition_by: vec![Column::physical("_PARENT__users", "id")],
            order_by: OrderBy(vec![OrderByElement(
                Column::physical("orders", "id"),
                Ordering::Asc,
            )]),
        };
        assert_binding!(
            col.into_sql(),
            r#"(DENSE_RANK() OVER (PARTITION BY "_PARENT__users"."id" ORDER BY "orders"."id" ASC))"#
        );
    }
}
