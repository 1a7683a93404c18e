use super::{column::Column, table::Table, ExpressionBuilder, SQLBuilder};
use crate::SQLParamContainer;

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: Table,
    pub columns: Vec<String>,
    /// One inner vector per row; each must match `columns` in length.
    pub rows: Vec<Vec<SQLParamContainer>>,
    /// Dropped when the dialect has no `RETURNING` support.
    pub returning: Vec<Column>,
}

impl ExpressionBuilder for Insert {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("INSERT INTO ");
        self.table.build(builder);

        builder.push_str(" (");
        builder.push_iter(self.columns.iter(), ", ", |builder, column| {
            builder.push_identifier(column);
        });
        builder.push_str(") VALUES ");

        builder.push_iter(self.rows.iter(), ", ", |builder, row| {
            builder.push('(');
            builder.push_iter(row.iter(), ", ", |builder, value| {
                builder.push_param(value.param());
            });
            builder.push(')');
        });

        if !self.returning.is_empty() && builder.style().supports_returning {
            builder.push_str(" RETURNING ");
            builder.push_elems(&self.returning, ", ");
        }
    }
}
