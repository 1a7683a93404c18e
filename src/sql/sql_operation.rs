use super::{
    delete::Delete, insert::Insert, select::Select, update::Update, ExpressionBuilder, SQLBuilder,
};
use crate::SQLParamContainer;

/// A single executable SQL statement.
#[derive(Debug)]
pub enum SQLOperation {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    /// A statement whose text already carries its placeholders (raw queries,
    /// introspection, DDL).
    Raw {
        stmt: String,
        params: Vec<SQLParamContainer>,
    },
}

impl ExpressionBuilder for SQLOperation {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            SQLOperation::Select(select) => select.build(builder),
            SQLOperation::Insert(insert) => insert.build(builder),
            SQLOperation::Update(update) => update.build(builder),
            SQLOperation::Delete(delete) => delete.build(builder),
            SQLOperation::Raw { stmt, params } => {
                builder.push_str(stmt);
                builder.append_params(params.iter().map(|p| p.param()));
            }
        }
    }
}
