use super::{column::Column, ExpressionBuilder, SQLBuilder};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy(pub Vec<Column>);

impl ExpressionBuilder for GroupBy {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("GROUP BY ");
        builder.push_elems(&self.0, ", ");
    }
}
