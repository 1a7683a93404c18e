use serde::{Deserialize, Serialize};

use super::{column::Column, ExpressionBuilder, SQLBuilder};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ordering {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement(pub Column, pub Ordering);

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy(pub Vec<OrderByElement>);

impl ExpressionBuilder for OrderByElement {
    fn build(&self, builder: &mut SQLBuilder) {
        self.0.build(builder);
        if self.1 == Ordering::Asc {
            builder.push_str(" ASC");
        } else {
            builder.push_str(" DESC");
        }
    }
}

impl ExpressionBuilder for OrderBy {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("ORDER BY ");
        builder.push_elems(&self.0, ", ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single() {
        let order_by = OrderBy(vec![OrderByElement(
            Column::physical("people", "age"),
            Ordering::Desc,
        )]);

        assert_binding!(order_by.into_sql(), r#"ORDER BY "people"."age" DESC"#);
    }

    #[test]
    fn multiple() {
        let order_by = OrderBy(vec![
            OrderByElement(Column::physical("people", "name"), Ordering::Asc),
            OrderByElement(Column::physical("people", "age"), Ordering::Desc),
        ]);

        assert_binding!(
            order_by.into_sql(),
            r#"ORDER BY "people"."name" ASC, "people"."age" DESC"#
        );
    }
}
