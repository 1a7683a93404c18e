#[cfg(test)]
use crate::SQLParam;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use super::sql_builder::SqlStyle;
use super::SQLBuilder;

/// A trait for types that can build themselves into an SQL expression.
///
/// Each constituent of an SQL expression (column, table, predicate, select,
/// etc.) implements this trait, which is then used to hierarchically build an
/// SQL string and the list of parameters to be supplied to it.
pub trait ExpressionBuilder {
    /// Build the SQL expression into the given SQL builder
    fn build(&self, builder: &mut SQLBuilder);

    /// Build the SQL expression into a string and return it along with the
    /// parameters. This is useful for testing, where we want to assert on the
    /// generated SQL without constructing an `SQLBuilder` by hand.
    #[cfg(test)]
    fn into_sql(self) -> (String, Vec<Arc<dyn SQLParam>>)
    where
        Self: Sized,
    {
        self.into_sql_styled(SqlStyle::ansi())
    }

    #[cfg(test)]
    fn into_sql_styled(self, style: SqlStyle) -> (String, Vec<Arc<dyn SQLParam>>)
    where
        Self: Sized,
    {
        let mut builder = SQLBuilder::new(style);
        self.build(&mut builder);
        builder.into_sql()
    }
}

impl<T> ExpressionBuilder for Box<T>
where
    T: ExpressionBuilder,
{
    fn build(&self, builder: &mut SQLBuilder) {
        self.as_ref().build(builder)
    }
}

impl<T> ExpressionBuilder for &T
where
    T: ExpressionBuilder,
{
    fn build(&self, builder: &mut SQLBuilder) {
        (**self).build(builder)
    }
}
