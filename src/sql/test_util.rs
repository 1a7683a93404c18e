#![cfg(test)]

//! Test assertions to check SQL statements and parameters.

/// Assert that the given parameters match the expected ones.
///
/// ```ignore
/// assert_params!(actual_params, expected_param1, expected_param2, ...);
/// ```
macro_rules! assert_params {
    ($actual_params:expr $(, $expected_param:expr)*) => {
        let actual: &[std::sync::Arc<dyn $crate::sql::SQLParam>] = &$actual_params;
        let expected: Vec<Box<dyn $crate::sql::SQLParam>> = vec![$(Box::new($expected_param)),*];
        assert_eq!(actual.len(), expected.len(), "Parameter count mismatch");
        for (actual_param, expected_param) in actual.iter().zip(expected.iter()) {
            assert!(
                $crate::sql::SQLParam::eq(actual_param.as_ref(), expected_param.as_ref()),
                "Parameter mismatch: expected {:?}, got {:?}",
                expected_param,
                actual_param
            );
        }
    };
}

/// Assert on a `(statement, params)` pair produced by
/// [`ExpressionBuilder::into_sql`](crate::sql::ExpressionBuilder::into_sql).
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        assert_params!(actual_params);
    };
    ($actual:expr, $expected_stmt:expr, $($rest:expr), *) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        assert_params!(actual_params, $($rest), *);
    };
}
