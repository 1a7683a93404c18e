use super::{
    join::{Join, JoinKind},
    predicate::ConcretePredicate,
    select::Select,
    ExpressionBuilder, SQLBuilder,
};

/// A table-position expression in a `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    Physical {
        name: String,
        alias: Option<String>,
    },
    SubSelect {
        select: Box<Select>,
        alias: String,
    },
    Join(Join),
    /// A synthetic inline table of sequential ids:
    /// `(SELECT 1 AS id UNION ALL SELECT 2 ...) AS "<alias>"`. Cross-joined
    /// once per query so that multiple joins against the same child table
    /// keep distinct identity in the planner's output.
    Series {
        count: usize,
        alias: String,
    },
}

impl Table {
    pub fn physical(name: impl Into<String>, alias: Option<String>) -> Self {
        Table::Physical {
            name: name.into(),
            alias,
        }
    }

    pub fn join(
        self,
        other: Table,
        kind: JoinKind,
        predicate: Option<ConcretePredicate>,
    ) -> Table {
        Table::Join(Join::new(self, other, kind, predicate))
    }

    /// The alias (or name) the base table of this expression is known by.
    pub fn base_name(&self) -> &str {
        match self {
            Table::Physical { name, alias } => alias.as_deref().unwrap_or(name),
            Table::SubSelect { alias, .. } => alias,
            Table::Join(join) => join.left().base_name(),
            Table::Series { alias, .. } => alias,
        }
    }
}

impl ExpressionBuilder for Table {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Table::Physical { name, alias } => {
                builder.push_identifier(name);
                if let Some(alias) = alias {
                    builder.push_str(" AS ");
                    builder.push_identifier(alias);
                }
            }
            Table::SubSelect { select, alias } => {
                builder.push('(');
                select.build(builder);
                builder.push_str(") AS ");
                builder.push_identifier(alias);
            }
            Table::Join(join) => join.build(builder),
            Table::Series { count, alias } => {
                let from_dual = builder.style().from_dual;
                builder.push('(');
                for i in 1..=*count {
                    if i > 1 {
                        builder.push_str(" UNION ALL SELECT ");
                        builder.push_str(i.to_string());
                    } else {
                        builder.push_str("SELECT 1 AS id");
                    }
                    if from_dual {
                        builder.push_str(" FROM DUAL");
                    }
                }
                builder.push_str(") AS ");
                builder.push_identifier(alias);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliased_table() {
        let table = Table::physical("users", Some("_PARENT__users".to_string()));
        assert_binding!(table.into_sql(), r#""users" AS "_PARENT__users""#);
    }

    #[test]
    fn id_series() {
        let table = Table::Series {
            count: 3,
            alias: "joins".to_string(),
        };
        assert_binding!(
            table.into_sql(),
            r#"(SELECT 1 AS id UNION ALL SELECT 2 UNION ALL SELECT 3) AS "joins""#
        );
    }
}
