use crate::{
    criteria::{predicate::CriteriaPredicate, Criteria},
    dialect::{Dialect, RankMethod},
    sql::{
        column::Column,
        limit::Limit,
        offset::Offset,
        order::{OrderBy, OrderByElement, Ordering},
        predicate::ConcretePredicate,
        select::Select,
        table::Table,
    },
    SQLParamContainer,
};

use super::predicate_compiler;

/// The alias of the wrapper query that applies rank bounds.
pub(crate) const WRAPPER_ALIAS: &str = "SKLMT";

/// The rank column bounding root rows when joins are present.
pub(crate) const ROOT_RANK_ALIAS: &str = "row_PARENT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn from_criteria(criteria: &Criteria) -> Self {
        Self {
            skip: criteria.skip,
            limit: criteria.limit,
        }
    }

    pub fn is_some(&self) -> bool {
        self.skip.is_some() || self.limit.is_some()
    }
}

/// A computed rank: the column to add to the inner select list, the bound
/// filter the wrapper query applies, and the marker the reassembler needs
/// when a rank-1 row may carry a child that is outside the window.
#[derive(Debug)]
pub(crate) struct RankColumn {
    pub column: Column,
    pub filter: ConcretePredicate,
    pub skip_first: Option<String>,
}

/// Everything the rank computation needs to know about one paginated
/// association.
pub(crate) struct JoinContext<'a> {
    pub join_alias: &'a str,
    pub child_table: &'a str,
    pub child_pk: &'a str,
    pub sort: &'a [(String, Ordering)],
    pub where_clause: Option<&'a CriteriaPredicate>,
    /// The table the association joins from: the root table for plain joins,
    /// the junction table for many-to-many.
    pub parent_table: &'a str,
    pub parent_key: &'a str,
    pub child_key: &'a str,
    pub junction: Option<JunctionContext<'a>>,
}

pub(crate) struct JunctionContext<'a> {
    pub table: &'a str,
    pub parent_table: &'a str,
    pub parent_key: &'a str,
    pub child_key: &'a str,
}

pub(crate) enum RootPagination {
    None,
    /// Plain `LIMIT`/`OFFSET` on the query itself
    OffsetLimit,
    /// A rank column plus a wrapper filter
    Rank(RankColumn),
    /// A `pk IN (bounded subquery)` predicate on the inner query
    Membership(ConcretePredicate),
}

fn literal(value: i64) -> Column {
    Column::literal(SQLParamContainer::new(value))
}

/// The total order a paginated association ranks by: the requested sort, the
/// child key ascending when none was given, and the child key appended as the
/// final tie-break either way so repeated queries paginate identically.
pub(crate) fn rank_sort_keys(sort: &[(String, Ordering)], child_pk: &str) -> Vec<(String, Ordering)> {
    let mut keys: Vec<(String, Ordering)> = sort.to_vec();
    if !keys.iter().any(|(key, _)| key == child_pk) {
        keys.push((child_pk.to_string(), Ordering::Asc));
    }
    keys
}

/// Bounds on a 1-based rank. For associations, a NULL rank (no child at all)
/// always keeps the row, and when `skip` is in play a rank-1 row is kept so a
/// parent whose children are all skipped is never dropped; the reassembler
/// discards that child via the skip-first marker.
fn rank_bounds(rank: &Column, pagination: Pagination, association: bool) -> ConcretePredicate {
    let mut bounds = match (pagination.skip, pagination.limit) {
        (Some(skip), Some(limit)) => ConcretePredicate::and(
            ConcretePredicate::Gt(rank.clone(), literal(skip)),
            ConcretePredicate::Lte(rank.clone(), literal(skip + limit)),
        ),
        (Some(skip), None) => ConcretePredicate::Gt(rank.clone(), literal(skip)),
        (None, Some(limit)) => ConcretePredicate::Lte(rank.clone(), literal(limit)),
        (None, None) => ConcretePredicate::True,
    };

    if association {
        bounds = ConcretePredicate::or(bounds, ConcretePredicate::IsNull(rank.clone()));
        if pagination.skip.unwrap_or(0) > 0 {
            bounds = ConcretePredicate::or(
                bounds,
                ConcretePredicate::Eq(rank.clone(), literal(1)),
            );
        }
    }

    bounds
}

/// Root-level skip/limit strategy.
pub(crate) fn root_pagination(
    dialect: &dyn Dialect,
    parent_alias: &str,
    pk: &str,
    table: &str,
    criteria: &Criteria,
    has_joins: bool,
) -> RootPagination {
    let pagination = Pagination::from_criteria(criteria);
    if !pagination.is_some() {
        return RootPagination::None;
    }
    if !has_joins {
        return RootPagination::OffsetLimit;
    }

    match dialect.rank_method() {
        RankMethod::Window => {
            let keys = rank_sort_keys(&criteria.sort, pk);
            let order_by = OrderBy(
                keys.iter()
                    .map(|(key, direction)| {
                        OrderByElement(Column::physical(parent_alias, key), *direction)
                    })
                    .collect(),
            );

            let column = Column::aliased(
                Column::DenseRank {
                    partition_by: vec![],
                    order_by,
                },
                ROOT_RANK_ALIAS,
            );
            let rank_ref = Column::physical(WRAPPER_ALIAS, ROOT_RANK_ALIAS);
            RootPagination::Rank(RankColumn {
                column,
                filter: rank_bounds(&rank_ref, pagination, false),
                skip_first: None,
            })
        }
        RankMethod::CorrelatedCount => {
            // pk IN (SELECT * FROM (SELECT pk ... LIMIT/OFFSET) AS SKLMT);
            // some engines reject LIMIT directly inside an IN subquery, hence
            // the extra wrap
            let mut inner = Select::new(
                Table::physical(table, None),
                vec![Column::physical(table, pk)],
                criteria
                    .where_clause
                    .as_ref()
                    .map(|where_clause| predicate_compiler::compile(dialect, table, where_clause))
                    .unwrap_or(ConcretePredicate::True),
            );
            let keys = rank_sort_keys(&criteria.sort, pk);
            inner.order_by = Some(OrderBy(
                keys.iter()
                    .map(|(key, direction)| {
                        OrderByElement(Column::physical(table, key), *direction)
                    })
                    .collect(),
            ));
            inner.limit = pagination.limit.map(Limit);
            inner.offset = pagination.skip.map(Offset);

            let wrap = Select::new(
                Table::SubSelect {
                    select: Box::new(inner),
                    alias: WRAPPER_ALIAS.to_string(),
                },
                vec![Column::Star(None)],
                ConcretePredicate::True,
            );

            RootPagination::Membership(ConcretePredicate::InSubselect(
                Column::physical(parent_alias, pk),
                Box::new(wrap),
            ))
        }
    }
}

/// Association-level skip/limit: a rank partitioned per parent, bounding each
/// parent's child window independently.
pub(crate) fn join_rank(
    dialect: &dyn Dialect,
    parent_alias: &str,
    parent_pk: &str,
    join: &JoinContext,
    pagination: Pagination,
) -> RankColumn {
    let rank_alias = dialect.create_alias("_SKLMT_", Some(join.join_alias));
    let keys = rank_sort_keys(join.sort, join.child_pk);

    let expr = match dialect.rank_method() {
        RankMethod::Window => Column::DenseRank {
            partition_by: vec![Column::physical(parent_alias, parent_pk)],
            order_by: OrderBy(
                keys.iter()
                    .map(|(key, direction)| {
                        OrderByElement(Column::physical(join.join_alias, key), *direction)
                    })
                    .collect(),
            ),
        },
        RankMethod::CorrelatedCount => {
            correlated_rank(dialect, parent_alias, parent_pk, join, &keys, &rank_alias)
        }
    };

    let rank_ref = Column::physical(WRAPPER_ALIAS, rank_alias.clone());
    RankColumn {
        column: Column::aliased(expr, rank_alias.clone()),
        filter: rank_bounds(&rank_ref, pagination, true),
        skip_first: pagination
            .skip
            .filter(|skip| *skip > 0)
            .map(|_| rank_alias),
    }
}

/// `count(1) + 1` over the rows that precede the current child in the same
/// parent's partition, using the identical total order as the window form.
fn correlated_rank(
    dialect: &dyn Dialect,
    parent_alias: &str,
    parent_pk: &str,
    join: &JoinContext,
    keys: &[(String, Ordering)],
    rank_alias: &str,
) -> Column {
    let mut table = Table::physical(join.child_table, Some(rank_alias.to_string()));

    let correlation = match &join.junction {
        None => {
            table = table.join(
                Table::physical(join.parent_table, None),
                crate::sql::join::JoinKind::Left,
                Some(ConcretePredicate::Eq(
                    Column::physical(join.parent_table, join.parent_key),
                    Column::physical(rank_alias, join.child_key),
                )),
            );
            ConcretePredicate::Eq(
                Column::physical(join.parent_table, join.parent_key),
                Column::physical(parent_alias, parent_pk),
            )
        }
        Some(junction) => {
            table = table
                .join(
                    Table::physical(join.parent_table, None),
                    crate::sql::join::JoinKind::Left,
                    Some(ConcretePredicate::Eq(
                        Column::physical(join.parent_table, join.parent_key),
                        Column::physical(rank_alias, join.child_key),
                    )),
                )
                .join(
                    Table::physical(junction.parent_table, None),
                    crate::sql::join::JoinKind::Left,
                    Some(ConcretePredicate::Eq(
                        Column::physical(junction.parent_table, junction.parent_key),
                        Column::physical(junction.table, junction.child_key),
                    )),
                );
            ConcretePredicate::Eq(
                Column::physical(junction.parent_table, junction.parent_key),
                Column::physical(parent_alias, parent_pk),
            )
        }
    };

    let criteria_predicate = join
        .where_clause
        .map(|where_clause| predicate_compiler::compile(dialect, rank_alias, where_clause))
        .unwrap_or(ConcretePredicate::True);

    let predicate = ConcretePredicate::all([
        correlation,
        criteria_predicate,
        tuple_order(join.join_alias, rank_alias, keys),
    ]);

    Column::SubSelect(Box::new(Select::new(
        table,
        vec![Column::Raw("count(1) + 1")],
        predicate,
    )))
}

/// Rows of `sk_alias` that come strictly before the current `join_alias` row
/// in the given total order.
fn tuple_order(
    join_alias: &str,
    sk_alias: &str,
    keys: &[(String, Ordering)],
) -> ConcretePredicate {
    ConcretePredicate::any(keys.iter().enumerate().map(|(i, (key, direction))| {
        let mut member = ConcretePredicate::all(keys[..i].iter().map(|(prev, _)| {
            ConcretePredicate::Eq(
                Column::physical(join_alias, prev),
                Column::physical(sk_alias, prev),
            )
        }));

        let current = match direction {
            Ordering::Asc => ConcretePredicate::Gt(
                Column::physical(join_alias, key),
                Column::physical(sk_alias, key),
            ),
            Ordering::Desc => ConcretePredicate::Lt(
                Column::physical(join_alias, key),
                Column::physical(sk_alias, key),
            ),
        };

        member = ConcretePredicate::and(member, current);
        member
    }))
}

/// Wrap the query as `SELECT SKLMT.* FROM (...) AS SKLMT WHERE <bounds>` once
/// any rank columns exist; rank aliases are only addressable from an
/// enclosing query.
pub(crate) fn wrap_rank_filters(
    select: Select,
    filters: Vec<ConcretePredicate>,
) -> Select {
    if filters.is_empty() {
        return select;
    }

    Select::new(
        Table::SubSelect {
            select: Box::new(select),
            alias: WRAPPER_ALIAS.to_string(),
        },
        vec![Column::Star(Some(WRAPPER_ALIAS.to_string()))],
        ConcretePredicate::all(filters),
    )
}
