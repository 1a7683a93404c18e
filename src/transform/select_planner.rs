use std::collections::{HashMap, HashSet};

use tracing::instrument;

use crate::{
    criteria::{join_descriptor::JoinDescriptor, Criteria},
    database_error::DatabaseError,
    dialect::Dialect,
    schema::{AttributeType, Collection},
    sql::{
        column::Column,
        group_by::GroupBy,
        join::JoinKind,
        limit::Limit,
        offset::Offset,
        order::{OrderBy, OrderByElement},
        predicate::ConcretePredicate,
        select::Select,
        table::Table,
    },
    SQLParamContainer,
};

use super::{
    pagination::{self, JoinContext, JunctionContext, Pagination, RootPagination},
    predicate_compiler,
};

/// One selected attribute: its caller-facing name, the column alias it
/// travels under in the flat row set, and its semantic type for casting.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelection {
    pub name: String,
    pub alias: String,
    pub typ: AttributeType,
}

/// Reassembly metadata for one association.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationPlan {
    pub name: String,
    pub table_alias: String,
    /// Alias of the child primary key in the flat rows
    pub pk_alias: String,
    pub collection: bool,
    pub aggregate: bool,
    /// Rank-column alias whose value 1 marks a child that exists only to keep
    /// its parent in the result
    pub skip_first: Option<String>,
    pub attributes: Vec<AttributeSelection>,
}

/// The compiled query plus everything the reassembler needs to rebuild nested
/// records from its flat rows.
#[derive(Debug)]
pub struct SelectPlan {
    pub select: Select,
    pub parent_alias: String,
    /// Root primary-key field name as it appears in the rows
    pub pk: String,
    pub attributes: Vec<AttributeSelection>,
    pub associations: Vec<AssociationPlan>,
}

struct AggregateAttribute {
    function: Option<&'static str>,
    name: String,
    alias: String,
    typ: AttributeType,
}

pub struct SelectPlanner<'a> {
    dialect: &'a dyn Dialect,
    collections: &'a HashMap<String, Collection>,
}

impl<'a> SelectPlanner<'a> {
    pub fn new(dialect: &'a dyn Dialect, collections: &'a HashMap<String, Collection>) -> Self {
        Self {
            dialect,
            collections,
        }
    }

    fn collection(&self, table: &str) -> Result<&Collection, DatabaseError> {
        self.collections
            .get(table)
            .ok_or_else(|| DatabaseError::UnknownCollection(table.to_string()))
    }

    /// Build the full query for a criteria: base table, aliased left joins for
    /// every association (junctions, aggregates, paginated windows included),
    /// sort, group-by, and the skip/limit strategy of the dialect.
    #[instrument(name = "SelectPlanner::plan", skip_all, fields(table = %collection.table_name))]
    pub fn plan(
        &self,
        collection: &Collection,
        criteria: &Criteria,
    ) -> Result<SelectPlan, DatabaseError> {
        criteria.validate()?;

        let dialect = self.dialect;
        let table = dialect.normalize_table_name(&collection.table_name);
        let parent_alias = dialect.create_alias("_PARENT_", Some(&table));
        let pk = collection.primary_key().to_string();

        let mut columns: Vec<Column> = Vec::new();
        let mut attributes: Vec<AttributeSelection> = Vec::new();
        let mut associations: Vec<AssociationPlan> = Vec::new();
        let mut order_elements: Vec<OrderByElement> = Vec::new();
        let mut rank_filters: Vec<ConcretePredicate> = Vec::new();
        let mut selected: HashSet<String> = HashSet::new();

        // Root aggregates suppress plain selection
        let aggregate_specs: Vec<(&'static str, String)> = [
            ("SUM", &criteria.sum),
            ("AVG", &criteria.average),
            ("MIN", &criteria.min),
            ("MAX", &criteria.max),
        ]
        .into_iter()
        .flat_map(|(function, names)| names.iter().map(move |name| (function, name.clone())))
        .collect();
        let has_aggregates = !aggregate_specs.is_empty();

        if has_aggregates {
            for (function, name) in &aggregate_specs {
                if selected.insert(name.clone()) {
                    columns.push(Column::aliased(
                        Column::function(*function, Column::physical(&parent_alias, name)),
                        name.clone(),
                    ));
                    attributes.push(AttributeSelection {
                        name: name.clone(),
                        alias: name.clone(),
                        typ: AttributeType::Float,
                    });
                }
            }
            for group in &criteria.group_by {
                if selected.insert(group.clone()) {
                    columns.push(Column::physical(&parent_alias, group));
                    attributes.push(AttributeSelection {
                        name: group.clone(),
                        alias: group.clone(),
                        typ: collection
                            .attribute(group)
                            .map(|attribute| attribute.typ)
                            .unwrap_or(AttributeType::String),
                    });
                }
            }
        } else {
            let mut selection: Vec<String> = match &criteria.select {
                Some(selection) => selection.clone(),
                None => collection
                    .attributes
                    .iter()
                    .map(|attribute| attribute.name.clone())
                    .collect(),
            };
            // the reassembler keys parents by the root pk
            if !criteria.joins.is_empty() && !selection.contains(&pk) {
                selection.insert(0, pk.clone());
            }
            for field in &selection {
                if let Some(attribute) = collection.attribute(field) {
                    if selected.insert(field.clone()) {
                        columns.push(Column::physical(&parent_alias, field));
                        attributes.push(AttributeSelection {
                            name: field.clone(),
                            alias: field.clone(),
                            typ: attribute.typ,
                        });
                    }
                }
            }
        }

        let mut predicate = criteria
            .where_clause
            .as_ref()
            .map(|where_clause| predicate_compiler::compile(dialect, &parent_alias, where_clause))
            .unwrap_or(ConcretePredicate::True);

        // parent ordering must not be perturbed by child joins: root sort first
        for (column, direction) in &criteria.sort {
            order_elements.push(OrderByElement(
                Column::physical(&parent_alias, column),
                *direction,
            ));
        }

        // Group associations by alias, in first-appearance order: two
        // descriptors sharing one alias are a junction + target pair
        let mut relations: Vec<(&str, Vec<&JoinDescriptor>)> = Vec::new();
        for join in &criteria.joins {
            match relations
                .iter()
                .position(|(alias, _)| *alias == join.alias)
            {
                Some(position) => relations[position].1.push(join),
                None => relations.push((join.alias.as_str(), vec![join])),
            }
        }

        let mut from = Table::physical(table.clone(), Some(parent_alias.clone()));
        if !relations.is_empty() {
            // correlating every LEFT JOIN to its own series id defeats
            // planner deduplication across joins to the same child table
            from = from.join(
                Table::Series {
                    count: relations.len(),
                    alias: "joins".to_string(),
                },
                JoinKind::Cross,
                None,
            );
        }

        for (index, (alias, group)) in relations.iter().enumerate() {
            let association_id = (index + 1) as i64;

            let (join, junction) = match group.len() {
                1 => (group[0], None),
                2 => {
                    if group[0].select.is_none() {
                        (group[1], Some(group[0]))
                    } else {
                        (group[0], Some(group[1]))
                    }
                }
                n => {
                    return Err(DatabaseError::Criteria(format!(
                        "association `{alias}` has {n} join descriptors; at most two are supported"
                    )))
                }
            };

            let child_collection = self.collection(&join.child)?;
            let child_table = dialect.normalize_table_name(&join.child);
            let join_alias = dialect.create_alias(&join.alias, None);
            let child_pk = child_collection.primary_key().to_string();
            let pk_alias = dialect.create_alias(&join.alias, Some(&child_pk));
            let nested = &join.criteria;
            let joins_id = || {
                ConcretePredicate::Eq(
                    Column::physical("joins", "id"),
                    Column::literal(SQLParamContainer::new(association_id)),
                )
            };
            let parent_ref = if join.parent == collection.table_name {
                parent_alias.clone()
            } else {
                dialect.normalize_table_name(&join.parent)
            };

            let aggregate_attributes = self.child_aggregates(join, child_collection);

            // Aggregate associations reduce child rows in a derived subquery
            // grouped by the child foreign key: one aggregate row per parent
            if !aggregate_attributes.is_empty() {
                self.plan_aggregate_join(
                    join,
                    junction,
                    &aggregate_attributes,
                    &child_table,
                    &join_alias,
                    &parent_ref,
                    &parent_alias,
                    &mut from,
                    &mut columns,
                    &mut order_elements,
                );

                associations.push(AssociationPlan {
                    name: join.alias.clone(),
                    table_alias: join_alias,
                    pk_alias,
                    collection: join.collection,
                    aggregate: true,
                    skip_first: None,
                    attributes: aggregate_attributes
                        .into_iter()
                        .map(|attribute| AttributeSelection {
                            name: attribute.name,
                            alias: attribute.alias,
                            typ: attribute.typ,
                        })
                        .collect(),
                });
                continue;
            }

            // A lone unselected descriptor joins the child purely as a filter
            if junction.is_none() && join.select.is_none() {
                let filter_alias = dialect.create_alias(
                    &format!("{}_{}", join.parent, join.parent_key),
                    Some(&format!("{}_{}", join.child, join.child_key)),
                );
                from = from.join(
                    Table::physical(child_table.clone(), Some(filter_alias.clone())),
                    JoinKind::Left,
                    Some(ConcretePredicate::and(
                        ConcretePredicate::Eq(
                            Column::physical(&parent_ref, &join.parent_key),
                            Column::physical(&filter_alias, &join.child_key),
                        ),
                        joins_id(),
                    )),
                );
                continue;
            }

            // Plain or many-to-many join
            let junction_context = junction.map(|junction_desc| {
                let junction_table = dialect.normalize_table_name(&junction_desc.child);
                let junction_alias = dialect.create_alias(
                    &format!("{}_{}", junction_desc.parent, junction_desc.parent_key),
                    Some(&format!(
                        "{}_{}",
                        junction_desc.child, junction_desc.child_key
                    )),
                );

                from = std::mem::replace(&mut from, Table::physical("", None)).join(
                    Table::physical(junction_table.clone(), Some(junction_alias.clone())),
                    JoinKind::Left,
                    Some(ConcretePredicate::and(
                        ConcretePredicate::Eq(
                            Column::physical(&parent_alias, &junction_desc.parent_key),
                            Column::physical(&junction_alias, &junction_desc.child_key),
                        ),
                        joins_id(),
                    )),
                );

                (junction_desc, junction_table, junction_alias)
            });

            let join_source = junction_context
                .as_ref()
                .map(|(_, _, junction_alias)| junction_alias.clone())
                .unwrap_or_else(|| parent_ref.clone());

            let mut on = ConcretePredicate::and(
                ConcretePredicate::Eq(
                    Column::physical(&join_source, &join.parent_key),
                    Column::physical(&join_alias, &join.child_key),
                ),
                joins_id(),
            );
            if let Some(where_clause) = &nested.where_clause {
                on = ConcretePredicate::and(
                    on,
                    predicate_compiler::compile(dialect, &join_alias, where_clause),
                );
            }
            from = from.join(
                Table::physical(child_table.clone(), Some(join_alias.clone())),
                JoinKind::Left,
                Some(on),
            );

            // child columns travel under synthetic `<association>_<column>`
            // aliases
            let mut association_attributes = Vec::new();
            if let Some(select) = &join.select {
                for column_name in select {
                    if let Some(attribute) = child_collection.attribute(column_name) {
                        let column_alias = dialect.create_alias(&join.alias, Some(column_name));
                        if selected.insert(column_alias.clone()) {
                            columns.push(Column::aliased(
                                Column::physical(&join_alias, column_name),
                                column_alias.clone(),
                            ));
                            association_attributes.push(AttributeSelection {
                                name: column_name.clone(),
                                alias: column_alias,
                                typ: attribute.typ,
                            });
                        }
                    }
                }
                // the reassembler keys children by the child pk even when the
                // caller did not select it
                if selected.insert(pk_alias.clone()) {
                    columns.push(Column::aliased(
                        Column::physical(&join_alias, &child_pk),
                        pk_alias.clone(),
                    ));
                }
            }

            let nested_pagination = Pagination::from_criteria(nested);
            let mut skip_first = None;

            if nested_pagination.is_some() {
                let join_parent_table = dialect.normalize_table_name(&join.parent);
                let junction_parent_table = junction_context
                    .as_ref()
                    .map(|(junction_desc, _, _)| dialect.normalize_table_name(&junction_desc.parent));
                let junction_ctx = junction_context.as_ref().map(
                    |(junction_desc, junction_table, _)| JunctionContext {
                        table: junction_table,
                        parent_table: junction_parent_table.as_deref().unwrap_or_default(),
                        parent_key: &junction_desc.parent_key,
                        child_key: &junction_desc.child_key,
                    },
                );

                let rank = pagination::join_rank(
                    dialect,
                    &parent_alias,
                    &pk,
                    &JoinContext {
                        join_alias: &join_alias,
                        child_table: &child_table,
                        child_pk: &child_pk,
                        sort: &nested.sort,
                        where_clause: nested.where_clause.as_ref(),
                        parent_table: &join_parent_table,
                        parent_key: &join.parent_key,
                        child_key: &join.child_key,
                        junction: junction_ctx,
                    },
                    nested_pagination,
                );

                columns.push(rank.column);
                rank_filters.push(rank.filter);
                skip_first = rank.skip_first;

                // child rows must come back in the ranked order so the
                // reassembler sees them window-ordered
                for (key, direction) in pagination::rank_sort_keys(&nested.sort, &child_pk) {
                    order_elements.push(OrderByElement(
                        Column::physical(&join_alias, &key),
                        direction,
                    ));
                }
            } else {
                for (key, direction) in &nested.sort {
                    order_elements.push(OrderByElement(
                        Column::physical(&join_alias, key),
                        *direction,
                    ));
                }
            }

            associations.push(AssociationPlan {
                name: join.alias.clone(),
                table_alias: join_alias,
                pk_alias,
                collection: join.collection,
                aggregate: false,
                skip_first,
                attributes: association_attributes,
            });
        }

        // root skip/limit last, and never under aggregates
        let mut root_limit = None;
        let mut root_offset = None;
        if !has_aggregates {
            match pagination::root_pagination(
                dialect,
                &parent_alias,
                &pk,
                &table,
                criteria,
                !relations.is_empty(),
            ) {
                RootPagination::None => {}
                RootPagination::OffsetLimit => {
                    root_limit = criteria.limit.map(Limit);
                    root_offset = criteria.skip.map(Offset);
                }
                RootPagination::Rank(rank) => {
                    columns.push(rank.column);
                    rank_filters.push(rank.filter);
                }
                RootPagination::Membership(membership) => {
                    predicate = ConcretePredicate::and(predicate, membership);
                }
            }
        }

        let mut select = Select::new(from, columns, predicate);
        if has_aggregates && !criteria.group_by.is_empty() {
            select.group_by = Some(GroupBy(
                criteria
                    .group_by
                    .iter()
                    .map(|group| Column::physical(&parent_alias, group))
                    .collect(),
            ));
        }
        if !order_elements.is_empty() {
            select.order_by = Some(OrderBy(order_elements));
        }
        select.limit = root_limit;
        select.offset = root_offset;

        let select = pagination::wrap_rank_filters(select, rank_filters);

        Ok(SelectPlan {
            select,
            parent_alias,
            pk,
            attributes,
            associations,
        })
    }

    /// `SELECT COUNT(*) AS cnt` under the same criteria predicate.
    pub fn plan_count(
        &self,
        collection: &Collection,
        criteria: &Criteria,
    ) -> Result<Select, DatabaseError> {
        let table = self.dialect.normalize_table_name(&collection.table_name);
        let predicate = criteria
            .where_clause
            .as_ref()
            .map(|where_clause| predicate_compiler::compile(self.dialect, &table, where_clause))
            .unwrap_or(ConcretePredicate::True);

        Ok(Select::new(
            Table::physical(table, None),
            vec![Column::aliased(
                Column::function("COUNT", Column::Star(None)),
                "cnt",
            )],
            predicate,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn plan_aggregate_join(
        &self,
        join: &JoinDescriptor,
        junction: Option<&JoinDescriptor>,
        aggregate_attributes: &[AggregateAttribute],
        child_table: &str,
        join_alias: &str,
        parent_ref: &str,
        parent_alias: &str,
        from: &mut Table,
        columns: &mut Vec<Column>,
        order_elements: &mut Vec<OrderByElement>,
    ) {
        let dialect = self.dialect;
        let nested = &join.criteria;

        let (sub, on) = match junction {
            None => {
                let sub_key_alias = dialect.create_alias(join_alias, Some(&join.child_key));
                let mut sub_columns: Vec<Column> = aggregate_attributes
                    .iter()
                    .map(|attribute| aggregate_column(child_table, attribute))
                    .collect();
                sub_columns.push(Column::aliased(
                    Column::physical(child_table, &join.child_key),
                    sub_key_alias.clone(),
                ));

                let mut sub_group = vec![Column::physical(child_table, &join.child_key)];
                sub_group.extend(
                    nested
                        .group_by
                        .iter()
                        .map(|group| Column::physical(child_table, group)),
                );

                let mut sub = Select::new(
                    Table::physical(child_table, None),
                    sub_columns,
                    ConcretePredicate::True,
                );
                sub.group_by = Some(GroupBy(sub_group));

                let on = ConcretePredicate::Eq(
                    Column::physical(parent_ref, &join.parent_key),
                    Column::physical(join_alias, &sub_key_alias),
                );
                (sub, on)
            }
            Some(junction_desc) => {
                let junction_table = dialect.normalize_table_name(&junction_desc.child);
                let junction_key_alias = dialect.create_alias("junction_", Some(join_alias));

                let mut sub_columns: Vec<Column> = aggregate_attributes
                    .iter()
                    .map(|attribute| aggregate_column(child_table, attribute))
                    .collect();
                sub_columns.push(Column::aliased(
                    Column::physical(&junction_table, &junction_desc.child_key),
                    junction_key_alias.clone(),
                ));

                let mut sub_group = vec![Column::physical(
                    &junction_table,
                    &junction_desc.child_key,
                )];
                sub_group.extend(
                    nested
                        .group_by
                        .iter()
                        .map(|group| Column::physical(child_table, group)),
                );

                let sub_from = Table::physical(child_table, None).join(
                    Table::physical(junction_table.clone(), None),
                    JoinKind::Left,
                    Some(ConcretePredicate::Eq(
                        Column::physical(&junction_table, &join.parent_key),
                        Column::physical(child_table, &join.child_key),
                    )),
                );

                let mut sub = Select::new(sub_from, sub_columns, ConcretePredicate::True);
                sub.group_by = Some(GroupBy(sub_group));

                let on = ConcretePredicate::Eq(
                    Column::physical(parent_alias, &junction_desc.parent_key),
                    Column::physical(join_alias, &junction_key_alias),
                );
                (sub, on)
            }
        };

        *from = std::mem::replace(from, Table::physical("", None)).join(
            Table::SubSelect {
                select: Box::new(sub),
                alias: join_alias.to_string(),
            },
            JoinKind::Left,
            Some(on),
        );

        for attribute in aggregate_attributes {
            columns.push(Column::physical(join_alias, &attribute.alias));
        }
        for (key, direction) in &nested.sort {
            order_elements.push(OrderByElement(
                Column::physical(join_alias, dialect.create_alias(&join.alias, Some(key))),
                *direction,
            ));
        }
    }

    fn child_aggregates(
        &self,
        join: &JoinDescriptor,
        child_collection: &Collection,
    ) -> Vec<AggregateAttribute> {
        let nested = &join.criteria;
        let mut attributes = Vec::new();

        for name in &nested.sum {
            if let Some(attribute) = child_collection.attribute(name) {
                attributes.push(self.aggregate_attribute(join, Some("SUM"), name, attribute.typ));
            }
        }
        for name in &nested.average {
            if child_collection.attribute(name).is_some() {
                attributes.push(self.aggregate_attribute(
                    join,
                    Some("AVG"),
                    name,
                    AttributeType::Float,
                ));
            }
        }
        for name in &nested.min {
            if let Some(attribute) = child_collection.attribute(name) {
                attributes.push(self.aggregate_attribute(join, Some("MIN"), name, attribute.typ));
            }
        }
        for name in &nested.max {
            if let Some(attribute) = child_collection.attribute(name) {
                attributes.push(self.aggregate_attribute(join, Some("MAX"), name, attribute.typ));
            }
        }

        if !attributes.is_empty() {
            for name in &nested.group_by {
                if let Some(attribute) = child_collection.attribute(name) {
                    attributes.push(self.aggregate_attribute(join, None, name, attribute.typ));
                }
            }
        }

        attributes
    }

    fn aggregate_attribute(
        &self,
        join: &JoinDescriptor,
        function: Option<&'static str>,
        name: &str,
        typ: AttributeType,
    ) -> AggregateAttribute {
        AggregateAttribute {
            function,
            name: name.to_string(),
            alias: self.dialect.create_alias(&join.alias, Some(name)),
            typ,
        }
    }
}

fn aggregate_column(child_table: &str, attribute: &AggregateAttribute) -> Column {
    let inner = Column::physical(child_table, &attribute.name);
    let expr = match attribute.function {
        Some(function) => Column::function(function, inner),
        None => inner,
    };
    Column::aliased(expr, attribute.alias.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::{postgres::PostgresDialect, sqlite::SqliteDialect},
        sql::ExpressionBuilder,
    };
    use serde_json::json;

    fn collections() -> HashMap<String, Collection> {
        let mut collections = HashMap::new();
        collections.insert(
            "users".to_string(),
            Collection::from_definition(
                "users",
                &json!({
                    "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
                    "name": {"type": "string"},
                    "age": {"type": "integer"}
                }),
            )
            .unwrap(),
        );
        collections.insert(
            "orders".to_string(),
            Collection::from_definition(
                "orders",
                &json!({
                    "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
                    "user_id": {"type": "integer"},
                    "amount": {"type": "decimal"}
                }),
            )
            .unwrap(),
        );
        collections.insert(
            "users_orders".to_string(),
            Collection::from_definition(
                "users_orders",
                &json!({
                    "id": {"type": "integer", "primaryKey": true, "autoIncrement": true},
                    "user_id": {"type": "integer"},
                    "order_id": {"type": "integer"}
                }),
            )
            .unwrap(),
        );
        collections
    }

    fn users_orders_criteria() -> Criteria {
        Criteria::from_json(&json!({
            "where": {"age": {"greaterThan": 18}},
            "sort": {"name": 1},
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id", "amount"],
                "collection": true,
                "criteria": {"skip": 0, "limit": 2, "sort": {"id": 1}}
            }]
        }))
        .unwrap()
    }

    #[test]
    fn paginated_one_to_many_join() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);
        let plan = planner
            .plan(&collections["users"], &users_orders_criteria())
            .unwrap();

        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "SKLMT".* FROM (SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."id" AS "orders_id", "orders"."amount" AS "orders_amount", (DENSE_RANK() OVER (PARTITION BY "_PARENT__users"."id" ORDER BY "orders"."id" ASC)) AS "_SKLMT__orders" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "orders" AS "orders" ON ("_PARENT__users"."id" = "orders"."user_id" AND "joins"."id" = $1) WHERE "_PARENT__users"."age" > $2 ORDER BY "_PARENT__users"."name" ASC, "orders"."id" ASC) AS "SKLMT" WHERE (("SKLMT"."_SKLMT__orders" > $3 AND "SKLMT"."_SKLMT__orders" <= $4) OR "SKLMT"."_SKLMT__orders" IS NULL)"#,
            1i64,
            18i64,
            0i64,
            2i64
        );

        assert_eq!(plan.pk, "id");
        assert_eq!(plan.parent_alias, "_PARENT__users");
        let association = &plan.associations[0];
        assert_eq!(association.name, "orders");
        assert_eq!(association.pk_alias, "orders_id");
        assert!(association.collection);
        // skip == 0 never marks the first child
        assert_eq!(association.skip_first, None);
        assert_eq!(
            association
                .attributes
                .iter()
                .map(|attribute| attribute.alias.as_str())
                .collect::<Vec<_>>(),
            vec!["orders_id", "orders_amount"]
        );
    }

    #[test]
    fn association_skip_marks_first_child() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id"],
                "collection": true,
                "criteria": {"skip": 1, "limit": 2}
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        let association = &plan.associations[0];
        assert_eq!(association.skip_first.as_deref(), Some("_SKLMT__orders"));

        let (stmt, _) = plan.select.into_sql();
        // a rank-1 child row is kept so the parent survives, and parents with
        // no children at all (NULL rank) are never dropped
        assert!(stmt.ends_with(
            r#"WHERE ((("SKLMT"."_SKLMT__orders" > $2 AND "SKLMT"."_SKLMT__orders" <= $3) OR "SKLMT"."_SKLMT__orders" IS NULL) OR "SKLMT"."_SKLMT__orders" = $4)"#
        ));
    }

    #[test]
    fn root_pagination_without_joins_uses_offset_limit() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({"skip": 2, "limit": 3})).unwrap();
        let plan = planner.plan(&collections["users"], &criteria).unwrap();

        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age" FROM "users" AS "_PARENT__users" LIMIT $1 OFFSET $2"#,
            3i64,
            2i64
        );
    }

    #[test]
    fn root_pagination_with_joins_ranks_parents() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "skip": 2,
            "limit": 3,
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id"],
                "collection": true
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "SKLMT".* FROM (SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."id" AS "orders_id", (DENSE_RANK() OVER (ORDER BY "_PARENT__users"."id" ASC)) AS "row_PARENT" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "orders" AS "orders" ON ("_PARENT__users"."id" = "orders"."user_id" AND "joins"."id" = $1)) AS "SKLMT" WHERE ("SKLMT"."row_PARENT" > $2 AND "SKLMT"."row_PARENT" <= $3)"#,
            1i64,
            2i64,
            5i64
        );
    }

    #[test]
    fn root_pagination_with_joins_correlated_fallback() {
        let collections = collections();
        let planner = SelectPlanner::new(&SqliteDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "skip": 2,
            "limit": 3,
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id"],
                "collection": true
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        assert_binding!(
            plan.select.into_sql_styled(SqliteDialect.style()),
            r#"SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."id" AS "orders_id" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "orders" AS "orders" ON ("_PARENT__users"."id" = "orders"."user_id" AND "joins"."id" = ?) WHERE "_PARENT__users"."id" IN (SELECT * FROM (SELECT "users"."id" FROM "users" ORDER BY "users"."id" ASC LIMIT ? OFFSET ?) AS "SKLMT")"#,
            1i64,
            3i64,
            2i64
        );
    }

    #[test]
    fn correlated_association_pagination() {
        let collections = collections();
        let planner = SelectPlanner::new(&SqliteDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id", "amount"],
                "collection": true,
                "criteria": {"skip": 1, "limit": 2}
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        let association = &plan.associations[0];
        assert_eq!(association.skip_first.as_deref(), Some("_SKLMT__orders"));

        assert_binding!(
            plan.select.into_sql_styled(SqliteDialect.style()),
            r#"SELECT "SKLMT".* FROM (SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."id" AS "orders_id", "orders"."amount" AS "orders_amount", (SELECT count(1) + 1 FROM "orders" AS "_SKLMT__orders" LEFT JOIN "users" ON "users"."id" = "_SKLMT__orders"."user_id" WHERE ("users"."id" = "_PARENT__users"."id" AND "orders"."id" > "_SKLMT__orders"."id")) AS "_SKLMT__orders" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "orders" AS "orders" ON ("_PARENT__users"."id" = "orders"."user_id" AND "joins"."id" = ?) ORDER BY "orders"."id" ASC) AS "SKLMT" WHERE ((("SKLMT"."_SKLMT__orders" > ? AND "SKLMT"."_SKLMT__orders" <= ?) OR "SKLMT"."_SKLMT__orders" IS NULL) OR "SKLMT"."_SKLMT__orders" = ?)"#,
            1i64,
            1i64,
            3i64,
            1i64
        );
    }

    #[test]
    fn many_to_many_through_junction() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "joins": [
                {
                    "parent": "users",
                    "parentKey": "id",
                    "child": "users_orders",
                    "childKey": "user_id",
                    "alias": "orders",
                    "select": false
                },
                {
                    "parent": "users_orders",
                    "parentKey": "order_id",
                    "child": "orders",
                    "childKey": "id",
                    "alias": "orders",
                    "select": ["id"],
                    "collection": true
                }
            ]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."id" AS "orders_id" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "users_orders" AS "users_id_users_orders_user_id" ON ("_PARENT__users"."id" = "users_id_users_orders_user_id"."user_id" AND "joins"."id" = $1) LEFT JOIN "orders" AS "orders" ON ("users_id_users_orders_user_id"."order_id" = "orders"."id" AND "joins"."id" = $2)"#,
            1i64,
            1i64
        );

        let association = &plan.associations[0];
        assert_eq!(association.name, "orders");
        assert!(association.collection);
    }

    #[test]
    fn aggregate_association_joins_derived_subquery() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id", "amount"],
                "collection": true,
                "criteria": {"sum": ["amount"]}
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "_PARENT__users"."id", "_PARENT__users"."name", "_PARENT__users"."age", "orders"."orders_amount" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN (SELECT SUM("orders"."amount") AS "orders_amount", "orders"."user_id" AS "orders_user_id" FROM "orders" GROUP BY "orders"."user_id") AS "orders" ON "_PARENT__users"."id" = "orders"."orders_user_id""#
        );

        let association = &plan.associations[0];
        assert!(association.aggregate);
        assert_eq!(association.attributes[0].alias, "orders_amount");
        assert_eq!(association.attributes[0].typ, AttributeType::Decimal);
    }

    #[test]
    fn root_aggregates_with_group_by() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria =
            Criteria::from_json(&json!({"sum": ["amount"], "groupBy": ["user_id"]})).unwrap();
        let plan = planner.plan(&collections["orders"], &criteria).unwrap();

        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT SUM("_PARENT__orders"."amount") AS "amount", "_PARENT__orders"."user_id" FROM "orders" AS "_PARENT__orders" GROUP BY "_PARENT__orders"."user_id""#
        );

        assert_eq!(plan.attributes.len(), 2);
        assert_eq!(plan.attributes[0].typ, AttributeType::Float);
        assert_eq!(plan.attributes[1].name, "user_id");
    }

    #[test]
    fn count_plan() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({"where": {"age": {"greaterThan": 18}}})).unwrap();
        let select = planner.plan_count(&collections["users"], &criteria).unwrap();

        assert_binding!(
            select.into_sql(),
            r#"SELECT COUNT(*) AS "cnt" FROM "users" WHERE "users"."age" > $1"#,
            18i64
        );
    }

    #[test]
    fn unselected_descriptor_joins_as_filter() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "select": ["id"],
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "order_filter",
                "select": false
            }]
        }))
        .unwrap();

        let plan = planner.plan(&collections["users"], &criteria).unwrap();
        assert!(plan.associations.is_empty());

        assert_binding!(
            plan.select.into_sql(),
            r#"SELECT "_PARENT__users"."id" FROM "users" AS "_PARENT__users" CROSS JOIN (SELECT 1 AS id) AS "joins" LEFT JOIN "orders" AS "users_id_orders_user_id" ON ("_PARENT__users"."id" = "users_id_orders_user_id"."user_id" AND "joins"."id" = $1)"#,
            1i64
        );
    }

    #[test]
    fn unknown_child_collection_is_rejected() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "missing",
                "childKey": "user_id",
                "alias": "missing",
                "select": ["id"]
            }]
        }))
        .unwrap();

        let result = planner.plan(&collections["users"], &criteria);
        assert!(matches!(
            result,
            Err(DatabaseError::UnknownCollection(table)) if table == "missing"
        ));
    }

    #[test]
    fn attribute_definition_order_is_preserved() {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);

        let plan = planner
            .plan(&collections["users"], &Criteria::default())
            .unwrap();
        assert_eq!(
            plan.attributes
                .iter()
                .map(|attribute| attribute.name.as_str())
                .collect::<Vec<_>>(),
            vec!["id", "name", "age"]
        );
    }
}
