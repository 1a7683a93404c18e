use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::{
    criteria::value as value_normalizer,
    executor::Record,
    transform::select_planner::{AssociationPlan, AttributeSelection, SelectPlan},
};

/// Rebuilds nested parent/child record trees from the flat, aliased rows a
/// planned query produces.
///
/// One pass over the rows; no I/O; fully deterministic: parents appear in
/// first-seen order and children in first-seen order within their parent,
/// which is the row order the query's ORDER BY established.
pub struct RowCursor {
    pk: String,
    attributes: Vec<AttributeSelection>,
    associations: Vec<AssociationPlan>,
}

impl RowCursor {
    pub fn from_plan(plan: &SelectPlan) -> Self {
        Self {
            pk: plan.pk.clone(),
            attributes: plan.attributes.clone(),
            associations: plan.associations.clone(),
        }
    }

    pub fn process(&self, rows: &[Record]) -> Vec<Value> {
        let mut results: Vec<Map<String, Value>> = Vec::new();
        let mut parent_index: HashMap<String, usize> = HashMap::new();
        // (parent, association, child pk) triples already materialized
        let mut child_index: HashSet<(usize, usize, String)> = HashSet::new();
        let mut aggregate_index: HashSet<(usize, usize, String)> = HashSet::new();

        for row in rows {
            let parent_key = match row.get(&self.pk) {
                None | Some(Value::Null) => continue,
                Some(value) => value_key(value),
            };

            let parent_position = match parent_index.get(&parent_key) {
                Some(position) => *position,
                None => {
                    let mut record = Map::new();
                    for attribute in &self.attributes {
                        if let Some(value) = row.get(&attribute.alias) {
                            record.insert(
                                attribute.name.clone(),
                                value_normalizer::cast(attribute.typ, value.clone()),
                            );
                        }
                    }
                    for association in &self.associations {
                        record.insert(
                            association.name.clone(),
                            if association.collection {
                                Value::Array(Vec::new())
                            } else {
                                Value::Null
                            },
                        );
                    }
                    results.push(record);
                    parent_index.insert(parent_key, results.len() - 1);
                    results.len() - 1
                }
            };

            for (association_position, association) in self.associations.iter().enumerate() {
                if association.aggregate {
                    self.attach_aggregate(
                        row,
                        association,
                        parent_position,
                        association_position,
                        &mut results,
                        &mut aggregate_index,
                    );
                    continue;
                }

                // a NULL child pk is LEFT JOIN padding: the parent stays with
                // its empty association
                let child_key = match row.get(&association.pk_alias) {
                    None | Some(Value::Null) => continue,
                    Some(value) => value_key(value),
                };

                // rank-1 rows under a skip-first marker exist only to keep
                // their parent; the child itself is outside the window
                if let Some(marker) = &association.skip_first {
                    if row.get(marker).and_then(Value::as_i64) == Some(1) {
                        continue;
                    }
                }

                if !child_index.insert((parent_position, association_position, child_key)) {
                    continue;
                }

                let mut child = Map::new();
                for attribute in &association.attributes {
                    if let Some(value) = row.get(&attribute.alias) {
                        child.insert(
                            attribute.name.clone(),
                            value_normalizer::cast(attribute.typ, value.clone()),
                        );
                    }
                }

                match results[parent_position].get_mut(&association.name) {
                    Some(Value::Array(children)) => children.push(Value::Object(child)),
                    Some(slot) => *slot = Value::Object(child),
                    None => {}
                }
            }
        }

        results.into_iter().map(Value::Object).collect()
    }

    fn attach_aggregate(
        &self,
        row: &Record,
        association: &AssociationPlan,
        parent_position: usize,
        association_position: usize,
        results: &mut [Map<String, Value>],
        aggregate_index: &mut HashSet<(usize, usize, String)>,
    ) {
        let mut aggregate = Map::new();
        for attribute in &association.attributes {
            if let Some(value) = row.get(&attribute.alias) {
                aggregate.insert(
                    attribute.name.clone(),
                    value_normalizer::cast(attribute.typ, value.clone()),
                );
            }
        }

        // every row carries a fresh aggregate; de-duplicating by value keeps
        // the joins-series fan-out from double-appending grouped rows
        let dedup_key = Value::Object(aggregate.clone()).to_string();
        if !aggregate_index.insert((parent_position, association_position, dedup_key)) {
            return;
        }

        match results[parent_position].get_mut(&association.name) {
            Some(Value::Array(entries)) => entries.push(Value::Object(aggregate)),
            Some(slot) => *slot = Value::Object(aggregate),
            None => {}
        }
    }
}

/// Canonical map key for a primary-key value.
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        criteria::Criteria, dialect::postgres::PostgresDialect, schema::Collection,
        transform::select_planner::SelectPlanner,
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
        collections
    }

    fn users_orders_cursor(criteria: &Criteria) -> RowCursor {
        let collections = collections();
        let planner = SelectPlanner::new(&PostgresDialect, &collections);
        let plan = planner.plan(&collections["users"], criteria).unwrap();
        RowCursor::from_plan(&plan)
    }

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn scenario_criteria() -> Criteria {
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
    fn nested_one_to_many_reassembly() {
        let cursor = users_orders_cursor(&scenario_criteria());

        let rows = vec![
            record(json!({"id": 2, "name": "alice", "age": 20, "orders_id": 3, "orders_amount": "10.5", "_SKLMT__orders": 1})),
            record(json!({"id": 2, "name": "alice", "age": 20, "orders_id": 4, "orders_amount": "7.0", "_SKLMT__orders": 2})),
            record(json!({"id": 3, "name": "bob", "age": 25, "orders_id": 5, "orders_amount": "1.0", "_SKLMT__orders": 1})),
            record(json!({"id": 3, "name": "bob", "age": 25, "orders_id": 6, "orders_amount": "2.0", "_SKLMT__orders": 2})),
        ];

        let nested = cursor.process(&rows);
        assert_eq!(
            nested,
            vec![
                json!({
                    "id": 2, "name": "alice", "age": 20,
                    "orders": [{"id": 3, "amount": 10.5}, {"id": 4, "amount": 7.0}]
                }),
                json!({
                    "id": 3, "name": "bob", "age": 25,
                    "orders": [{"id": 5, "amount": 1.0}, {"id": 6, "amount": 2.0}]
                }),
            ]
        );
    }

    #[test]
    fn parent_without_children_keeps_empty_collection() {
        let cursor = users_orders_cursor(&scenario_criteria());

        let rows = vec![record(json!({
            "id": 7, "name": "carol", "age": 40,
            "orders_id": null, "orders_amount": null, "_SKLMT__orders": null
        }))];

        let nested = cursor.process(&rows);
        assert_eq!(
            nested,
            vec![json!({"id": 7, "name": "carol", "age": 40, "orders": []})]
        );
    }

    #[test]
    fn duplicate_flat_rows_do_not_duplicate_children() {
        let cursor = users_orders_cursor(&scenario_criteria());

        let row = record(json!({
            "id": 2, "name": "alice", "age": 20,
            "orders_id": 3, "orders_amount": "10.5", "_SKLMT__orders": 1
        }));
        let rows = vec![row.clone(), row.clone(), row];

        let nested = cursor.process(&rows);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0]["orders"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn skip_first_marker_discards_the_placeholder_child() {
        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id"],
                "collection": true,
                "criteria": {"skip": 5}
            }]
        }))
        .unwrap();
        let cursor = users_orders_cursor(&criteria);

        // the parent has fewer children than `skip`: its rank-1 row survives
        // the filter purely to keep the parent present
        let rows = vec![record(json!({
            "id": 2, "name": "alice", "age": 20,
            "orders_id": 3, "_SKLMT__orders": 1
        }))];

        let nested = cursor.process(&rows);
        assert_eq!(
            nested,
            vec![json!({"id": 2, "name": "alice", "age": 20, "orders": []})]
        );
    }

    #[test]
    fn singular_association_nests_an_object() {
        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "last_order",
                "select": ["id"],
                "collection": false
            }]
        }))
        .unwrap();
        let cursor = users_orders_cursor(&criteria);

        let rows = vec![
            record(json!({"id": 2, "name": "alice", "age": 20, "last_order_id": 3})),
            record(json!({"id": 9, "name": "dave", "age": 30, "last_order_id": null})),
        ];

        let nested = cursor.process(&rows);
        assert_eq!(nested[0]["last_order"], json!({"id": 3}));
        assert_eq!(nested[1]["last_order"], Value::Null);
    }

    #[test]
    fn aggregate_association_attaches_cast_values() {
        let criteria = Criteria::from_json(&json!({
            "joins": [{
                "parent": "users",
                "parentKey": "id",
                "child": "orders",
                "childKey": "user_id",
                "alias": "orders",
                "select": ["id"],
                "collection": false,
                "criteria": {"sum": ["amount"]}
            }]
        }))
        .unwrap();
        let cursor = users_orders_cursor(&criteria);

        let rows = vec![record(json!({
            "id": 2, "name": "alice", "age": 20, "orders_amount": "17.5"
        }))];

        let nested = cursor.process(&rows);
        assert_eq!(nested[0]["orders"], json!({"amount": 17.5}));
    }

    #[test]
    fn reassembly_is_deterministic() {
        let cursor = users_orders_cursor(&scenario_criteria());

        let rows = vec![
            record(json!({"id": 3, "name": "bob", "age": 25, "orders_id": 5, "orders_amount": "1.0", "_SKLMT__orders": 1})),
            record(json!({"id": 2, "name": "alice", "age": 20, "orders_id": 3, "orders_amount": "10.5", "_SKLMT__orders": 1})),
            record(json!({"id": 3, "name": "bob", "age": 25, "orders_id": 6, "orders_amount": "2.0", "_SKLMT__orders": 2})),
        ];

        let first = cursor.process(&rows);
        let second = cursor.process(&rows);
        assert_eq!(first, second);

        // first-seen parent order is preserved, not re-sorted
        assert_eq!(first[0]["name"], "bob");
        assert_eq!(first[1]["name"], "alice");
    }

    #[test]
    fn rows_without_a_root_key_contribute_nothing() {
        let cursor = users_orders_cursor(&scenario_criteria());

        let rows = vec![record(json!({
            "id": null, "name": null, "age": null,
            "orders_id": null, "orders_amount": null
        }))];

        assert!(cursor.process(&rows).is_empty());
    }
}
