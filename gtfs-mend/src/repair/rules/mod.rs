//! the repair rule catalogue: one module per anomaly class, each exposing a
//! pure `detect` predicate and a pure, idempotent `fix`. application order
//! lives in [`crate::repair::rule::RepairRule::CATALOGUE`].
pub(crate) mod agency_fields;
pub(crate) mod calendar_dates;
pub(crate) mod duplicate_routes;
pub(crate) mod final_stop_time;
pub(crate) mod pathway_type;
pub(crate) mod transfer_type;
pub(crate) mod trip_route_links;
pub(crate) mod unknown_stop_ids;

use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_error::RepairError;
use crate::repair::table_kind::TableKind;
use std::collections::{HashMap, HashSet};

pub(crate) fn malformed(kind: TableKind, msg: String) -> RepairError {
    RepairError::MalformedRowError {
        table: kind.member_name().to_string(),
        msg,
    }
}

pub(crate) fn required_column(
    table: &FeedTable,
    kind: TableKind,
    column: &str,
) -> Result<usize, RepairError> {
    table
        .column_index(column)
        .ok_or_else(|| malformed(kind, format!("column '{column}' is absent")))
}

pub(crate) fn integer_cell(
    value: &FieldValue,
    kind: TableKind,
    column: &str,
) -> Result<i64, RepairError> {
    match value {
        FieldValue::Integer(i) => Ok(*i),
        FieldValue::Text(s) => s.parse::<i64>().map_err(|_| {
            malformed(
                kind,
                format!("cannot interpret '{s}' in column '{column}' as an integer"),
            )
        }),
        FieldValue::Missing => Err(malformed(
            kind,
            format!("missing value in column '{column}'"),
        )),
    }
}

/// drop rows repeating an earlier value in the key column, keeping the first
/// occurrence. returns the deduplicated table and the number of rows removed.
pub(crate) fn dedupe_on_column(table: &FeedTable, key: usize) -> (FeedTable, usize) {
    let mut seen: HashSet<FieldValue> = HashSet::new();
    let mut kept: Vec<Vec<FieldValue>> = Vec::with_capacity(table.len());
    for row in table.rows() {
        if seen.insert(row[key].clone()) {
            kept.push(row.clone());
        }
    }
    let removed = table.len() - kept.len();
    (table.with_rows(kept), removed)
}

/// the most frequent non-missing value in a column, ties broken by first
/// appearance. `None` when the column holds no values at all.
pub(crate) fn most_frequent(table: &FeedTable, column: usize) -> Option<FieldValue> {
    let mut order: Vec<(FieldValue, usize)> = Vec::new();
    let mut positions: HashMap<FieldValue, usize> = HashMap::new();
    for row in table.rows() {
        let value = &row[column];
        if value.is_missing() {
            continue;
        }
        match positions.get(value) {
            Some(i) => order[*i].1 += 1,
            None => {
                positions.insert(value.clone(), order.len());
                order.push((value.clone(), 1));
            }
        }
    }
    let mut best: Option<(FieldValue, usize)> = None;
    for (value, count) in order {
        match &best {
            Some((_, best_count)) if count <= *best_count => {}
            _ => best = Some((value, count)),
        }
    }
    best.map(|(value, _)| value)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::repair::feed_table::FeedTable;
    use crate::repair::rule::FeedBundle;
    use crate::repair::table_kind::TableKind;

    /// build a [`FeedTable`] from CSV text for rule tests
    pub(crate) fn table(kind: TableKind, csv_text: &str) -> FeedTable {
        FeedTable::from_reader(kind.member_name(), csv_text.as_bytes())
            .expect("test table should parse")
    }

    /// build a bundle out of (kind, csv text) pairs
    pub(crate) fn bundle(members: &[(TableKind, &str)]) -> FeedBundle {
        let mut bundle = FeedBundle::default();
        for (kind, csv_text) in members {
            bundle.insert(*kind, table(*kind, csv_text));
        }
        bundle
    }
}
