use super::{dedupe_on_column, malformed, most_frequent, required_column};
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;
use std::collections::HashSet;

const NAME_COLUMNS: [&str; 2] = ["route_short_name", "route_long_name"];

/// fires when trips.txt repeats a trip_id, or references a route_id that
/// routes.txt does not declare
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let trips = bundle.require(TableKind::Trips)?;
    let trip_column = required_column(trips, TableKind::Trips, "trip_id")?;
    let distinct: HashSet<&FieldValue> = trips.rows().iter().map(|row| &row[trip_column]).collect();
    let duplicates = trips.len() - distinct.len();
    let unknown = missing_route_ids(bundle, trips)?.len();
    match (duplicates, unknown) {
        (0, 0) => Ok(None),
        (d, 0) => Ok(Some(format!("{d} duplicate trip_id rows"))),
        (0, u) => Ok(Some(format!(
            "{u} route ids referenced by trips are absent from routes.txt"
        ))),
        (d, u) => Ok(Some(format!(
            "{d} duplicate trip_id rows; {u} route ids referenced by trips are absent from routes.txt"
        ))),
    }
}

/// drop duplicate trips (keeping each trip_id's first occurrence) and
/// synthesize a routes row for every distinct missing route_id. synthesized
/// rows take the most frequent route_type (and agency_id, when that column
/// exists) of the existing table, and placeholder values in whichever name
/// columns are present.
pub(crate) fn fix(bundle: &FeedBundle) -> Result<Vec<(TableKind, FeedTable)>, RepairError> {
    let trips = bundle.require(TableKind::Trips)?;
    let routes = bundle.require(TableKind::Routes)?;
    let trip_column = required_column(trips, TableKind::Trips, "trip_id")?;
    let (deduped_trips, _) = dedupe_on_column(trips, trip_column);

    let missing = missing_route_ids(bundle, &deduped_trips)?;
    let mut route_rows = routes.rows().to_vec();
    if !missing.is_empty() {
        let route_column = required_column(routes, TableKind::Routes, "route_id")?;
        let type_column = required_column(routes, TableKind::Routes, "route_type")?;
        let route_type = most_frequent(routes, type_column).ok_or_else(|| {
            malformed(
                TableKind::Routes,
                String::from("no route_type values to infer a type for synthesized routes"),
            )
        })?;
        let agency_column = routes.column_index("agency_id");
        let agency_id = agency_column.and_then(|c| most_frequent(routes, c));
        let name_columns: Vec<(&str, usize)> = NAME_COLUMNS
            .iter()
            .filter_map(|name| routes.column_index(name).map(|c| (*name, c)))
            .collect();

        for (k, route_id) in missing.iter().enumerate() {
            let mut row = vec![FieldValue::Missing; routes.columns().len()];
            row[route_column] = route_id.clone();
            row[type_column] = route_type.clone();
            if let Some(c) = agency_column {
                row[c] = agency_id.clone().unwrap_or(FieldValue::Missing);
            }
            for (name, c) in &name_columns {
                row[*c] = FieldValue::Text(format!("{name}{k}"));
            }
            route_rows.push(row);
        }
    }

    Ok(vec![
        (TableKind::Trips, deduped_trips),
        (TableKind::Routes, routes.with_rows(route_rows)),
    ])
}

/// distinct route ids referenced by trips but not declared in routes, in
/// first-appearance order. missing cells are not treated as references.
fn missing_route_ids(
    bundle: &FeedBundle,
    trips: &FeedTable,
) -> Result<Vec<FieldValue>, RepairError> {
    let routes = bundle.require(TableKind::Routes)?;
    let trips_route_column = required_column(trips, TableKind::Trips, "route_id")?;
    let routes_route_column = required_column(routes, TableKind::Routes, "route_id")?;
    let known: HashSet<&FieldValue> = routes
        .rows()
        .iter()
        .map(|row| &row[routes_route_column])
        .collect();
    let mut seen: HashSet<FieldValue> = HashSet::new();
    let mut missing: Vec<FieldValue> = Vec::new();
    for row in trips.rows() {
        let route_id = &row[trips_route_column];
        if route_id.is_missing() || known.contains(route_id) {
            continue;
        }
        if seen.insert(route_id.clone()) {
            missing.push(route_id.clone());
        }
    }
    Ok(missing)
}
