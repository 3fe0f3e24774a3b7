use super::{dedupe_on_column, required_column};
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;
use std::collections::HashSet;

const KIND: TableKind = TableKind::Routes;

/// fires when routes.txt repeats a route_id
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let routes = bundle.require(KIND)?;
    let column = required_column(routes, KIND, "route_id")?;
    let distinct: HashSet<&FieldValue> = routes.rows().iter().map(|row| &row[column]).collect();
    let duplicates = routes.len() - distinct.len();
    if duplicates > 0 {
        Ok(Some(format!("{duplicates} duplicate route_id rows")))
    } else {
        Ok(None)
    }
}

/// keep the first occurrence of each route_id
pub(crate) fn fix(bundle: &FeedBundle) -> Result<FeedTable, RepairError> {
    let routes = bundle.require(KIND)?;
    let column = required_column(routes, KIND, "route_id")?;
    let (deduped, _) = dedupe_on_column(routes, column);
    Ok(deduped)
}
