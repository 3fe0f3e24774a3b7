use super::{integer_cell, malformed, required_column};
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::service_time::ServiceTime;
use crate::repair::table_kind::TableKind;
use chrono::Duration;
use std::collections::HashMap;

const KIND: TableKind = TableKind::StopTimes;

/// fires when, after cross-filling arrival and departure times where only
/// one side is present, the highest-stop_sequence row of some trip still has
/// no time. trip planners reject trips whose final stop is un-timed.
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let stop_times = bundle.require(KIND)?;
    let columns = StopTimeColumns::resolve(stop_times)?;
    let rows = cross_filled_rows(stop_times, &columns);
    let deficient = deficient_trips(&rows, &columns)?.len();
    if deficient > 0 {
        Ok(Some(format!(
            "{deficient} trips have no time at their final stop"
        )))
    } else {
        Ok(None)
    }
}

/// extrapolate a time for each trip's final stop from the trip's known
/// times, and persist the cross-filled arrival/departure columns.
///
/// per trip with n rows, ordered by stop_sequence:
/// - no known times: anchor hour + gap x n
/// - one known time t at sequence s: t + gap x (n - s)
/// - two or more: the per-stop rate from the last two known times,
///   extrapolated from the last known sequence
pub(crate) fn fix(bundle: &FeedBundle, ctx: &RepairContext) -> Result<FeedTable, RepairError> {
    let stop_times = bundle.require(KIND)?;
    let columns = StopTimeColumns::resolve(stop_times)?;
    let mut rows = cross_filled_rows(stop_times, &columns);
    let gap = ctx.defaults.stop_gap_minutes;

    for group in deficient_trips(&rows, &columns)? {
        let n = group.len() as i64;
        let mut known: Vec<(i64, ServiceTime)> = Vec::with_capacity(group.len());
        for (row_index, sequence) in &group {
            let value = &rows[*row_index][columns.arrival];
            if !value.is_missing() {
                known.push((*sequence, service_time(value)?));
            }
        }
        let fill = match known.as_slice() {
            [] => {
                let anchor = ServiceTime::from_hms(ctx.defaults.anchor_hour, 0, 0);
                anchor.offset(Duration::minutes(gap * n))
            }
            [(sequence, time)] => time.offset(Duration::minutes(gap * (n - sequence))),
            [.., (prev_sequence, prev_time), (last_sequence, last_time)] => {
                if last_sequence == prev_sequence {
                    return Err(malformed(
                        KIND,
                        format!("trip rows repeat stop_sequence {last_sequence}"),
                    ));
                }
                let rate = (last_time.seconds() - prev_time.seconds()) as f64
                    / (last_sequence - prev_sequence) as f64;
                let offset = (rate * (n - last_sequence) as f64).round() as i64;
                last_time.offset(Duration::seconds(offset))
            }
        }
        .map_err(|msg| malformed(KIND, msg))?;

        let (final_row, _) = group[group.len() - 1];
        rows[final_row][columns.arrival] = FieldValue::Text(fill.to_string());
        rows[final_row][columns.departure] = FieldValue::Text(fill.to_string());
    }

    Ok(stop_times.with_rows(rows))
}

struct StopTimeColumns {
    trip: usize,
    sequence: usize,
    arrival: usize,
    departure: usize,
}

impl StopTimeColumns {
    fn resolve(table: &FeedTable) -> Result<StopTimeColumns, RepairError> {
        Ok(StopTimeColumns {
            trip: required_column(table, KIND, "trip_id")?,
            sequence: required_column(table, KIND, "stop_sequence")?,
            arrival: required_column(table, KIND, "arrival_time")?,
            departure: required_column(table, KIND, "departure_time")?,
        })
    }
}

/// copy the one-sided time onto the missing side, leaving rows with both or
/// neither untouched
fn cross_filled_rows(table: &FeedTable, columns: &StopTimeColumns) -> Vec<Vec<FieldValue>> {
    let mut rows = table.rows().to_vec();
    for row in rows.iter_mut() {
        let arrival = row[columns.arrival].clone();
        let departure = row[columns.departure].clone();
        match (arrival.is_missing(), departure.is_missing()) {
            (true, false) => row[columns.arrival] = departure,
            (false, true) => row[columns.departure] = arrival,
            _ => {}
        }
    }
    rows
}

/// group row indices by trip in first-appearance order, each group sorted by
/// stop_sequence, retaining only trips whose final row has no arrival time
fn deficient_trips(
    rows: &[Vec<FieldValue>],
    columns: &StopTimeColumns,
) -> Result<Vec<Vec<(usize, i64)>>, RepairError> {
    let mut groups: Vec<Vec<(usize, i64)>> = Vec::new();
    let mut positions: HashMap<FieldValue, usize> = HashMap::new();
    for (row_index, row) in rows.iter().enumerate() {
        let sequence = integer_cell(&row[columns.sequence], KIND, "stop_sequence")?;
        let trip = &row[columns.trip];
        match positions.get(trip) {
            Some(i) => groups[*i].push((row_index, sequence)),
            None => {
                positions.insert(trip.clone(), groups.len());
                groups.push(vec![(row_index, sequence)]);
            }
        }
    }
    for group in groups.iter_mut() {
        group.sort_by_key(|(_, sequence)| *sequence);
    }
    groups.retain(|group| {
        let (final_row, _) = group[group.len() - 1];
        rows[final_row][columns.arrival].is_missing()
    });
    Ok(groups)
}

fn service_time(value: &FieldValue) -> Result<ServiceTime, RepairError> {
    match value.as_text() {
        Some(text) => ServiceTime::parse(text).map_err(|msg| malformed(KIND, msg)),
        None => Err(malformed(
            KIND,
            format!("cannot interpret '{value}' as a GTFS time"),
        )),
    }
}
