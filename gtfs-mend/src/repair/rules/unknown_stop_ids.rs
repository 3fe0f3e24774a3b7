use super::required_column;
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;
use std::collections::HashSet;

/// fires when some, but not all, stop_times rows reference a stop_id that is
/// absent from stops.txt. a wholesale (100%) mismatch almost always means
/// the two tables disagree on the id type or encoding rather than carrying
/// genuinely invalid rows, and removing everything would destroy the table,
/// so that case never fires.
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let stop_times = bundle.require(TableKind::StopTimes)?;
    let unknown = unknown_row_count(bundle)?;
    if unknown > 0 && unknown < stop_times.len() {
        Ok(Some(format!(
            "{unknown} of {} stop_times rows reference stop ids absent from stops.txt",
            stop_times.len()
        )))
    } else {
        Ok(None)
    }
}

/// drop the stop_times rows whose stop_id is unknown
pub(crate) fn fix(bundle: &FeedBundle) -> Result<FeedTable, RepairError> {
    let stop_times = bundle.require(TableKind::StopTimes)?;
    let known = known_stop_ids(bundle)?;
    let id_column = required_column(stop_times, TableKind::StopTimes, "stop_id")?;
    let kept: Vec<Vec<FieldValue>> = stop_times
        .rows()
        .iter()
        .filter(|row| known.contains(&row[id_column]))
        .cloned()
        .collect();
    Ok(stop_times.with_rows(kept))
}

fn known_stop_ids(bundle: &FeedBundle) -> Result<HashSet<FieldValue>, RepairError> {
    let stops = bundle.require(TableKind::Stops)?;
    let id_column = required_column(stops, TableKind::Stops, "stop_id")?;
    Ok(stops
        .rows()
        .iter()
        .map(|row| row[id_column].clone())
        .collect())
}

fn unknown_row_count(bundle: &FeedBundle) -> Result<usize, RepairError> {
    let stop_times = bundle.require(TableKind::StopTimes)?;
    let known = known_stop_ids(bundle)?;
    let id_column = required_column(stop_times, TableKind::StopTimes, "stop_id")?;
    Ok(stop_times
        .rows()
        .iter()
        .filter(|row| !known.contains(&row[id_column]))
        .count())
}

#[cfg(test)]
mod test {
    use super::{detect, fix};
    use crate::repair::feed_table::FieldValue;
    use crate::repair::rules::testing::bundle;
    use crate::repair::table_kind::TableKind;

    const STOPS: &str = "stop_id,stop_name\nS1,First\nS2,Second\n";

    #[test]
    fn test_partial_mismatch_fires_and_removes_unmatched_rows() {
        let bundle = bundle(&[
            (TableKind::Stops, STOPS),
            (
                TableKind::StopTimes,
                "trip_id,stop_id,stop_sequence\nT1,S1,1\nT1,S9,2\nT1,S2,3\n",
            ),
        ]);
        let reason = detect(&bundle).expect("should detect");
        assert!(reason.is_some());

        let fixed = fix(&bundle).expect("should fix");
        assert_eq!(fixed.len(), 2);
        assert!(fixed
            .rows()
            .iter()
            .all(|row| row[1] != FieldValue::Text("S9".to_string())));
    }

    #[test]
    fn test_no_mismatch_does_not_fire() {
        let bundle = bundle(&[
            (TableKind::Stops, STOPS),
            (
                TableKind::StopTimes,
                "trip_id,stop_id,stop_sequence\nT1,S1,1\nT1,S2,2\n",
            ),
        ]);
        assert_eq!(detect(&bundle).expect("should detect"), None);
    }

    #[test]
    fn test_wholesale_mismatch_does_not_fire() {
        // integer stop ids in stop_times against text ids in stops: a type
        // mismatch, not invalid data
        let bundle = bundle(&[
            (TableKind::Stops, STOPS),
            (
                TableKind::StopTimes,
                "trip_id,stop_id,stop_sequence\nT1,101,1\nT1,102,2\n",
            ),
        ]);
        assert_eq!(detect(&bundle).expect("should detect"), None);
    }
}
