use super::{integer_cell, required_column};
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;

const KIND: TableKind = TableKind::CalendarDates;

/// fires when calendar_dates.txt (optional) carries sentinel date values:
/// a YYYYMMDD date at or below the sentinel threshold marks a row whose
/// date could not be produced and cannot be scheduled
pub(crate) fn detect(
    bundle: &FeedBundle,
    ctx: &RepairContext,
) -> Result<Option<String>, RepairError> {
    let Some(calendar_dates) = bundle.get(KIND) else {
        return Ok(None);
    };
    let column = required_column(calendar_dates, KIND, "date")?;
    let mut invalid = 0;
    for row in calendar_dates.rows() {
        if integer_cell(&row[column], KIND, "date")? <= ctx.defaults.date_sentinel {
            invalid += 1;
        }
    }
    if invalid > 0 {
        Ok(Some(format!(
            "{invalid} calendar_dates rows carry sentinel dates (<= {})",
            ctx.defaults.date_sentinel
        )))
    } else {
        Ok(None)
    }
}

/// drop the sentinel rows, keeping the date column integer-typed
pub(crate) fn fix(bundle: &FeedBundle, ctx: &RepairContext) -> Result<FeedTable, RepairError> {
    let calendar_dates = bundle.get(KIND).ok_or_else(|| {
        RepairError::OtherError(String::from("calendar_dates fixer ran without table"))
    })?;
    let column = required_column(calendar_dates, KIND, "date")?;
    let mut kept: Vec<Vec<FieldValue>> = Vec::with_capacity(calendar_dates.len());
    for row in calendar_dates.rows() {
        let date = integer_cell(&row[column], KIND, "date")?;
        if date > ctx.defaults.date_sentinel {
            let mut row = row.clone();
            row[column] = FieldValue::Integer(date);
            kept.push(row);
        }
    }
    Ok(calendar_dates.with_rows(kept))
}

#[cfg(test)]
mod test {
    use super::{detect, fix};
    use crate::repair::repair_context::RepairContext;
    use crate::repair::rules::testing::bundle;
    use crate::repair::table_kind::TableKind;

    #[test]
    fn test_sentinel_dates_are_dropped() {
        let bundle = bundle(&[(
            TableKind::CalendarDates,
            "service_id,date,exception_type\nWK,20240101,1\nWK,1,2\nSA,20240102,1\n",
        )]);
        let ctx = RepairContext::default();
        assert!(detect(&bundle, &ctx).expect("should detect").is_some());
        let fixed = fix(&bundle, &ctx).expect("should fix");
        assert_eq!(fixed.len(), 2);
        assert_eq!(
            fixed.value(1, "date").map(ToString::to_string),
            Some("20240102".to_string())
        );
    }

    #[test]
    fn test_valid_dates_do_not_fire() {
        let bundle = bundle(&[(
            TableKind::CalendarDates,
            "service_id,date,exception_type\nWK,20240101,1\n",
        )]);
        assert_eq!(
            detect(&bundle, &RepairContext::default()).expect("should detect"),
            None
        );
    }

    #[test]
    fn test_unparseable_date_is_fatal_for_the_rule() {
        let bundle = bundle(&[(
            TableKind::CalendarDates,
            "service_id,date,exception_type\nWK,January,1\n",
        )]);
        assert!(detect(&bundle, &RepairContext::default()).is_err());
    }
}
