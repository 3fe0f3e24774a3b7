use super::integer_cell;
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;

const KIND: TableKind = TableKind::Transfers;
const TRANSFER_TYPE: &str = "transfer_type";

/// fires when transfers.txt (optional) has rows without a transfer_type, or
/// lacks the column entirely
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let Some(transfers) = bundle.get(KIND) else {
        return Ok(None);
    };
    let Some(column) = transfers.column_index(TRANSFER_TYPE) else {
        return Ok(Some(String::from(
            "transfers.txt has no transfer_type column",
        )));
    };
    let missing = transfers
        .rows()
        .iter()
        .filter(|row| row[column].is_missing())
        .count();
    if missing > 0 {
        Ok(Some(format!(
            "{missing} transfers rows have no transfer_type"
        )))
    } else {
        Ok(None)
    }
}

/// default missing transfer_type values to 0 (recommended transfer point)
/// and cast the whole column to integers
pub(crate) fn fix(bundle: &FeedBundle) -> Result<FeedTable, RepairError> {
    let transfers = bundle
        .get(KIND)
        .ok_or_else(|| RepairError::OtherError(String::from("transfers fixer ran without table")))?;
    let table = if transfers.has_column(TRANSFER_TYPE) {
        transfers.clone()
    } else {
        transfers.with_column_appended(TRANSFER_TYPE, FieldValue::Integer(0))
    };
    let column = table
        .column_index(TRANSFER_TYPE)
        .ok_or_else(|| RepairError::OtherError(String::from("transfer_type column vanished")))?;
    let mut rows = table.rows().to_vec();
    for row in rows.iter_mut() {
        row[column] = match &row[column] {
            FieldValue::Missing => FieldValue::Integer(0),
            value => FieldValue::Integer(integer_cell(value, KIND, TRANSFER_TYPE)?),
        };
    }
    Ok(table.with_rows(rows))
}

#[cfg(test)]
mod test {
    use super::{detect, fix};
    use crate::repair::feed_table::FieldValue;
    use crate::repair::rules::testing::bundle;
    use crate::repair::table_kind::TableKind;

    #[test]
    fn test_missing_transfer_type_defaults_to_integer_zero() {
        let bundle = bundle(&[(
            TableKind::Transfers,
            "from_stop_id,to_stop_id,transfer_type\nS1,S2,\nS2,S3,2\n",
        )]);
        assert!(detect(&bundle).expect("should detect").is_some());
        let fixed = fix(&bundle).expect("should fix");
        assert_eq!(fixed.value(0, "transfer_type"), Some(&FieldValue::Integer(0)));
        assert_eq!(fixed.value(1, "transfer_type"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_absent_table_is_skipped() {
        let bundle = bundle(&[]);
        assert_eq!(detect(&bundle).expect("should detect"), None);
    }

    #[test]
    fn test_complete_column_does_not_fire() {
        let bundle = bundle(&[(
            TableKind::Transfers,
            "from_stop_id,to_stop_id,transfer_type\nS1,S2,0\n",
        )]);
        assert_eq!(detect(&bundle).expect("should detect"), None);
    }

    #[test]
    fn test_absent_column_is_created() {
        let bundle = bundle(&[(TableKind::Transfers, "from_stop_id,to_stop_id\nS1,S2\n")]);
        assert!(detect(&bundle).expect("should detect").is_some());
        let fixed = fix(&bundle).expect("should fix");
        assert_eq!(fixed.value(0, "transfer_type"), Some(&FieldValue::Integer(0)));
    }
}
