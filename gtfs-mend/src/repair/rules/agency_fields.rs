use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;
use itertools::Itertools;

const KIND: TableKind = TableKind::Agency;
const REQUIRED_FIELDS: [&str; 3] = ["agency_name", "agency_url", "agency_timezone"];

/// fires when a required agency field is missing (as an empty cell or as a
/// wholly absent column) or when the raw rows carried inconsistent field
/// counts
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let agency = bundle.require(KIND)?;
    let absent = REQUIRED_FIELDS
        .iter()
        .filter(|field| !agency.has_column(field))
        .collect_vec();
    if !absent.is_empty() {
        return Ok(Some(format!(
            "agency.txt is missing required columns: {}",
            absent.iter().join(", ")
        )));
    }
    let incomplete = agency
        .rows()
        .iter()
        .filter(|row| {
            REQUIRED_FIELDS.iter().any(|field| {
                agency
                    .column_index(field)
                    .map(|c| row[c].is_missing())
                    .unwrap_or(false)
            })
        })
        .count();
    if incomplete > 0 {
        return Ok(Some(format!(
            "{incomplete} agency rows are missing required fields"
        )));
    }
    if agency.ragged() {
        return Ok(Some(String::from(
            "agency.txt rows carry inconsistent field counts",
        )));
    }
    Ok(None)
}

/// fill the missing required fields: the configured timezone and reference
/// url, and a unique placeholder name drawn from the shared counter
pub(crate) fn fix(bundle: &FeedBundle, ctx: &RepairContext) -> Result<FeedTable, RepairError> {
    let agency = bundle.require(KIND)?;
    let mut table = agency.clone();
    for field in REQUIRED_FIELDS {
        if !table.has_column(field) {
            table = table.with_column_appended(field, FieldValue::Missing);
        }
    }
    let name = table
        .column_index("agency_name")
        .ok_or_else(|| RepairError::OtherError(String::from("agency_name column vanished")))?;
    let url = table
        .column_index("agency_url")
        .ok_or_else(|| RepairError::OtherError(String::from("agency_url column vanished")))?;
    let timezone = table
        .column_index("agency_timezone")
        .ok_or_else(|| RepairError::OtherError(String::from("agency_timezone column vanished")))?;

    let mut rows = table.rows().to_vec();
    for row in rows.iter_mut() {
        if row[timezone].is_missing() {
            row[timezone] = FieldValue::Text(ctx.defaults.agency_timezone.clone());
        }
        if row[url].is_missing() {
            row[url] = FieldValue::Text(ctx.defaults.agency_url.clone());
        }
        if row[name].is_missing() {
            row[name] = FieldValue::Text(ctx.next_agency_name());
        }
    }
    Ok(table.with_rows(rows))
}

#[cfg(test)]
mod test {
    use super::{detect, fix};
    use crate::repair::repair_context::RepairContext;
    use crate::repair::rules::testing::bundle;
    use crate::repair::table_kind::TableKind;

    #[test]
    fn test_missing_fields_are_filled_with_defaults() {
        let bundle = bundle(&[(
            TableKind::Agency,
            "agency_name,agency_url,agency_timezone\n,,\nMetro,,America/New_York\n",
        )]);
        assert!(detect(&bundle).expect("should detect").is_some());
        let ctx = RepairContext::default();
        let fixed = fix(&bundle, &ctx).expect("should fix");
        assert_eq!(
            fixed.value(0, "agency_name").map(ToString::to_string),
            Some("Agency0".to_string())
        );
        assert_eq!(
            fixed.value(0, "agency_timezone").map(ToString::to_string),
            Some("America/Chicago".to_string())
        );
        assert_eq!(
            fixed.value(1, "agency_url").map(ToString::to_string),
            Some("https://developers.google.com/transit/gtfs/reference/".to_string())
        );
        assert_eq!(
            fixed.value(1, "agency_timezone").map(ToString::to_string),
            Some("America/New_York".to_string())
        );
    }

    #[test]
    fn test_placeholder_names_are_unique_across_rows() {
        let bundle = bundle(&[(
            TableKind::Agency,
            "agency_name,agency_url,agency_timezone\n,a.example,UTC\n,b.example,UTC\n",
        )]);
        let ctx = RepairContext::default();
        let fixed = fix(&bundle, &ctx).expect("should fix");
        assert_ne!(
            fixed.value(0, "agency_name"),
            fixed.value(1, "agency_name")
        );
    }

    #[test]
    fn test_absent_required_column_fires() {
        let bundle = bundle(&[(TableKind::Agency, "agency_name,agency_url\nMetro,m.example\n")]);
        let reason = detect(&bundle).expect("should detect").expect("should fire");
        assert!(reason.contains("agency_timezone"));
        let fixed = fix(&bundle, &RepairContext::default()).expect("should fix");
        assert_eq!(
            fixed.value(0, "agency_timezone").map(ToString::to_string),
            Some("America/Chicago".to_string())
        );
    }

    #[test]
    fn test_complete_agency_does_not_fire() {
        let bundle = bundle(&[(
            TableKind::Agency,
            "agency_name,agency_url,agency_timezone\nMetro,m.example,America/Denver\n",
        )]);
        assert_eq!(detect(&bundle).expect("should detect"), None);
    }

    #[test]
    fn test_ragged_rows_fire_and_settle_after_fix() {
        let bundle = bundle(&[(
            TableKind::Agency,
            "agency_name,agency_url,agency_timezone\nMetro,m.example,America/Denver,extra\n",
        )]);
        let reason = detect(&bundle).expect("should detect").expect("should fire");
        assert!(reason.contains("field counts"));
        let fixed = fix(&bundle, &RepairContext::default()).expect("should fix");
        assert!(!fixed.ragged());
    }
}
