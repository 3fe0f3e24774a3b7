use crate::repair::feed_table::FeedTable;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::FeedBundle;
use crate::repair::table_kind::TableKind;

const KIND: TableKind = TableKind::Pathways;

/// fires when pathways.txt (optional) names its mode column `pathway_mode`
/// without also carrying `pathway_type`, the name some trip planners
/// require
pub(crate) fn detect(bundle: &FeedBundle) -> Result<Option<String>, RepairError> {
    let Some(pathways) = bundle.get(KIND) else {
        return Ok(None);
    };
    if pathways.has_column("pathway_mode") && !pathways.has_column("pathway_type") {
        Ok(Some(String::from(
            "pathways.txt names its mode column pathway_mode",
        )))
    } else {
        Ok(None)
    }
}

/// rename the column; values are untouched
pub(crate) fn fix(bundle: &FeedBundle) -> Result<FeedTable, RepairError> {
    let pathways = bundle
        .get(KIND)
        .ok_or_else(|| RepairError::OtherError(String::from("pathways fixer ran without table")))?;
    Ok(pathways.with_column_renamed("pathway_mode", "pathway_type"))
}
