use crate::repair::feed_table::FeedTable;
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use crate::repair::rules;
use crate::repair::table_kind::TableKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

/// the tables of one archive, parsed on demand for a repair round and
/// discarded when the round completes.
#[derive(Debug, Default)]
pub struct FeedBundle {
    tables: HashMap<TableKind, FeedTable>,
}

impl FeedBundle {
    pub fn insert(&mut self, kind: TableKind, table: FeedTable) {
        self.tables.entry(kind).or_insert(table);
    }

    /// swap in a fixer's corrected table so later detectors observe it
    pub fn replace(&mut self, kind: TableKind, table: FeedTable) {
        self.tables.insert(kind, table);
    }

    pub fn get(&self, kind: TableKind) -> Option<&FeedTable> {
        self.tables.get(&kind)
    }

    pub fn require(&self, kind: TableKind) -> Result<&FeedTable, RepairError> {
        self.tables
            .get(&kind)
            .ok_or_else(|| RepairError::MissingRequiredFileError(kind.member_name().to_string()))
    }
}

/// one anomaly class and its deterministic fix. detectors are pure
/// predicates over the bundle; fixers are pure and idempotent, so applying
/// a fixer to its own output changes nothing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepairRule {
    UnknownStopIds,
    FinalStopTime,
    TransferTypeDefault,
    AgencyRequiredFields,
    TripRouteLinks,
    CalendarDateSentinel,
    DuplicateRoutes,
    PathwayTypeColumn,
}

impl RepairRule {
    /// the fixed application order. later detectors depend on earlier
    /// fixers' output, so this order is part of the contract: in particular
    /// unknown stop ids must be filtered before stop time interpolation.
    pub const CATALOGUE: [RepairRule; 8] = [
        RepairRule::UnknownStopIds,
        RepairRule::FinalStopTime,
        RepairRule::TransferTypeDefault,
        RepairRule::AgencyRequiredFields,
        RepairRule::TripRouteLinks,
        RepairRule::CalendarDateSentinel,
        RepairRule::DuplicateRoutes,
        RepairRule::PathwayTypeColumn,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RepairRule::UnknownStopIds => "unknown_stop_ids",
            RepairRule::FinalStopTime => "final_stop_time",
            RepairRule::TransferTypeDefault => "transfer_type_default",
            RepairRule::AgencyRequiredFields => "agency_required_fields",
            RepairRule::TripRouteLinks => "trip_route_links",
            RepairRule::CalendarDateSentinel => "calendar_date_sentinel",
            RepairRule::DuplicateRoutes => "duplicate_routes",
            RepairRule::PathwayTypeColumn => "pathway_type_column",
        }
    }

    /// evaluate this rule's detector against the bundle. a `Some` result
    /// carries the human-readable reason recorded on the repair outcome;
    /// rules over optional tables return `None` when the table is absent.
    pub fn detect(
        &self,
        bundle: &FeedBundle,
        ctx: &RepairContext,
    ) -> Result<Option<String>, RepairError> {
        match self {
            RepairRule::UnknownStopIds => rules::unknown_stop_ids::detect(bundle),
            RepairRule::FinalStopTime => rules::final_stop_time::detect(bundle),
            RepairRule::TransferTypeDefault => rules::transfer_type::detect(bundle),
            RepairRule::AgencyRequiredFields => rules::agency_fields::detect(bundle),
            RepairRule::TripRouteLinks => rules::trip_route_links::detect(bundle),
            RepairRule::CalendarDateSentinel => rules::calendar_dates::detect(bundle, ctx),
            RepairRule::DuplicateRoutes => rules::duplicate_routes::detect(bundle),
            RepairRule::PathwayTypeColumn => rules::pathway_type::detect(bundle),
        }
    }

    /// run this rule's fixer, returning the corrected table(s) to persist.
    /// only called after [`RepairRule::detect`] reported an anomaly.
    pub fn fix(
        &self,
        bundle: &FeedBundle,
        ctx: &RepairContext,
    ) -> Result<Vec<(TableKind, FeedTable)>, RepairError> {
        match self {
            RepairRule::UnknownStopIds => {
                let fixed = rules::unknown_stop_ids::fix(bundle)?;
                Ok(vec![(TableKind::StopTimes, fixed)])
            }
            RepairRule::FinalStopTime => {
                let fixed = rules::final_stop_time::fix(bundle, ctx)?;
                Ok(vec![(TableKind::StopTimes, fixed)])
            }
            RepairRule::TransferTypeDefault => {
                let fixed = rules::transfer_type::fix(bundle)?;
                Ok(vec![(TableKind::Transfers, fixed)])
            }
            RepairRule::AgencyRequiredFields => {
                let fixed = rules::agency_fields::fix(bundle, ctx)?;
                Ok(vec![(TableKind::Agency, fixed)])
            }
            RepairRule::TripRouteLinks => rules::trip_route_links::fix(bundle),
            RepairRule::CalendarDateSentinel => {
                let fixed = rules::calendar_dates::fix(bundle, ctx)?;
                Ok(vec![(TableKind::CalendarDates, fixed)])
            }
            RepairRule::DuplicateRoutes => {
                let fixed = rules::duplicate_routes::fix(bundle)?;
                Ok(vec![(TableKind::Routes, fixed)])
            }
            RepairRule::PathwayTypeColumn => {
                let fixed = rules::pathway_type::fix(bundle)?;
                Ok(vec![(TableKind::Pathways, fixed)])
            }
        }
    }
}

impl Display for RepairRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}
