use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// the set of GTFS tables this tool knows how to inspect and repair.
/// member dispatch during archive rewrites is keyed on this enum rather
/// than on raw filename strings so the rule catalogue stays exhaustive.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Stops,
    StopTimes,
    Agency,
    Trips,
    Routes,
    Transfers,
    CalendarDates,
    Pathways,
}

impl TableKind {
    /// tables that must exist for an archive to be processable
    pub const REQUIRED: [TableKind; 5] = [
        TableKind::Stops,
        TableKind::StopTimes,
        TableKind::Agency,
        TableKind::Trips,
        TableKind::Routes,
    ];

    pub fn member_name(&self) -> &'static str {
        match self {
            TableKind::Stops => "stops.txt",
            TableKind::StopTimes => "stop_times.txt",
            TableKind::Agency => "agency.txt",
            TableKind::Trips => "trips.txt",
            TableKind::Routes => "routes.txt",
            TableKind::Transfers => "transfers.txt",
            TableKind::CalendarDates => "calendar_dates.txt",
            TableKind::Pathways => "pathways.txt",
        }
    }

    pub fn from_member_name(name: &str) -> Option<TableKind> {
        match name {
            "stops.txt" => Some(TableKind::Stops),
            "stop_times.txt" => Some(TableKind::StopTimes),
            "agency.txt" => Some(TableKind::Agency),
            "trips.txt" => Some(TableKind::Trips),
            "routes.txt" => Some(TableKind::Routes),
            "transfers.txt" => Some(TableKind::Transfers),
            "calendar_dates.txt" => Some(TableKind::CalendarDates),
            "pathways.txt" => Some(TableKind::Pathways),
            _ => None,
        }
    }
}

impl Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.member_name())
    }
}
