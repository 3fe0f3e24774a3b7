use crate::repair::repair_error::RepairError;
use serde::{Deserialize, Serialize};

/// fill values and thresholds used by the repair rules. every field has a
/// default matching the reference corpus cleanup, and any of them can be
/// overridden from a TOML file via [`RepairDefaults::from_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairDefaults {
    /// timezone assigned to agencies that do not declare one
    #[serde(default = "default_agency_timezone")]
    pub agency_timezone: String,
    /// url assigned to agencies that do not declare one
    #[serde(default = "default_agency_url")]
    pub agency_url: String,
    /// service-day hour anchoring interpolation when a trip has no times at all
    #[serde(default = "default_anchor_hour")]
    pub anchor_hour: i64,
    /// assumed minutes between consecutive stops when interpolating
    #[serde(default = "default_stop_gap_minutes")]
    pub stop_gap_minutes: i64,
    /// calendar dates at or below this value are treated as unparseable
    /// placeholders and dropped
    #[serde(default = "default_date_sentinel")]
    pub date_sentinel: i64,
}

fn default_agency_timezone() -> String {
    String::from("America/Chicago")
}

fn default_agency_url() -> String {
    String::from("https://developers.google.com/transit/gtfs/reference/")
}

fn default_anchor_hour() -> i64 {
    8
}

fn default_stop_gap_minutes() -> i64 {
    5
}

fn default_date_sentinel() -> i64 {
    10000
}

impl Default for RepairDefaults {
    fn default() -> Self {
        RepairDefaults {
            agency_timezone: default_agency_timezone(),
            agency_url: default_agency_url(),
            anchor_hour: default_anchor_hour(),
            stop_gap_minutes: default_stop_gap_minutes(),
            date_sentinel: default_date_sentinel(),
        }
    }
}

impl RepairDefaults {
    pub fn from_file(filepath: &str) -> Result<RepairDefaults, RepairError> {
        let file = config::File::new(filepath, config::FileFormat::Toml);
        let defaults = config::Config::builder()
            .add_source(file)
            .build()?
            .try_deserialize::<RepairDefaults>()?;
        Ok(defaults)
    }
}
