use crate::repair::archive_ops;
use crate::repair::feed_table::{FeedTable, FieldValue};
use crate::repair::outcome::{ArchiveReport, RepairStatus, RuleApplication};
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use crate::repair::rule::{FeedBundle, RepairRule};
use crate::repair::table_kind::TableKind;
use itertools::Itertools;
use kdam::{Bar, BarExt};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// idempotent fixers settle in two rounds; the cap is a backstop against a
/// fixer that re-triggers its own detector
const MAX_REPAIR_ROUNDS: usize = 4;

/// drive one archive to its repaired fixed point.
///
/// each round re-reads the tables from storage, evaluates the rule
/// catalogue in order against the in-memory bundle (handing every fixer's
/// output to the detectors behind it), and persists the round's corrected
/// tables in a single archive rewrite. convergence is the round that
/// detects nothing. a rule failure stops this archive only: fixes already
/// persisted by earlier rounds stay on storage.
pub fn repair_archive(path: &Path, ctx: &RepairContext) -> Result<ArchiveReport, RepairError> {
    let names = archive_ops::list_members(path)?;
    precheck_required_members(&names)?;

    let normalizations = archive_ops::normalize_archive(path)?;
    let names = archive_ops::list_members(path)?;
    validate_required_members(&names)?;

    let mut applications: Vec<RuleApplication> = Vec::new();
    let mut rounds = 0;
    while rounds < MAX_REPAIR_ROUNDS {
        rounds += 1;
        let mut bundle = archive_ops::read_tables(path)?;
        let mut overrides: HashMap<TableKind, FeedTable> = HashMap::new();
        for rule in RepairRule::CATALOGUE {
            match rule.detect(&bundle, ctx)? {
                None => applications.push(RuleApplication::skipped(rule, rounds)),
                Some(reason) => {
                    log::info!("{}: {rule} fired: {reason}", path.display());
                    for (kind, table) in rule.fix(&bundle, ctx)? {
                        bundle.replace(kind, table.clone());
                        overrides.insert(kind, table);
                    }
                    applications.push(RuleApplication::applied(rule, rounds, reason));
                }
            }
        }
        if overrides.is_empty() {
            return Ok(ArchiveReport {
                archive: path.display().to_string(),
                status: RepairStatus::Converged,
                rounds,
                normalizations,
                applications,
                advisory: location_type_advisory(&bundle),
                error: None,
            });
        }
        archive_ops::rewrite_archive(path, &overrides)?;
    }
    Ok(ArchiveReport {
        archive: path.display().to_string(),
        status: RepairStatus::Failed,
        rounds,
        normalizations,
        applications,
        advisory: None,
        error: Some(format!(
            "did not reach a fixed point after {MAX_REPAIR_ROUNDS} rounds"
        )),
    })
}

/// repair every `.zip` archive under the directory, in name order.
/// failures are scoped to their archive: the loop continues and the
/// failure is carried on that archive's report.
pub fn repair_corpus(
    directory: &Path,
    ctx: &RepairContext,
    parallelism: usize,
) -> Result<Vec<ArchiveReport>, RepairError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(directory)
        .map_err(|e| {
            RepairError::OtherError(format!(
                "failed listing corpus directory '{}': {e}",
                directory.display()
            ))
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("zip"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    log::info!(
        "repairing {} GTFS archives in '{}'",
        paths.len(),
        directory.display()
    );

    let bar = Mutex::new(
        Bar::builder()
            .total(paths.len())
            .desc("repairing archives")
            .build()
            .map_err(RepairError::OtherError)?,
    );
    let run = |path: &PathBuf| -> ArchiveReport {
        let report = match repair_archive(path, ctx) {
            Ok(report) => report,
            Err(e) => {
                log::error!("{}: {e}", path.display());
                ArchiveReport::failed(path, &e)
            }
        };
        log::info!("{report}");
        if let Ok(mut bar) = bar.lock() {
            let _ = bar.update(1);
        }
        report
    };

    let reports: Vec<ArchiveReport> = if parallelism > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| RepairError::OtherError(format!("failed building worker pool: {e}")))?;
        pool.install(|| paths.par_iter().map(run).collect())
    } else {
        paths.iter().map(run).collect()
    };

    for report in reports.iter() {
        if let Some(advisory) = &report.advisory {
            log::warn!("{}: unresolved risk: {advisory}", report.archive);
        }
    }
    Ok(reports)
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    archive: &'a str,
    status: RepairStatus,
    rounds: usize,
    fixes: usize,
    rules: String,
    advisory: &'a str,
    error: &'a str,
}

/// write the per-archive repair summary CSV for the corpus run
pub fn write_summary(reports: &[ArchiveReport], path: &Path) -> Result<(), RepairError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        RepairError::OtherError(format!(
            "failed creating summary file '{}': {e}",
            path.display()
        ))
    })?;
    for report in reports {
        let row = SummaryRow {
            archive: &report.archive,
            status: report.status,
            rounds: report.rounds,
            fixes: report.fixes_applied(),
            rules: report.fired_rules().join(";"),
            advisory: report.advisory.as_deref().unwrap_or_default(),
            error: report.error.as_deref().unwrap_or_default(),
        };
        writer
            .serialize(row)
            .map_err(|e| RepairError::OtherError(format!("failed writing summary row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| RepairError::OtherError(format!("failed flushing summary file: {e}")))
}

/// archives whose first member is itself a zip defer the member check to
/// post-normalization; otherwise required tables must at least appear
/// somewhere in the listing (possibly under a directory prefix)
fn precheck_required_members(names: &[String]) -> Result<(), RepairError> {
    let nested = names
        .first()
        .map(|n| n.to_ascii_lowercase().ends_with(".zip"))
        .unwrap_or(false);
    if nested {
        return Ok(());
    }
    for kind in TableKind::REQUIRED {
        if !names.iter().any(|n| n.contains(kind.member_name())) {
            return Err(RepairError::MissingRequiredFileError(
                kind.member_name().to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_required_members(names: &[String]) -> Result<(), RepairError> {
    for kind in TableKind::REQUIRED {
        if !names.iter().any(|n| n == kind.member_name()) {
            return Err(RepairError::MissingRequiredFileError(
                kind.member_name().to_string(),
            ));
        }
    }
    Ok(())
}

/// the advisory condition surfaced after convergence: non-zero
/// location_type values inside stop_times are known to break some trip
/// planner builds, and are reported rather than repaired
fn location_type_advisory(bundle: &FeedBundle) -> Option<String> {
    let stop_times = bundle.get(TableKind::StopTimes)?;
    let column = stop_times.column_index("location_type")?;
    let nonzero: Vec<String> = stop_times
        .rows()
        .iter()
        .map(|row| &row[column])
        .filter(|value| !matches!(value, FieldValue::Integer(0) | FieldValue::Missing))
        .map(ToString::to_string)
        .unique()
        .collect();
    if nonzero.is_empty() {
        None
    } else {
        Some(format!(
            "stop_times.txt carries location_type values [{}] that may break downstream trip planners",
            nonzero.join(", ")
        ))
    }
}

#[cfg(test)]
mod test {
    use super::{repair_archive, repair_corpus};
    use crate::repair::archive_ops::read_tables;
    use crate::repair::outcome::RepairStatus;
    use crate::repair::repair_context::RepairContext;
    use crate::repair::table_kind::TableKind;
    use std::fs::File;
    use std::io::{Read, Write};
    use std::path::{Path, PathBuf};
    use zip::write::SimpleFileOptions;
    use zip::{ZipArchive, ZipWriter};

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).expect("should create zip");
        let mut writer = ZipWriter::new(file);
        for (name, text) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("should start member");
            writer
                .write_all(text.as_bytes())
                .expect("should write member");
        }
        writer.finish().expect("should finish zip");
    }

    fn member_bytes(path: &Path, name: &str) -> Vec<u8> {
        let file = File::open(path).expect("should open zip");
        let mut archive = ZipArchive::new(file).expect("should read zip");
        let mut member = archive.by_name(name).expect("member should exist");
        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes).expect("should read member");
        bytes
    }

    /// an archive exhibiting every anomaly class in the catalogue
    fn broken_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("broken.zip");
        write_zip(
            &path,
            &[
                ("stops.txt", "stop_id,stop_name\nS1,First\nS2,Second\n"),
                (
                    "stop_times.txt",
                    "trip_id,stop_sequence,arrival_time,departure_time,stop_id\n\
                     T1,1,08:00:00,08:00:00,S1\n\
                     T1,2,08:05:00,08:05:00,S9\n\
                     T1,3,,,S2\n",
                ),
                (
                    "agency.txt",
                    "agency_name,agency_url,agency_timezone\nMetro,,\n",
                ),
                (
                    "trips.txt",
                    "route_id,service_id,trip_id\nR1,WK,T1\nR1,WK,T1\nR2,WK,T2\n",
                ),
                ("routes.txt", "route_id,route_type\nR1,3\nR1,3\n"),
                (
                    "calendar_dates.txt",
                    "service_id,date,exception_type\nWK,20240101,1\nWK,1,2\n",
                ),
                (
                    "transfers.txt",
                    "from_stop_id,to_stop_id,transfer_type\nS1,S2,\n",
                ),
                ("pathways.txt", "pathway_id,pathway_mode\nP1,1\n"),
            ],
        );
        path
    }

    fn clean_fixture(dir: &Path, filename: &str) -> PathBuf {
        let path = dir.join(filename);
        write_zip(
            &path,
            &[
                ("stops.txt", "stop_id,stop_name\nS1,First\nS2,Second\n"),
                (
                    "stop_times.txt",
                    "trip_id,stop_sequence,arrival_time,departure_time,stop_id\n\
                     T1,1,08:00:00,08:00:00,S1\n\
                     T1,2,08:05:00,08:05:00,S2\n",
                ),
                (
                    "agency.txt",
                    "agency_name,agency_url,agency_timezone\nMetro,m.example,America/Denver\n",
                ),
                ("trips.txt", "route_id,service_id,trip_id\nR1,WK,T1\n"),
                ("routes.txt", "route_id,route_type\nR1,3\n"),
            ],
        );
        path
    }

    #[test]
    fn test_broken_archive_converges_with_all_rules_fired() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = broken_fixture(dir.path());
        let ctx = RepairContext::default();

        let report = repair_archive(&path, &ctx).expect("should repair");
        assert_eq!(report.status, RepairStatus::Converged);
        assert_eq!(report.fixes_applied(), 8);
        assert_eq!(report.rounds, 2);

        let bundle = read_tables(&path).expect("should read repaired tables");
        let stop_times = bundle.get(TableKind::StopTimes).expect("stop_times");
        assert_eq!(stop_times.len(), 2);
        assert_eq!(
            stop_times.value(1, "arrival_time").map(ToString::to_string),
            Some("08:05:00".to_string())
        );

        let trips = bundle.get(TableKind::Trips).expect("trips");
        assert_eq!(trips.len(), 2);

        let routes = bundle.get(TableKind::Routes).expect("routes");
        assert_eq!(routes.len(), 2);
        assert_eq!(
            routes.value(1, "route_id").map(ToString::to_string),
            Some("R2".to_string())
        );

        let agency = bundle.get(TableKind::Agency).expect("agency");
        assert_eq!(
            agency.value(0, "agency_timezone").map(ToString::to_string),
            Some("America/Chicago".to_string())
        );

        let calendar_dates = bundle.get(TableKind::CalendarDates).expect("calendar_dates");
        assert_eq!(calendar_dates.len(), 1);

        let pathways = bundle.get(TableKind::Pathways).expect("pathways");
        assert!(pathways.has_column("pathway_type"));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = broken_fixture(dir.path());
        let ctx = RepairContext::default();

        repair_archive(&path, &ctx).expect("should repair");
        let members = [
            "stops.txt",
            "stop_times.txt",
            "agency.txt",
            "trips.txt",
            "routes.txt",
            "calendar_dates.txt",
            "transfers.txt",
            "pathways.txt",
        ];
        let before: Vec<Vec<u8>> = members.iter().map(|m| member_bytes(&path, m)).collect();

        let report = repair_archive(&path, &ctx).expect("should repair again");
        assert_eq!(report.status, RepairStatus::Converged);
        assert_eq!(report.fixes_applied(), 0);
        assert_eq!(report.rounds, 1);
        let after: Vec<Vec<u8>> = members.iter().map(|m| member_bytes(&path, m)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_clean_archive_reports_zero_fixes() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = clean_fixture(dir.path(), "clean.zip");
        let report =
            repair_archive(&path, &RepairContext::default()).expect("should repair");
        assert_eq!(report.status, RepairStatus::Converged);
        assert_eq!(report.fixes_applied(), 0);
        assert_eq!(report.advisory, None);
    }

    #[test]
    fn test_missing_required_member_fails_the_archive() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = dir.path().join("incomplete.zip");
        write_zip(&path, &[("stops.txt", "stop_id\nS1\n")]);
        assert!(repair_archive(&path, &RepairContext::default()).is_err());
    }

    #[test]
    fn test_location_type_in_stop_times_is_surfaced_not_fixed() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let path = dir.path().join("advisory.zip");
        write_zip(
            &path,
            &[
                ("stops.txt", "stop_id,stop_name\nS1,First\nS2,Second\n"),
                (
                    "stop_times.txt",
                    "trip_id,stop_sequence,arrival_time,departure_time,stop_id,location_type\n\
                     T1,1,08:00:00,08:00:00,S1,0\n\
                     T1,2,08:05:00,08:05:00,S2,1\n",
                ),
                (
                    "agency.txt",
                    "agency_name,agency_url,agency_timezone\nMetro,m.example,America/Denver\n",
                ),
                ("trips.txt", "route_id,service_id,trip_id\nR1,WK,T1\n"),
                ("routes.txt", "route_id,route_type\nR1,3\n"),
            ],
        );
        let report =
            repair_archive(&path, &RepairContext::default()).expect("should repair");
        assert_eq!(report.status, RepairStatus::Converged);
        let advisory = report.advisory.expect("should carry advisory");
        assert!(advisory.contains("location_type"));
        assert!(advisory.contains('1'));
    }

    #[test]
    fn test_corpus_continues_past_failed_archives() {
        let dir = tempfile::tempdir().expect("should create tempdir");
        let bad = dir.path().join("bad.zip");
        write_zip(&bad, &[("stops.txt", "stop_id\nS1\n")]);
        clean_fixture(dir.path(), "good.zip");

        let ctx = RepairContext::default();
        let reports = repair_corpus(dir.path(), &ctx, 1).expect("should run corpus");
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].status, RepairStatus::Failed);
        assert!(reports[0].error.is_some());
        assert_eq!(reports[1].status, RepairStatus::Converged);
    }
}
