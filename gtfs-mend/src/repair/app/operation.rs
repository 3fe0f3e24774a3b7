//! GTFS archive repair operations. archives are corrected in place: every
//! known anomaly class is detected and deterministically fixed, and
//! conditions this tool will not fix are surfaced as warnings.
use crate::repair::corpus_ops;
use crate::repair::repair_config::RepairDefaults;
use crate::repair::repair_context::RepairContext;
use crate::repair::repair_error::RepairError;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum RepairOperation {
    /// repair every GTFS archive in a directory, in place
    Corpus {
        /// directory containing GTFS .zip archives
        #[arg(long)]
        input_directory: String,
        /// archives repaired concurrently
        #[arg(long, default_value_t = 1)]
        parallelism: usize,
        /// per-archive repair summary written at the end of the run
        #[arg(long, default_value_t = String::from("repair_summary.csv"))]
        summary_file: String,
        /// TOML file overriding the built-in repair defaults
        #[arg(long)]
        defaults_file: Option<String>,
    },
    /// repair a single GTFS archive, in place
    Archive {
        /// path to a GTFS .zip archive
        #[arg(long)]
        input: String,
        /// TOML file overriding the built-in repair defaults
        #[arg(long)]
        defaults_file: Option<String>,
    },
}

impl RepairOperation {
    pub fn run(&self) {
        match self {
            RepairOperation::Corpus {
                input_directory,
                parallelism,
                summary_file,
                defaults_file,
            } => {
                let defaults =
                    load_defaults(defaults_file.as_deref()).expect("failed reading repair defaults");
                let ctx = RepairContext::new(defaults);
                let reports =
                    corpus_ops::repair_corpus(Path::new(input_directory), &ctx, *parallelism)
                        .unwrap_or_else(|e| {
                            panic!("failed repairing GTFS corpus in {input_directory}: {e}")
                        });
                corpus_ops::write_summary(&reports, Path::new(summary_file))
                    .expect("failed writing repair summary");
                let failed = reports
                    .iter()
                    .filter(|r| r.error.is_some())
                    .count();
                log::info!(
                    "finished: {} archives repaired, {} failed, summary in '{}'",
                    reports.len() - failed,
                    failed,
                    summary_file
                );
            }
            RepairOperation::Archive {
                input,
                defaults_file,
            } => {
                let defaults =
                    load_defaults(defaults_file.as_deref()).expect("failed reading repair defaults");
                let ctx = RepairContext::new(defaults);
                let report = corpus_ops::repair_archive(Path::new(input), &ctx)
                    .unwrap_or_else(|e| panic!("failed repairing GTFS archive {input}: {e}"));
                if let Some(advisory) = &report.advisory {
                    log::warn!("{input}: unresolved risk: {advisory}");
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .unwrap_or_else(|e| panic!("failed serializing repair report: {e}"))
                );
            }
        }
    }
}

fn load_defaults(defaults_file: Option<&str>) -> Result<RepairDefaults, RepairError> {
    match defaults_file {
        Some(filepath) => RepairDefaults::from_file(filepath),
        None => Ok(RepairDefaults::default()),
    }
}
