use super::RepairOperation;
use clap::Parser;

/// command line tool for batch repair of malformed GTFS archives
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct RepairApp {
    #[command(subcommand)]
    pub op: RepairOperation,
}
