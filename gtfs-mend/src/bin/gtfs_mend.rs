//! this tool scans a directory of GTFS archives and repairs the known
//! malformations that crash downstream trip planners, rewriting each
//! archive in place.
use clap::Parser;
use gtfs_mend::repair::app::RepairApp;

fn main() {
    env_logger::init();
    let args = RepairApp::parse();
    args.op.run()
}
