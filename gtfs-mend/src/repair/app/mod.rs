mod operation;
mod repair_app;

pub use operation::RepairOperation;
pub use repair_app::RepairApp;
