use crate::repair::repair_config::RepairDefaults;
use std::sync::atomic::{AtomicU64, Ordering};

/// state shared across every archive of a corpus run: the fill defaults and
/// the counter backing synthesized agency names. the counter is atomic so a
/// parallel corpus run still hands out unique placeholder names; it is never
/// reset between archives, matching the reference corpus cleanup.
#[derive(Debug, Default)]
pub struct RepairContext {
    pub defaults: RepairDefaults,
    agency_names: AtomicU64,
}

impl RepairContext {
    pub fn new(defaults: RepairDefaults) -> RepairContext {
        RepairContext {
            defaults,
            agency_names: AtomicU64::new(0),
        }
    }

    /// the next unique placeholder agency name
    pub fn next_agency_name(&self) -> String {
        let n = self.agency_names.fetch_add(1, Ordering::SeqCst);
        format!("Agency{n}")
    }
}

#[cfg(test)]
mod test {
    use super::RepairContext;

    #[test]
    fn test_agency_names_are_unique_and_ordered() {
        let ctx = RepairContext::default();
        assert_eq!(ctx.next_agency_name(), "Agency0");
        assert_eq!(ctx.next_agency_name(), "Agency1");
    }
}
