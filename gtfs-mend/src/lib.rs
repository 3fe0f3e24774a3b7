//! batch repair utilities for GTFS archives. the [`repair`] module holds the
//! detect-and-fix engine applied to each archive in a corpus of transit feeds
//! before they are handed to downstream trip planning tools.
pub mod repair;
