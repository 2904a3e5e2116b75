//! Attribute reporting engine for a Zigbee electricity meter
//!
//! Implements periodic/change-driven ZCL attribute reporting: a table of
//! report configurations with per-entry countdown state, threshold-based
//! change detection across the analog integer widths, single-destination
//! report batching with a piggyback policy for scale-factor attributes, and
//! a one-shot wake scheduler that sleeps until the next relevant deadline.

pub mod batch;
pub mod change;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod report;
pub mod scheduler;
pub mod table;

pub use engine::{EngineCommand, EngineHandle, ReportingEngine};
pub use error::ReportingError;
pub use report::{AttributeReport, ReportRecord, ReportSink};
pub use table::{ConfigureReportingRecord, ReportEntry, ReportingTable};
