//! Outbound report command types and the transport seam

use bytes::Bytes;
use zcl_core::DataType;

/// Hard cap on attributes per outbound report message
pub const MAX_ATTRS_PER_REPORT: usize = 2;

/// One attribute record inside a report command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRecord {
    pub attr_id: u16,
    pub data_type: DataType,
    pub value: Bytes,
}

/// An outbound report-attributes command for one destination group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeReport {
    pub endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    /// At most [`MAX_ATTRS_PER_REPORT`] records
    pub records: Vec<ReportRecord>,
}

/// Fire-and-forget report delivery, supplied by the transport layer.
///
/// The engine does not wait for acknowledgment and never retries; a lost
/// report is resent at the next natural interval.
pub trait ReportSink: Send {
    fn send(&mut self, report: AttributeReport);
}

/// Sink that collects reports in memory, for tests and dry runs.
///
/// Clones share the same buffer, so a test can hand one clone to the engine
/// and inspect sent reports through another.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    reports: std::sync::Arc<std::sync::Mutex<Vec<AttributeReport>>>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain all collected reports
    #[must_use]
    pub fn take(&self) -> Vec<AttributeReport> {
        match self.reports.lock() {
            Ok(mut reports) => std::mem::take(&mut *reports),
            Err(_) => Vec::new(),
        }
    }
}

impl ReportSink for CollectingSink {
    fn send(&mut self, report: AttributeReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
