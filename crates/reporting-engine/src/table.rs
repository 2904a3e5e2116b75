//! Reporting configuration table
//!
//! Fixed-capacity registry of "report this attribute under these conditions"
//! entries. Each slot owns the live countdown state and the previous-value
//! snapshot used for change detection.

use crate::error::ReportingError;
use serde::{Deserialize, Serialize};
use zcl_core::{AttributeStore, BindingTable, DataType};

/// Default number of simultaneously configured report entries
pub const DEFAULT_CAPACITY: usize = 16;

/// `max_interval` sentinel meaning "reporting disabled for this entry"
pub const REPORT_DISABLED: u16 = 0xFFFF;

/// Threshold buffer size, sized for the widest supported analog type
/// (Uint48) rounded up.
pub const REPORTABLE_CHANGE_MAX_SIZE: usize = 8;

/// A configure-reporting request record, one per attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureReportingRecord {
    pub attr_id: u16,
    pub data_type: DataType,
    /// Lower bound on report frequency in seconds (rate limit)
    pub min_interval: u16,
    /// Upper bound in seconds (heartbeat deadline); 0xFFFF disables
    pub max_interval: u16,
    /// Reportable change threshold, little-endian, sized by `data_type`;
    /// ignored for discrete types
    #[serde(default)]
    pub reportable_change: Vec<u8>,
}

/// One reporting table slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Whether the slot is occupied
    pub used: bool,
    // Identity, immutable once created
    pub endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub attr_id: u16,
    pub data_type: DataType,
    /// Configured interval bounds in seconds
    pub min_interval: u16,
    pub max_interval: u16,
    /// Values restored by reset-to-default
    pub min_interval_default: u16,
    pub max_interval_default: u16,
    /// Live countdowns, seconds remaining
    pub min_count: u16,
    pub max_count: u16,
    /// Reportable change threshold, little-endian
    pub reportable_change: [u8; REPORTABLE_CHANGE_MAX_SIZE],
    /// Value as of the last emitted report; `None` until the first
    /// evaluation pass seeds it
    pub prev_value: Option<Vec<u8>>,
}

impl ReportEntry {
    /// Entry disabled via the interval sentinel
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.max_interval == REPORT_DISABLED
    }

    /// Occupied, not disabled, and bound to a destination
    pub fn is_active(&self, bindings: &dyn BindingTable) -> bool {
        self.used && !self.is_disabled() && bindings.has_binding(self.cluster_id, self.endpoint)
    }

    /// Reset both countdowns to their configured intervals
    pub fn rearm_counters(&mut self) {
        self.min_count = self.min_interval;
        self.max_count = self.max_interval;
    }

    fn set_reportable_change(&mut self, record: &ConfigureReportingRecord) {
        if !record.data_type.is_analog() {
            return;
        }
        self.reportable_change = [0; REPORTABLE_CHANGE_MAX_SIZE];
        let len = record
            .data_type
            .width()
            .unwrap_or(0)
            .min(record.reportable_change.len())
            .min(REPORTABLE_CHANGE_MAX_SIZE);
        self.reportable_change[..len].copy_from_slice(&record.reportable_change[..len]);
    }
}

/// Fixed-capacity reporting table
#[derive(Debug, Clone)]
pub struct ReportingTable {
    entries: Vec<ReportEntry>,
    occupied: usize,
}

impl Default for ReportingTable {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ReportingTable {
    /// Create an empty table with the given number of slots
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![ReportEntry::default(); capacity],
            occupied: 0,
        }
    }

    /// Rebuild a table from restored entries, truncating or padding to
    /// `capacity`
    #[must_use]
    pub fn from_entries(mut entries: Vec<ReportEntry>, capacity: usize) -> Self {
        entries.truncate(capacity);
        entries.resize(capacity, ReportEntry::default());
        let occupied = entries.iter().filter(|e| e.used).count();
        Self { entries, occupied }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of occupied slots
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// All slots, in order (used and free)
    #[must_use]
    pub fn slots(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [ReportEntry] {
        &mut self.entries
    }

    /// Find the unique entry for (endpoint, cluster, attribute)
    #[must_use]
    pub fn find_entry(&self, endpoint: u8, cluster_id: u16, attr_id: u16) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| {
            e.used && e.endpoint == endpoint && e.cluster_id == cluster_id && e.attr_id == attr_id
        })
    }

    fn find_entry_mut(
        &mut self,
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    ) -> Option<&mut ReportEntry> {
        self.entries.iter_mut().find(|e| {
            e.used && e.endpoint == endpoint && e.cluster_id == cluster_id && e.attr_id == attr_id
        })
    }

    /// Create or refresh the entry for a configure-reporting record.
    ///
    /// Creation populates identity, type, intervals and defaults, and sets
    /// both countdowns to the requested intervals; the previous-value
    /// snapshot stays unset until the first evaluation pass. An update
    /// refreshes only intervals, countdowns and threshold; identity and
    /// defaults are immutable.
    pub fn upsert(
        &mut self,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        record: &ConfigureReportingRecord,
        attrs: &dyn AttributeStore,
    ) -> Result<(), ReportingError> {
        if let Some(entry) = self.find_entry_mut(endpoint, cluster_id, record.attr_id) {
            entry.min_interval = record.min_interval;
            entry.max_interval = record.max_interval;
            entry.min_count = record.min_interval;
            entry.max_count = record.max_interval;
            entry.set_reportable_change(record);
            tracing::debug!(
                endpoint,
                cluster_id,
                attr_id = record.attr_id,
                "refreshed reporting entry"
            );
            return Ok(());
        }

        // The cluster/attribute must already be registered before reporting
        // can be configured for it.
        if attrs.find(endpoint, cluster_id, record.attr_id).is_none() {
            tracing::error!(
                endpoint,
                cluster_id,
                attr_id = record.attr_id,
                "configure-reporting for unregistered attribute"
            );
            return Err(ReportingError::AttributeMissing {
                endpoint,
                cluster_id,
                attr_id: record.attr_id,
            });
        }

        let capacity = self.entries.len();
        let Some(entry) = self.entries.iter_mut().find(|e| !e.used) else {
            return Err(ReportingError::TableFull {
                capacity,
                cluster_id,
                attr_id: record.attr_id,
            });
        };

        entry.endpoint = endpoint;
        entry.profile_id = profile_id;
        entry.cluster_id = cluster_id;
        entry.attr_id = record.attr_id;
        entry.data_type = record.data_type;
        entry.min_interval = record.min_interval;
        entry.max_interval = record.max_interval;
        entry.min_interval_default = record.min_interval;
        entry.max_interval_default = record.max_interval;
        entry.min_count = record.min_interval;
        entry.max_count = record.max_interval;
        entry.reportable_change = [0; REPORTABLE_CHANGE_MAX_SIZE];
        entry.set_reportable_change(record);
        entry.prev_value = None;
        entry.used = true;
        self.occupied += 1;

        tracing::debug!(
            endpoint,
            cluster_id,
            attr_id = record.attr_id,
            min = record.min_interval,
            max = record.max_interval,
            "created reporting entry"
        );
        Ok(())
    }

    /// Restore an entry's intervals from its defaults and clear its
    /// threshold. The caller re-arms the wake timer afterwards.
    pub fn reset_to_default(
        &mut self,
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    ) -> Result<(), ReportingError> {
        let entry = self
            .find_entry_mut(endpoint, cluster_id, attr_id)
            .ok_or(ReportingError::EntryNotFound {
                endpoint,
                cluster_id,
                attr_id,
            })?;

        entry.min_interval = entry.min_interval_default;
        entry.max_interval = entry.max_interval_default;
        entry.min_count = entry.min_interval_default;
        entry.max_count = entry.max_interval_default;
        entry.reportable_change = [0; REPORTABLE_CHANGE_MAX_SIZE];
        Ok(())
    }

    /// Number of entries that take part in evaluation and wake scheduling
    pub fn active_count(&self, bindings: &dyn BindingTable) -> usize {
        if self.occupied == 0 {
            return 0;
        }
        self.entries
            .iter()
            .filter(|e| e.is_active(bindings))
            .count()
    }
}
