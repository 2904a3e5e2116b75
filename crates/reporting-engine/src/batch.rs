//! Report batching
//!
//! One evaluation pass scans the table in slot order and builds at most one
//! outbound message for one (endpoint, cluster, profile) destination group,
//! capped at two attributes. Eligible entries for other groups are left for
//! the next pass, so the engine loops passes until no work remains.

use crate::report::{AttributeReport, ReportRecord, ReportSink, MAX_ATTRS_PER_REPORT};
use crate::scheduler::evaluate_entry;
use crate::table::ReportingTable;
use zcl_core::cluster::{electrical_attrs, id, metering_attrs};
use zcl_core::{AttributeStore, BindingTable};

/// Every Nth report of a scaled quantity also reports its scale factors
const PIGGYBACK_PERIOD: u8 = 10;

/// Rotating counters for the multiplier/divisor piggyback policy.
///
/// Process-lifetime state, deliberately not persisted.
#[derive(Debug, Default)]
pub struct PiggybackCounters {
    summation: u8,
    rms_current: u8,
    rms_voltage: u8,
    active_power: u8,
}

impl PiggybackCounters {
    /// Advance a counter; fires on every `PIGGYBACK_PERIOD`th occurrence.
    fn advance(counter: &mut u8) -> bool {
        *counter += 1;
        if *counter >= PIGGYBACK_PERIOD {
            *counter = 0;
            true
        } else {
            false
        }
    }

    /// Inspect a primary batch and emit scale-factor reports where due.
    fn apply(
        &mut self,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        records: &[ReportRecord],
        attrs: &dyn AttributeStore,
        sink: &mut dyn ReportSink,
    ) {
        for record in records {
            let pair = match cluster_id {
                id::METERING => match record.attr_id {
                    metering_attrs::CURRENT_TIER_1_SUMMATION_DELIVERED
                    | metering_attrs::CURRENT_TIER_2_SUMMATION_DELIVERED
                    | metering_attrs::CURRENT_TIER_3_SUMMATION_DELIVERED
                    | metering_attrs::CURRENT_TIER_4_SUMMATION_DELIVERED => {
                        Self::advance(&mut self.summation)
                            .then_some((metering_attrs::MULTIPLIER, metering_attrs::DIVISOR))
                    }
                    _ => None,
                },
                id::ELECTRICAL_MEASUREMENT => match record.attr_id {
                    electrical_attrs::RMS_CURRENT => Self::advance(&mut self.rms_current)
                        .then_some((
                            electrical_attrs::AC_CURRENT_MULTIPLIER,
                            electrical_attrs::AC_CURRENT_DIVISOR,
                        )),
                    electrical_attrs::RMS_VOLTAGE => Self::advance(&mut self.rms_voltage)
                        .then_some((
                            electrical_attrs::AC_VOLTAGE_MULTIPLIER,
                            electrical_attrs::AC_VOLTAGE_DIVISOR,
                        )),
                    electrical_attrs::ACTIVE_POWER => Self::advance(&mut self.active_power)
                        .then_some((
                            electrical_attrs::AC_POWER_MULTIPLIER,
                            electrical_attrs::AC_POWER_DIVISOR,
                        )),
                    _ => None,
                },
                _ => None,
            };

            if let Some((multiplier_id, divisor_id)) = pair {
                send_scale_pair(
                    endpoint,
                    profile_id,
                    cluster_id,
                    multiplier_id,
                    divisor_id,
                    attrs,
                    sink,
                );
            }
        }
    }
}

/// Report the multiplier+divisor pair as a separate message. Dropped
/// silently unless both attributes resolve.
fn send_scale_pair(
    endpoint: u8,
    profile_id: u16,
    cluster_id: u16,
    multiplier_id: u16,
    divisor_id: u16,
    attrs: &dyn AttributeStore,
    sink: &mut dyn ReportSink,
) {
    let multiplier = attrs.find(endpoint, cluster_id, multiplier_id);
    let divisor = attrs.find(endpoint, cluster_id, divisor_id);
    let (Some(multiplier), Some(divisor)) = (multiplier, divisor) else {
        tracing::debug!(
            endpoint,
            cluster_id,
            multiplier_id,
            divisor_id,
            "scale-factor attributes not registered, skipping piggyback"
        );
        return;
    };

    let records = vec![
        ReportRecord {
            attr_id: multiplier.id,
            data_type: multiplier.data_type,
            value: multiplier.value,
        },
        ReportRecord {
            attr_id: divisor.id,
            data_type: divisor.data_type,
            value: divisor.value,
        },
    ];
    tracing::debug!(endpoint, cluster_id, "piggyback scale-factor report");
    sink.send(AttributeReport {
        endpoint,
        profile_id,
        cluster_id,
        records,
    });
}

/// Run one evaluation pass over the table.
///
/// Emits at most one primary message (plus any due piggyback messages, sent
/// first). Returns true when eligible work remains for a further pass:
/// either the 2-attribute cap was hit or an eligible entry belonged to a
/// different destination group.
pub(crate) fn run_pass(
    table: &mut ReportingTable,
    attrs: &dyn AttributeStore,
    bindings: &dyn BindingTable,
    piggyback: &mut PiggybackCounters,
    sink: &mut dyn ReportSink,
) -> bool {
    let mut group: Option<(u8, u16, u16)> = None;
    let mut records: Vec<ReportRecord> = Vec::with_capacity(MAX_ATTRS_PER_REPORT);
    let mut again = false;

    for entry in table.slots_mut() {
        if !entry.is_active(bindings) {
            continue;
        }
        let Some(attr) = attrs.find(entry.endpoint, entry.cluster_id, entry.attr_id) else {
            continue;
        };
        if !evaluate_entry(entry, &attr) {
            continue;
        }

        match group {
            None => group = Some((entry.endpoint, entry.cluster_id, entry.profile_id)),
            Some(g) if g != (entry.endpoint, entry.cluster_id, entry.profile_id) => {
                again = true;
                continue;
            }
            Some(_) => {}
        }

        // At-most-once: snapshot and counter reset happen when the entry is
        // added to the batch, not when the send completes.
        entry.prev_value = Some(attr.value.to_vec());
        entry.rearm_counters();

        records.push(ReportRecord {
            attr_id: attr.id,
            data_type: attr.data_type,
            value: attr.value,
        });

        if records.len() >= MAX_ATTRS_PER_REPORT {
            again = true;
            break;
        }
    }

    if let Some((endpoint, cluster_id, profile_id)) = group {
        piggyback.apply(endpoint, profile_id, cluster_id, &records, attrs, sink);
        tracing::debug!(
            endpoint,
            cluster_id,
            attrs = records.len(),
            "sending attribute report"
        );
        sink.send(AttributeReport {
            endpoint,
            profile_id,
            cluster_id,
            records,
        });
    }

    again
}
