//! Reporting engine context
//!
//! Owns the reporting table, the piggyback counters and the wake timer, and
//! exposes the three entry points the stack drives: configure-reporting
//! requests, timer wakes, and an immediate evaluation after (re)join. An
//! optional tokio command loop serializes these so passes never interleave.

use crate::batch::{run_pass, PiggybackCounters};
use crate::error::ReportingError;
use crate::persistence::{load_table, save_table, TableStore};
use crate::report::ReportSink;
use crate::scheduler::{tick, IntervalScheduler, WakeTimer};
use crate::table::{ConfigureReportingRecord, ReportingTable, DEFAULT_CAPACITY};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use zcl_core::{AttributeStore, BindingTable};

/// The attribute reporting engine
pub struct ReportingEngine {
    table: ReportingTable,
    scheduler: IntervalScheduler,
    piggyback: PiggybackCounters,
    attrs: Arc<dyn AttributeStore>,
    bindings: Arc<dyn BindingTable>,
    sink: Box<dyn ReportSink>,
    store: Box<dyn TableStore>,
}

impl ReportingEngine {
    /// Create an engine, restoring the table from the store (a failed
    /// restore starts with an empty table).
    pub fn new(
        attrs: Arc<dyn AttributeStore>,
        bindings: Arc<dyn BindingTable>,
        sink: Box<dyn ReportSink>,
        store: Box<dyn TableStore>,
        timer: Box<dyn WakeTimer>,
    ) -> Self {
        Self::with_capacity(attrs, bindings, sink, store, timer, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(
        attrs: Arc<dyn AttributeStore>,
        bindings: Arc<dyn BindingTable>,
        sink: Box<dyn ReportSink>,
        store: Box<dyn TableStore>,
        timer: Box<dyn WakeTimer>,
        capacity: usize,
    ) -> Self {
        let table = load_table(store.as_ref(), capacity);
        Self {
            table,
            scheduler: IntervalScheduler::new(timer),
            piggyback: PiggybackCounters::default(),
            attrs,
            bindings,
            sink,
            store,
        }
    }

    #[must_use]
    pub fn table(&self) -> &ReportingTable {
        &self.table
    }

    /// Handle a ZCL configure-reporting record: upsert the entry, persist
    /// the table and make sure a wake is scheduled.
    pub fn configure_reporting(
        &mut self,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        record: &ConfigureReportingRecord,
    ) -> Result<(), ReportingError> {
        self.table
            .upsert(endpoint, profile_id, cluster_id, record, self.attrs.as_ref())?;
        save_table(self.store.as_ref(), &self.table)?;
        self.scheduler.start(&self.table, self.bindings.as_ref());
        Ok(())
    }

    /// Restore an entry's intervals to their configured defaults and force
    /// timer re-arming.
    pub fn reset_to_default(
        &mut self,
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    ) -> Result<(), ReportingError> {
        self.table.reset_to_default(endpoint, cluster_id, attr_id)?;
        save_table(self.store.as_ref(), &self.table)?;
        self.scheduler.stop();
        self.scheduler.start(&self.table, self.bindings.as_ref());
        Ok(())
    }

    /// Timer wake: decrement all countdowns by the elapsed seconds, run the
    /// evaluation loop, then re-arm for the next deadline.
    pub fn handle_wake(&mut self, elapsed: u16) {
        // The timer is one-shot and this wake consumed it; disarm so the
        // re-arm below always schedules a fresh deadline.
        self.scheduler.stop();
        tick(&mut self.table, self.bindings.as_ref(), elapsed);
        self.run_reports();
    }

    /// Run evaluation passes until no eligible entries remain, then arm the
    /// wake timer for the nearest deadline. Also the entry point right after
    /// joining a network.
    pub fn run_reports(&mut self) {
        while run_pass(
            &mut self.table,
            self.attrs.as_ref(),
            self.bindings.as_ref(),
            &mut self.piggyback,
            self.sink.as_mut(),
        ) {}
        self.scheduler.start(&self.table, self.bindings.as_ref());
    }

    /// Arm the wake timer if it isn't already
    pub fn start(&mut self) {
        self.scheduler.start(&self.table, self.bindings.as_ref());
    }

    /// Cancel any outstanding wake
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Move the engine onto a tokio task that serializes timer wakes and
    /// configuration requests. `wake_rx` is the channel the engine's wake
    /// timer fires on (see [`crate::scheduler::TokioWakeTimer::new`]).
    #[must_use]
    pub fn spawn(mut self, mut wake_rx: mpsc::UnboundedReceiver<u16>) -> EngineHandle {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(elapsed) = wake_rx.recv() => {
                        self.handle_wake(elapsed);
                    }
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(EngineCommand::Configure {
                                endpoint,
                                profile_id,
                                cluster_id,
                                record,
                                reply,
                            }) => {
                                let result = self.configure_reporting(
                                    endpoint, profile_id, cluster_id, &record,
                                );
                                let _ = reply.send(result);
                            }
                            Some(EngineCommand::ResetToDefault {
                                endpoint,
                                cluster_id,
                                attr_id,
                                reply,
                            }) => {
                                let result =
                                    self.reset_to_default(endpoint, cluster_id, attr_id);
                                let _ = reply.send(result);
                            }
                            Some(EngineCommand::RunReports) => self.run_reports(),
                            None => {
                                tracing::info!("reporting engine command channel closed");
                                self.stop();
                                break;
                            }
                        }
                    }
                }
            }
        });
        EngineHandle { cmd_tx, task }
    }
}

/// Commands accepted by a spawned engine
#[derive(Debug)]
pub enum EngineCommand {
    Configure {
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        record: ConfigureReportingRecord,
        reply: oneshot::Sender<Result<(), ReportingError>>,
    },
    ResetToDefault {
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
        reply: oneshot::Sender<Result<(), ReportingError>>,
    },
    /// Evaluate immediately, e.g. after joining a network
    RunReports,
}

/// Handle to a spawned reporting engine
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    task: tokio::task::JoinHandle<()>,
}

impl EngineHandle {
    pub async fn configure_reporting(
        &self,
        endpoint: u8,
        profile_id: u16,
        cluster_id: u16,
        record: ConfigureReportingRecord,
    ) -> Result<(), ReportingError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Configure {
                endpoint,
                profile_id,
                cluster_id,
                record,
                reply,
            })
            .map_err(|_| ReportingError::EngineStopped)?;
        rx.await.map_err(|_| ReportingError::EngineStopped)?
    }

    pub async fn reset_to_default(
        &self,
        endpoint: u8,
        cluster_id: u16,
        attr_id: u16,
    ) -> Result<(), ReportingError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::ResetToDefault {
                endpoint,
                cluster_id,
                attr_id,
                reply,
            })
            .map_err(|_| ReportingError::EngineStopped)?;
        rx.await.map_err(|_| ReportingError::EngineStopped)?
    }

    /// Request an immediate evaluation pass
    pub fn run_reports(&self) -> Result<(), ReportingError> {
        self.cmd_tx
            .send(EngineCommand::RunReports)
            .map_err(|_| ReportingError::EngineStopped)
    }

    /// Stop the engine and wait for the task to finish
    pub async fn shutdown(self) {
        drop(self.cmd_tx);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::report::CollectingSink;
    use crate::scheduler::testutil::ManualTimer;
    use crate::scheduler::TokioWakeTimer;
    use zcl_core::cluster::{id, profile};
    use zcl_core::{Attribute, DataType, InMemoryAttributes, InMemoryBindings};

    struct Fixture {
        engine: ReportingEngine,
        attrs: Arc<InMemoryAttributes>,
        sink: CollectingSink,
        timer: ManualTimer,
    }

    impl Fixture {
        fn new() -> Self {
            let attrs = Arc::new(InMemoryAttributes::new());
            let bindings = Arc::new(InMemoryBindings::new());
            bindings.bind(id::ELECTRICAL_MEASUREMENT, 1);
            bindings.bind(id::METERING, 1);
            let sink = CollectingSink::new();
            let timer = ManualTimer::default();
            let engine = ReportingEngine::new(
                attrs.clone(),
                bindings,
                Box::new(sink.clone()),
                Box::new(MemoryStore::new()),
                Box::new(timer.clone()),
            );
            Self {
                engine,
                attrs,
                sink,
                timer,
            }
        }

        fn configure(&mut self, cluster_id: u16, attr_id: u16, min: u16, max: u16, change: &[u8]) {
            self.attrs.set(
                1,
                cluster_id,
                Attribute::new(attr_id, DataType::Uint16, vec![0, 0]),
            );
            self.engine
                .configure_reporting(
                    1,
                    profile::HA,
                    cluster_id,
                    &ConfigureReportingRecord {
                        attr_id,
                        data_type: DataType::Uint16,
                        min_interval: min,
                        max_interval: max,
                        reportable_change: change.to_vec(),
                    },
                )
                .unwrap();
        }

        /// Fire the armed timer, simulating its full delay elapsing
        fn fire_timer(&mut self) -> u16 {
            let elapsed = self.timer.armed_seconds().expect("no timer armed");
            self.timer.armed.lock().unwrap().take();
            self.engine.handle_wake(elapsed);
            elapsed
        }
    }

    #[test]
    fn test_scenario_heartbeat_after_max_interval() {
        // min 0 / max 300, constant value: nothing for 299s, exactly one
        // report at the 300s mark
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 0, 300, &[5, 0]);

        // Seed the snapshot without emitting
        fx.engine.run_reports();
        assert!(fx.sink.take().is_empty());

        // 299 seconds of one-second wakes
        for _ in 0..299 {
            fx.timer.armed.lock().unwrap().take();
            fx.engine.handle_wake(1);
        }
        assert!(fx.sink.take().is_empty());

        fx.timer.armed.lock().unwrap().take();
        fx.engine.handle_wake(1);
        let reports = fx.sink.take();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].records.len(), 1);

        // Counters restarted: next heartbeat another 300s out
        assert_eq!(fx.timer.armed_seconds(), Some(300));
    }

    #[test]
    fn test_wake_rearms_heartbeat_without_explicit_disarm() {
        // A consumed wake must schedule the next deadline even when the
        // timer backend still reports the expired shot as armed.
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 0, 300, &[5, 0]);
        fx.engine.run_reports(); // seed snapshot
        assert_eq!(fx.timer.arm_count(), 1);

        // Deliver the wake without clearing the timer state first
        fx.engine.handle_wake(300);
        assert_eq!(fx.sink.take().len(), 1);
        assert_eq!(fx.timer.arm_count(), 2);
        assert_eq!(fx.timer.armed_seconds(), Some(300));
    }

    #[test]
    fn test_scenario_change_driven_never_reports_constant_value() {
        // max 0: no heartbeat, and a constant value never reports
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 0, 0, &[5, 0]);

        fx.engine.run_reports();
        for _ in 0..1000 {
            fx.engine.handle_wake(17);
        }
        assert!(fx.sink.take().is_empty());
        // All countdowns are zero, so there is no deadline to wake for
        assert_eq!(fx.timer.armed_seconds(), None);
    }

    #[test]
    fn test_wake_delay_follows_nearest_deadline() {
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 30, 300, &[5, 0]);
        assert_eq!(fx.timer.armed_seconds(), Some(30));

        let elapsed = fx.fire_timer();
        assert_eq!(elapsed, 30);
        // min window elapsed without change; it re-arms, max keeps counting
        assert_eq!(fx.timer.armed_seconds(), Some(30));

        fx.configure(id::METERING, 0x0200, 10, 60, &[1, 0]);
        // Timer already armed: configure must not shorten the pending wake
        assert_eq!(fx.timer.armed_seconds(), Some(30));
    }

    #[test]
    fn test_reset_to_default_rearms_timer() {
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 30, 300, &[5, 0]);
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 5, 60, &[1, 0]);
        // Second configure is an update; armed delay is still the first one
        assert_eq!(fx.timer.armed_seconds(), Some(30));

        fx.engine
            .reset_to_default(1, id::ELECTRICAL_MEASUREMENT, 0x0505)
            .unwrap();
        // Stop + start picks up the restored defaults
        assert_eq!(fx.timer.armed_seconds(), Some(30));
        let entry = fx
            .engine
            .table()
            .find_entry(1, id::ELECTRICAL_MEASUREMENT, 0x0505)
            .unwrap();
        assert_eq!(entry.max_interval, 300);
    }

    #[test]
    fn test_disabled_entry_never_scheduled() {
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 5, 0xFFFF, &[5, 0]);
        assert_eq!(fx.timer.armed_seconds(), None);

        fx.attrs
            .set_value(1, id::ELECTRICAL_MEASUREMENT, 0x0505, vec![0xFF, 0x7F]);
        fx.engine.run_reports();
        assert!(fx.sink.take().is_empty());
    }

    #[test]
    fn test_change_report_respects_min_interval() {
        let mut fx = Fixture::new();
        fx.configure(id::ELECTRICAL_MEASUREMENT, 0x0505, 30, 300, &[5, 0]);
        fx.engine.run_reports(); // seed snapshot

        // Change arrives, but the rate-limit window is still open
        fx.attrs
            .set_value(1, id::ELECTRICAL_MEASUREMENT, 0x0505, vec![100, 0]);
        fx.engine.run_reports();
        assert!(fx.sink.take().is_empty());

        // After the min window the change goes out
        fx.engine.handle_wake(30);
        let reports = fx.sink.take();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].records[0].value.as_ref(), &[100, 0]);
    }

    #[test]
    fn test_table_restored_across_engine_restart() {
        let attrs = Arc::new(InMemoryAttributes::new());
        attrs.set(
            1,
            id::METERING,
            Attribute::new(0x0000, DataType::Uint48, vec![0; 6]),
        );
        let bindings = Arc::new(InMemoryBindings::new());
        bindings.bind(id::METERING, 1);
        let store = Arc::new(MemoryStore::new());

        struct SharedStore(Arc<MemoryStore>);
        impl crate::persistence::TableStore for SharedStore {
            fn save(&self, blob: &[u8]) -> std::io::Result<()> {
                self.0.save(blob)
            }
            fn restore(&self) -> std::io::Result<Option<Vec<u8>>> {
                self.0.restore()
            }
        }

        let mut engine = ReportingEngine::new(
            attrs.clone(),
            bindings.clone(),
            Box::new(CollectingSink::new()),
            Box::new(SharedStore(store.clone())),
            Box::new(ManualTimer::default()),
        );
        engine
            .configure_reporting(
                1,
                profile::HA,
                id::METERING,
                &ConfigureReportingRecord {
                    attr_id: 0x0000,
                    data_type: DataType::Uint48,
                    min_interval: 10,
                    max_interval: 600,
                    reportable_change: vec![0x64, 0, 0, 0, 0, 0],
                },
            )
            .unwrap();
        drop(engine);

        let engine = ReportingEngine::new(
            attrs,
            bindings,
            Box::new(CollectingSink::new()),
            Box::new(SharedStore(store)),
            Box::new(ManualTimer::default()),
        );
        let entry = engine.table().find_entry(1, id::METERING, 0x0000).unwrap();
        assert_eq!(entry.min_interval, 10);
        assert_eq!(entry.max_interval, 600);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_engine_reports_on_schedule() {
        let attrs = Arc::new(InMemoryAttributes::new());
        attrs.set(
            1,
            id::ELECTRICAL_MEASUREMENT,
            Attribute::new(0x0505, DataType::Uint16, vec![230, 0]),
        );
        let bindings = Arc::new(InMemoryBindings::new());
        bindings.bind(id::ELECTRICAL_MEASUREMENT, 1);
        let sink = CollectingSink::new();

        let (timer, wake_rx) = TokioWakeTimer::new();
        let engine = ReportingEngine::new(
            attrs,
            bindings,
            Box::new(sink.clone()),
            Box::new(MemoryStore::new()),
            Box::new(timer),
        );
        let handle = engine.spawn(wake_rx);

        handle
            .configure_reporting(
                1,
                profile::HA,
                id::ELECTRICAL_MEASUREMENT,
                ConfigureReportingRecord {
                    attr_id: 0x0505,
                    data_type: DataType::Uint16,
                    min_interval: 0,
                    max_interval: 60,
                    reportable_change: vec![5, 0],
                },
            )
            .await
            .unwrap();

        // First heartbeat after the max interval elapses
        tokio::time::sleep(std::time::Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert_eq!(sink.take().len(), 1);

        handle.shutdown().await;
    }
}
