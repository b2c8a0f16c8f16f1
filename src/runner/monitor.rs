use super::events::{MonitorNotice, RunEvent};
use super::merge::MergeOutcome;
use super::payload::ResultPayload;
use super::state::{LogLevel, RunState};
use crate::error::MergeError;
use crate::result::ResultTree;
use crate::utils::config::Config;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Shared handle to one run's state. Lock it to read or merge.
pub type RunHandle = Arc<Mutex<RunState>>;

/// Owns the result tree of every run seen on the bus.
///
/// Each run has its own mutex, so merges for one run are applied one at a
/// time while different runs stay independent.
pub struct RunMonitor {
    runs: RwLock<HashMap<String, RunHandle>>,
    notices: broadcast::Sender<MonitorNotice>,
    log_capacity: usize,
}

impl RunMonitor {
    pub fn new(notice_capacity: usize, log_capacity: usize) -> Self {
        let (notices, _) = broadcast::channel(notice_capacity.max(1));
        Self {
            runs: RwLock::new(HashMap::new()),
            notices,
            log_capacity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.event_capacity, config.log_capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorNotice> {
        self.notices.subscribe()
    }

    pub async fn run(&self, run_id: &str) -> Option<RunHandle> {
        self.runs.read().await.get(run_id).cloned()
    }

    pub async fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Register a run. Starting a run that is already known keeps its tree.
    pub async fn start_run(
        &self,
        run_id: &str,
        suite: &str,
        start_date: Option<DateTime<Utc>>,
    ) -> RunHandle {
        let mut runs = self.runs.write().await;
        if let Some(existing) = runs.get(run_id) {
            log::debug!("Run {} already registered", run_id);
            return existing.clone();
        }

        let tree = match start_date {
            Some(start) => ResultTree::started(suite, start),
            None => ResultTree::new(suite),
        };
        let handle = Arc::new(Mutex::new(RunState::new(run_id, tree, self.log_capacity)));
        runs.insert(run_id.to_string(), handle.clone());
        drop(runs);

        self.announce(run_id, suite);
        handle
    }

    /// Forget a run. Its handle stays usable for whoever still holds it.
    pub async fn remove_run(&self, run_id: &str) -> Option<RunHandle> {
        let removed = self.runs.write().await.remove(run_id);
        if removed.is_some() {
            log::debug!("Run {} removed", run_id);
        }
        removed
    }

    /// Drop every run whose suite has finished, returning their ids.
    pub async fn prune_finished(&self) -> Vec<String> {
        let handles: Vec<(String, RunHandle)> = self
            .runs
            .read()
            .await
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut finished = Vec::new();
        for (run_id, handle) in handles {
            if handle.lock().await.is_finished() {
                finished.push(run_id);
            }
        }

        let mut runs = self.runs.write().await;
        for run_id in &finished {
            runs.remove(run_id);
        }
        finished.sort();
        finished
    }

    /// Merge one payload into a run.
    ///
    /// An unknown run is registered from the payload's suite, but only once
    /// the payload merged cleanly. Every rejection is reported exactly once,
    /// as a log record and a notice.
    pub async fn apply(
        &self,
        run_id: &str,
        payload: &ResultPayload,
    ) -> Result<MergeOutcome, MergeError> {
        let merged = match self.run(run_id).await {
            Some(handle) => handle.lock().await.tree.merge(payload),
            None => return self.apply_to_new_run(run_id, payload).await,
        };
        self.settle(run_id, merged)
    }

    async fn apply_to_new_run(
        &self,
        run_id: &str,
        payload: &ResultPayload,
    ) -> Result<MergeOutcome, MergeError> {
        let Some(suite) = payload.suite() else {
            return self.settle(run_id, Err(MergeError::malformed("payload path is empty")));
        };

        let mut tree = ResultTree::new(suite);
        let outcome = match tree.merge(payload) {
            Ok(outcome) => outcome,
            Err(err) => return self.settle(run_id, Err(err)),
        };

        let mut runs = self.runs.write().await;
        if let Some(existing) = runs.get(run_id).cloned() {
            // Registered meanwhile by another event
            drop(runs);
            let merged = existing.lock().await.tree.merge(payload);
            return self.settle(run_id, merged);
        }
        let state = RunState::new(run_id, tree, self.log_capacity);
        runs.insert(run_id.to_string(), Arc::new(Mutex::new(state)));
        drop(runs);

        self.announce(run_id, suite);
        self.settle(run_id, Ok(outcome))
    }

    fn settle(
        &self,
        run_id: &str,
        merged: Result<MergeOutcome, MergeError>,
    ) -> Result<MergeOutcome, MergeError> {
        match merged {
            Ok(outcome) => {
                self.notify(MonitorNotice::TreeUpdated {
                    run_id: run_id.to_string(),
                    target: outcome.target,
                    created: outcome.created.clone(),
                    finished: outcome.finished,
                });
                Ok(outcome)
            }
            Err(err) => {
                self.report_rejection(run_id, &err);
                Err(err)
            }
        }
    }

    pub async fn handle(&self, event: RunEvent) {
        match event {
            RunEvent::Started {
                run_id,
                suite,
                start_date,
            } => {
                self.start_run(&run_id, &suite, start_date).await;
            }
            RunEvent::Result { run_id, payload } => {
                // Rejections are already reported by `apply`
                let _ = self.apply(&run_id, &payload).await;
            }
            RunEvent::Log { run_id, message } => {
                self.record_output(&run_id, LogLevel::Info, message).await
            }
            RunEvent::Warning { run_id, message } => {
                self.record_output(&run_id, LogLevel::Warning, message).await
            }
            RunEvent::Error { run_id, message } => {
                self.record_output(&run_id, LogLevel::Error, message).await
            }
        }
    }

    /// Consume the bus until it closes, handling events in arrival order.
    pub async fn listen(&self, mut receiver: broadcast::Receiver<RunEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.handle(event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Monitor fell behind the event stream, {} events skipped",
                        skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn record_output(&self, run_id: &str, level: LogLevel, message: String) {
        match self.run(run_id).await {
            Some(handle) => handle.lock().await.push_log(level, &message),
            None => log::debug!("Output for unknown run {}: {}", run_id, message),
        }
        if level == LogLevel::Error {
            log::error!("Run {}: {}", run_id, message);
        }
        self.notify(MonitorNotice::RunOutput {
            run_id: run_id.to_string(),
            level,
            message,
        });
    }

    fn announce(&self, run_id: &str, suite: &str) {
        log::info!("Run {} started for suite '{}'", run_id, suite);
        self.notify(MonitorNotice::RunStarted {
            run_id: run_id.to_string(),
            suite: suite.to_string(),
        });
    }

    fn report_rejection(&self, run_id: &str, err: &MergeError) {
        log::warn!("Run {}: {}", run_id, err);
        let notice = match err {
            MergeError::StaleUpdate { path } => MonitorNotice::StaleUpdate {
                run_id: run_id.to_string(),
                path: path.clone(),
            },
            MergeError::MalformedPayload(reason) => MonitorNotice::MalformedPayload {
                run_id: run_id.to_string(),
                reason: reason.clone(),
            },
        };
        self.notify(notice);
    }

    fn notify(&self, notice: MonitorNotice) {
        let _ = self.notices.send(notice);
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultState;
    use crate::runner::events::EventEmitter;
    use crate::runner::payload::NodeUpdate;

    fn result(run_id: &str, path: &[&str], update: NodeUpdate) -> RunEvent {
        RunEvent::Result {
            run_id: run_id.to_string(),
            payload: ResultPayload::new(path, update),
        }
    }

    fn drain(receiver: &mut broadcast::Receiver<MonitorNotice>) -> Vec<MonitorNotice> {
        let mut notices = Vec::new();
        while let Ok(notice) = receiver.try_recv() {
            notices.push(notice);
        }
        notices
    }

    #[tokio::test]
    async fn test_runs_are_independent_trees() {
        let monitor = RunMonitor::default();
        monitor.start_run("a", "suite", None).await;
        monitor.start_run("b", "suite", None).await;

        monitor
            .apply("a", &ResultPayload::new(&["suite", "case"], NodeUpdate::default()))
            .await
            .unwrap();

        let a = monitor.run("a").await.unwrap();
        let b = monitor.run("b").await.unwrap();
        assert_eq!(a.lock().await.tree.len(), 2);
        assert_eq!(b.lock().await.tree.len(), 1);
        assert_eq!(monitor.run_ids().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_run_is_registered_from_payload() {
        let monitor = RunMonitor::default();
        let mut notices = monitor.subscribe();
        monitor
            .apply(
                "fresh",
                &ResultPayload::new(&["checkout", "pay"], NodeUpdate::default()),
            )
            .await
            .unwrap();

        let handle = monitor.run("fresh").await.unwrap();
        assert_eq!(handle.lock().await.tree.suite_name(), "checkout");

        let notices = drain(&mut notices);
        assert!(matches!(notices[0], MonitorNotice::RunStarted { .. }));
        assert!(matches!(notices[1], MonitorNotice::TreeUpdated { .. }));
    }

    #[tokio::test]
    async fn test_stale_update_reported_once_per_message() {
        let monitor = RunMonitor::default();
        monitor.start_run("r", "suite", None).await;
        monitor
            .apply(
                "r",
                &ResultPayload::new(&["suite"], NodeUpdate::default().with_state(ResultState::Ok)),
            )
            .await
            .unwrap();

        let handle = monitor.run("r").await.unwrap();
        let before = handle.lock().await.tree.clone();

        let mut notices = monitor.subscribe();
        let late = ResultPayload::new(&["suite", "late"], NodeUpdate::default());
        for _ in 0..2 {
            let err = monitor.apply("r", &late).await.unwrap_err();
            assert!(err.is_stale());
        }

        let stale: Vec<_> = drain(&mut notices)
            .into_iter()
            .filter(|notice| matches!(notice, MonitorNotice::StaleUpdate { .. }))
            .collect();
        assert_eq!(stale.len(), 2);
        assert_eq!(handle.lock().await.tree, before);
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_stop_stream() {
        let monitor = RunMonitor::default();
        let mut notices = monitor.subscribe();
        let (emitter, receiver) = EventEmitter::new();

        emitter.emit(RunEvent::Started {
            run_id: "r".to_string(),
            suite: "suite".to_string(),
            start_date: None,
        });
        emitter.emit(result("r", &["wrong suite", "case"], NodeUpdate::default()));
        emitter.emit(result("r", &["suite", "case"], NodeUpdate::default()));
        emitter.emit(RunEvent::Warning {
            run_id: "r".to_string(),
            message: "slow container start".to_string(),
        });
        drop(emitter);

        monitor.listen(receiver).await;

        let handle = monitor.run("r").await.unwrap();
        let state = handle.lock().await;
        assert!(state.tree.find_path(&["suite", "case"]).is_some());
        assert_eq!(state.log().count(), 1);

        let notices = drain(&mut notices);
        assert_eq!(
            notices
                .iter()
                .filter(|n| matches!(n, MonitorNotice::MalformedPayload { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_path_for_unknown_run() {
        let monitor = RunMonitor::default();
        let err = monitor
            .apply("ghost", &ResultPayload::new::<&str>(&[], NodeUpdate::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MalformedPayload(_)));
        assert!(monitor.run("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_first_payload_registers_nothing() {
        let monitor = RunMonitor::default();
        let mut notices = monitor.subscribe();

        let err = monitor
            .apply(
                "ghost",
                &ResultPayload::new(&["s", "a", "b", "c", "too deep"], NodeUpdate::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MalformedPayload(_)));
        assert!(monitor.run_ids().await.is_empty());

        let notices = drain(&mut notices);
        assert_eq!(notices.len(), 1);
        assert!(matches!(
            &notices[0],
            MonitorNotice::MalformedPayload { run_id, .. } if run_id == "ghost"
        ));

        // A valid first payload still registers the run
        monitor
            .apply("ghost", &ResultPayload::new(&["s", "a"], NodeUpdate::default()))
            .await
            .unwrap();
        assert_eq!(monitor.run_ids().await, vec!["ghost"]);
    }

    #[tokio::test]
    async fn test_finished_runs_can_be_pruned() {
        let monitor = RunMonitor::default();
        monitor.start_run("done", "suite", None).await;
        monitor.start_run("live", "suite", None).await;
        monitor
            .apply(
                "done",
                &ResultPayload::new(&["suite"], NodeUpdate::default().with_state(ResultState::Ok)),
            )
            .await
            .unwrap();

        assert_eq!(monitor.prune_finished().await, vec!["done"]);
        assert_eq!(monitor.run_ids().await, vec!["live"]);

        assert!(monitor.remove_run("live").await.is_some());
        assert!(monitor.remove_run("live").await.is_none());
        assert!(monitor.run_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_view_state_survives_stream() {
        let monitor = RunMonitor::default();
        monitor.start_run("r", "suite", None).await;
        let outcome = monitor
            .apply("r", &ResultPayload::new(&["suite", "case", "step"], NodeUpdate::default()))
            .await
            .unwrap();

        let handle = monitor.run("r").await.unwrap();
        handle.lock().await.view.set_expanded(outcome.target, true);

        monitor
            .apply(
                "r",
                &ResultPayload::new(
                    &["suite", "case", "step"],
                    NodeUpdate::default().with_child("action", NodeUpdate::default()),
                ),
            )
            .await
            .unwrap();

        let state = handle.lock().await;
        assert!(state.view.is_expanded(outcome.target));
        assert_eq!(state.tree.children(outcome.target).count(), 1);
    }
}
