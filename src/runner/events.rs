use super::payload::ResultPayload;
use crate::result::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Run events delivered by the transport, one ordered stream per run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    #[serde(rename_all = "camelCase")]
    Started {
        #[serde(default)]
        run_id: String,
        suite: String,
        #[serde(default)]
        start_date: Option<DateTime<Utc>>,
    },

    #[serde(rename_all = "camelCase")]
    Result {
        #[serde(default)]
        run_id: String,
        payload: ResultPayload,
    },

    // Console output of the test container
    #[serde(rename_all = "camelCase")]
    Log {
        #[serde(default)]
        run_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Warning {
        #[serde(default)]
        run_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Error {
        #[serde(default)]
        run_id: String,
        message: String,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            RunEvent::Started { run_id, .. }
            | RunEvent::Result { run_id, .. }
            | RunEvent::Log { run_id, .. }
            | RunEvent::Warning { run_id, .. }
            | RunEvent::Error { run_id, .. } => run_id,
        }
    }

    /// Fill in the run id when the stream left it out.
    pub fn with_default_run_id(mut self, default: &str) -> Self {
        let run_id = match &mut self {
            RunEvent::Started { run_id, .. }
            | RunEvent::Result { run_id, .. }
            | RunEvent::Log { run_id, .. }
            | RunEvent::Warning { run_id, .. }
            | RunEvent::Error { run_id, .. } => run_id,
        };
        if run_id.is_empty() {
            *run_id = default.to_string();
        }
        self
    }
}

/// What the monitor reports to views after handling an event
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorNotice {
    RunStarted {
        run_id: String,
        suite: String,
    },
    TreeUpdated {
        run_id: String,
        target: NodeId,
        created: Vec<NodeId>,
        finished: bool,
    },
    StaleUpdate {
        run_id: String,
        path: Vec<String>,
    },
    MalformedPayload {
        run_id: String,
        reason: String,
    },
    RunOutput {
        run_id: String,
        level: super::state::LogLevel,
        message: String,
    },
}

/// Event emitter for broadcasting run events
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

/// Console listener printing monitor notices as they happen
pub struct ConsoleNoticeListener;

impl ConsoleNoticeListener {
    pub async fn listen(mut receiver: broadcast::Receiver<MonitorNotice>) {
        use colored::Colorize;

        loop {
            let notice = match receiver.recv().await {
                Ok(notice) => notice,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Console listener skipped {} notices", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match notice {
                MonitorNotice::RunStarted { run_id, suite } => {
                    println!(
                        "{} Run {} started: {}",
                        "▶".green().bold(),
                        run_id.cyan(),
                        suite.white().bold()
                    );
                }
                MonitorNotice::TreeUpdated {
                    run_id,
                    created,
                    finished,
                    ..
                } => {
                    if !created.is_empty() {
                        println!(
                            "  {} {} new nodes in {}",
                            "+".blue(),
                            created.len(),
                            run_id.dimmed()
                        );
                    }
                    if finished {
                        println!("{} Run {} finished", "■".blue().bold(), run_id.cyan());
                    }
                }
                MonitorNotice::StaleUpdate { run_id, path } => {
                    println!(
                        "  {} stale update for {} ignored ({})",
                        "○".yellow(),
                        path.join("/"),
                        run_id.dimmed()
                    );
                }
                MonitorNotice::MalformedPayload { run_id, reason } => {
                    println!(
                        "  {} rejected payload: {} ({})",
                        "✗".red(),
                        reason,
                        run_id.dimmed()
                    );
                }
                MonitorNotice::RunOutput {
                    level, message, ..
                } => {
                    use super::state::LogLevel;
                    match level {
                        LogLevel::Info => println!("      {}", message.dimmed()),
                        LogLevel::Warning => println!("      {}", message.yellow()),
                        LogLevel::Error => println!("      {}", message.red()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_event_from_json() {
        let json = r#"{
            "type": "result",
            "runId": "run-1",
            "payload": {"path": ["suite", "case"], "state": "RUNNING"}
        }"#;
        let event: RunEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.run_id(), "run-1");
        match event {
            RunEvent::Result { payload, .. } => {
                assert_eq!(payload.path, vec!["suite", "case"]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_default_run_id() {
        let event: RunEvent =
            serde_json::from_str(r#"{"type": "log", "message": "hello"}"#).unwrap();
        assert_eq!(event.run_id(), "");
        let event = event.with_default_run_id("replay-1");
        assert_eq!(event.run_id(), "replay-1");

        let named = RunEvent::Log {
            run_id: "keep".to_string(),
            message: String::new(),
        }
        .with_default_run_id("replay-1");
        assert_eq!(named.run_id(), "keep");
    }

    #[tokio::test]
    async fn test_emitter_delivers_in_order() {
        let (emitter, mut receiver) = EventEmitter::new();
        for i in 0..3 {
            emitter.emit(RunEvent::Log {
                run_id: "r".to_string(),
                message: i.to_string(),
            });
        }
        for i in 0..3 {
            match receiver.recv().await.unwrap() {
                RunEvent::Log { message, .. } => assert_eq!(message, i.to_string()),
                other => panic!("unexpected event {:?}", other),
            }
        }
    }
}
