use crate::report::ViewState;
use crate::result::ResultTree;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Severity of a console line emitted by a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

/// Live state of one run: its result tree, view state and recent output
#[derive(Debug, Clone)]
pub struct RunState {
    pub run_id: String,
    pub tree: ResultTree,
    pub view: ViewState,
    log: VecDeque<LogLine>,
    log_capacity: usize,
}

impl RunState {
    pub fn new(run_id: &str, tree: ResultTree, log_capacity: usize) -> Self {
        Self {
            run_id: run_id.to_string(),
            tree,
            view: ViewState::new(),
            log: VecDeque::new(),
            log_capacity,
        }
    }

    /// Append a console line, dropping the oldest once the buffer is full.
    pub fn push_log(&mut self, level: LogLevel, message: &str) {
        if self.log_capacity == 0 {
            return;
        }
        while self.log.len() >= self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            level,
            message: message.to_string(),
            received_at: Utc::now(),
        });
    }

    pub fn log(&self) -> impl Iterator<Item = &LogLine> {
        self.log.iter()
    }

    pub fn is_finished(&self) -> bool {
        self.tree.is_closed()
    }
}
