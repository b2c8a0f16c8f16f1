pub mod error;
pub mod report;
pub mod result;
pub mod runconfig;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::{MergeError, MonitorError, StoreError};
pub use report::{build_report, RunReport};
pub use result::{NodeId, ResultNode, ResultState, ResultTree};
pub use runconfig::{ConfigOutcome, RunConfigResolver, RunConfiguration};
pub use runner::{ResultPayload, RunEvent, RunMonitor};
pub use utils::config::Config;
