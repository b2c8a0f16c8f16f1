pub mod http;
pub mod resolver;
pub mod store;
pub mod types;

pub use http::HttpRunConfigStore;
pub use resolver::{ConfigDiagnostic, RunConfigResolver};
pub use store::{MemoryStore, RunConfigStore};
pub use types::{ConfigOutcome, ExecutionType, RunConfiguration};
