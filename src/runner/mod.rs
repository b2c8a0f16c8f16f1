pub mod events;
pub mod merge;
pub mod monitor;
pub mod payload;
pub mod state;

pub use events::*;
pub use merge::MergeOutcome;
pub use monitor::{RunHandle, RunMonitor};
pub use payload::{ChildUpdate, NodeUpdate, ResultPayload};
pub use state::*;
