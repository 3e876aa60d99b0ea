//! Run orchestration: stages, progress, results.
//!
//! ```text
//! queued → parsing → extracting_quantities → (compliance_checking ∥ pricing)
//!        → generating_outputs → complete
//! ```
//!
//! Any stage may end the run in `error` or `cancelled`; both keep whatever
//! partial results exist.

mod orchestrator;
mod report;
mod sink;
mod stage;

pub use orchestrator::{Pipeline, RunHandle};
pub use report::{ReliabilityReport, RunOutcome, RunRequest, RunResult};
pub use sink::{ChannelProgress, JsonDirSink, LogProgress, NoopProgress, ProgressSink, ResultSink};
pub use stage::{ProgressEvent, Stage};
