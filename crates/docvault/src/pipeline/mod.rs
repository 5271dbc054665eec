pub mod error;
pub mod progress;
pub mod runner;
pub mod status;

pub use error::PipelineError;
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter, RunEvent};
pub use runner::Pipeline;
pub use status::{RunOutcome, RunPhase};
