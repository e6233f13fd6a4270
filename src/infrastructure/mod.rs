pub mod logging;
pub mod progress;

pub use logging::{ErrorType, Logger, LoggerTrait, RunSummary};
pub use progress::ProgressReporter;
