// 分层结构
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod error;

// 重新导出主要类型
pub use domain::{EntryLister, ListingOutcome, ListingTool, MatchMode, PatternMatcher, ScanEngine};
pub use application::{Config, OutputMode, SearchConfiguration, SearchOptions};
pub use infrastructure::{Logger, LoggerTrait, ProgressReporter, RunSummary};
pub use presentation::ResultRenderer;
pub use error::FindError;
