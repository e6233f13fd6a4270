pub mod discovery;
pub mod engine;
pub mod listing;
pub mod pattern;

pub use discovery::{discover, ExtensionFilter};
pub use engine::ScanEngine;
pub use listing::{EntryLister, ListingOutcome, ListingTool, ToolKind};
pub use pattern::{EntryMatch, MatchMode, PatternMatcher};
