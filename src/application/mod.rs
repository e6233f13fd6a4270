pub mod config;
pub mod search_config;

pub use config::Config;
pub use search_config::{OutputMode, SearchConfiguration, SearchOptions};
