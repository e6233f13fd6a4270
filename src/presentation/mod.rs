pub mod display;

pub use display::{format_error, format_warning, print_error, ResultRenderer};
