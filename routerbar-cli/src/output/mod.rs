//! Output formatting for CLI.

mod json;
mod text;

pub use json::{CheckOutput, ConfigOutput, JsonFormatter, PathsOutput, SummaryOutput};
pub use text::TextFormatter;
