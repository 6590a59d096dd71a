//! CLI domain: parse, route, input, output, and presentation only.

mod input;
mod output;
mod parse;
mod presentation;
mod route;

pub use input::{load_metadata, load_tasks, parse_tasks};
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands};
pub use presentation::{format_plan, format_run_json, format_run_text, format_section_heading};
pub use route::{RunContext, RunOverrides};
