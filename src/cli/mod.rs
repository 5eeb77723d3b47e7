//! Command-line interface.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{Cli, Commands};

use crate::domain::errors::MessagingError;

/// Prints `err` (and its causes) and exits with a non-zero status.
///
/// Usage errors exit with 2, everything else with 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let usage = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<MessagingError>())
        .any(MessagingError::is_usage_error);

    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "error": err.to_string(),
            "causes": causes,
        });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err:#}");
    }

    std::process::exit(if usage { 2 } else { 1 });
}
