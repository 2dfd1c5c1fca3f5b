//! Logger setup for the command-line driver.

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the global logger.
///
/// `RUST_LOG` wins when set. Otherwise verbose runs show debug output and
/// regular runs only warnings and errors, so the summary stays readable.
pub(crate) fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let env = Env::default().default_filter_or(level.to_string());
    let mut builder = Builder::from_env(env);
    let _ = builder.format_timestamp(None);

    // A logger may already be installed when tests call `init` repeatedly.
    let _ = builder.try_init();
}
