//! Logger setup for the `vg` binary.
//!
//! Logs go to stderr so report output on stdout stays parseable. The level
//! comes from the `-v` count unless `RUST_LOG` is set.

use env_logger::{Builder, Env, Target};

/// Map a `-v` count to a default filter.
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global logger. Calling it twice is harmless.
pub fn init(verbose: u8) {
    let _ = Builder::from_env(Env::default().default_filter_or(level_for(verbose)))
        .target(Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(9), "trace");
    }
}
