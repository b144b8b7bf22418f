//! Process-wide logger setup.
//!
//! All crates in the workspace log through the `log` facade. Binaries and
//! tests call one of the `setup*` functions once to install an `env_logger`
//! backend; later calls are ignored.

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the logger with `filter` as the default directive when
/// `RUST_LOG` is not set.
pub fn setup_with_default(filter: &str) {
    let filter = filter.to_string();
    INIT.call_once(move || {
        let env = env_logger::Env::new().default_filter_or(filter);
        let _ = env_logger::Builder::from_env(env)
            .format_timestamp_millis()
            .try_init();
    });
}

/// Install the logger with an explicit filter, ignoring `RUST_LOG`.
pub fn setup_with(filter: &str) {
    let filter = filter.to_string();
    INIT.call_once(move || {
        let _ = env_logger::Builder::new()
            .parse_filters(&filter)
            .format_timestamp_millis()
            .try_init();
    });
}

/// Install the logger with the default `error` level, as tests do.
pub fn setup() {
    setup_with_default("error");
}
