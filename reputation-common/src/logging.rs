//! Process-wide tracing setup: a `LOG_LEVEL`-driven subscriber construction.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global `tracing` subscriber.
///
/// Reads `LOG_LEVEL` (`trace`, `debug`, `info`, `warn`, `error`; defaults to
/// `info`, or `trace` in debug builds with no override) and installs an
/// ANSI-capable `fmt` layer. File/line fields are only attached in debug
/// builds to keep production logs compact.
///
/// Calling this more than once in a process is a logic error and will panic
/// (the global subscriber can only be set once); callers should invoke it
/// exactly once from `main`.
pub fn init() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("trace")
        } else {
            EnvFilter::new("info")
        }
    });

    let fmt_layer = fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
