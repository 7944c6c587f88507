//! Tracing setup for front ends.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// Honours `RUST_LOG`; otherwise logs at `info`, or `debug` when `VISIBLE`
/// is set. Safe to call more than once: later calls are no-ops.
pub fn init() {
    let default_level = if std::env::var_os("VISIBLE").is_some() {
        "debug"
    } else {
        "info"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        tracing::info!("logging initialised");
    }
}
