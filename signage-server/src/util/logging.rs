use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// `RUST_LOG` wins over `default_filter`; output is plain text on stdout for
/// container log collectors.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_target(false);

    // a second init (tests spinning up several servers) keeps the first one
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
