use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

/// Handle for swapping the log filter once the config file has been read.
pub struct LogLevel(reload::Handle<EnvFilter, Registry>);

impl LogLevel {
    /// Applies the configured level unless `RUST_LOG` already decided it.
    pub fn apply_configured(&self, level: &str) -> anyhow::Result<()> {
        if std::env::var_os("RUST_LOG").is_some() {
            return Ok(());
        }
        self.reload(level)
    }

    fn reload(&self, filter: &str) -> anyhow::Result<()> {
        self.0.reload(EnvFilter::try_new(filter)?)?;
        Ok(())
    }
}

/// Logs go to stderr so the pairing code printed on stdout stays readable.
pub fn init_tracing(default_filter: &str) -> LogLevel {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (subscriber, level) = build(filter);
    let _ = subscriber.try_init();
    level
}

fn build(filter: EnvFilter) -> (impl Subscriber + Send + Sync + 'static, LogLevel) {
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));
    (subscriber, LogLevel(handle))
}
